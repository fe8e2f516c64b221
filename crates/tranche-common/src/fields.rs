//! Lookups over loosely-typed spreadsheet rows.
//!
//! Dataset columns vary from upload to upload, so rows stay generic
//! [`FieldMap`]s and the few columns the system depends on are found by name.

use serde_json::Value;

use crate::types::FieldMap;

/// Header of the column holding each row's natural key. Matched after trimming.
pub const RECORD_ID_COLUMN: &str = "Search from";

/// Field holding a row's sub-region. Matched case-insensitively.
pub const SUB_REGION_FIELD: &str = "taluka";

/// Field telling the worker whether a document must be attached.
pub const PDF_REQUIRED_FIELD: &str = "pdf required";

/// Find a field whose trimmed, lowercased name equals `name` trimmed and lowercased.
pub fn find_field_case_insensitive<'a>(row: &'a FieldMap, name: &str) -> Option<&'a Value> {
    let wanted = name.trim().to_lowercase();
    row.iter()
        .find(|(key, _)| key.trim().to_lowercase() == wanted)
        .map(|(_, value)| value)
}

/// Find the exact header whose trimmed form equals `name`.
pub fn find_header_trimmed<'a>(row: &'a FieldMap, name: &str) -> Option<&'a str> {
    row.keys()
        .find(|key| key.trim() == name)
        .map(String::as_str)
}

/// Render a cell as trimmed text. Null and blank cells yield `None`.
pub fn value_to_string(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

/// Case-insensitive lookup rendered as text.
pub fn field_as_string(row: &FieldMap, name: &str) -> Option<String> {
    find_field_case_insensitive(row, name).and_then(value_to_string)
}

/// Sub-region of a row, if it has one.
pub fn sub_region_of(row: &FieldMap) -> Option<String> {
    field_as_string(row, SUB_REGION_FIELD)
}
