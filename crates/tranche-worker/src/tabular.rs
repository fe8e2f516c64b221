//! CSV import and export for the admin commands
//!
//! Cells are read as text exactly as written. Nothing is coerced, so ids
//! such as `007` keep their leading zeros.

use serde_json::Value;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tranche_common::fields;
use tranche_common::types::FieldMap;

use crate::api::ExportedRecord;
use crate::error::Result;

/// Fixed columns leading every export row.
pub const EXPORT_COLUMNS: &[&str] = &[
    "unique_id",
    "sub_region",
    "bundle_number",
    "processed_by",
    "processed_by_name",
    "processed_by_mobile",
    "processed_at",
    "source_dataset_name",
];

/// Parse CSV with a header row into field maps. Short rows get empty cells;
/// rows with only empty cells are dropped.
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<FieldMap>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let row: FieldMap = headers
            .iter()
            .enumerate()
            .filter(|(_, header)| !header.trim().is_empty())
            .map(|(i, header)| {
                let cell = record.get(i).unwrap_or_default();
                (header.to_string(), Value::String(cell.to_string()))
            })
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

pub fn read_file(path: &Path) -> Result<Vec<FieldMap>> {
    read_rows(File::open(path)?)
}

/// Write exported records as CSV: the fixed columns, then every field
/// column in first-seen order.
pub fn write_export<W: Write>(records: &[ExportedRecord], writer: W) -> Result<()> {
    let mut field_columns: Vec<&str> = Vec::new();
    for key in records.iter().flat_map(|r| r.fields.keys()) {
        let key = key.as_str();
        if !EXPORT_COLUMNS.contains(&key) && !field_columns.contains(&key) {
            field_columns.push(key);
        }
    }

    let mut out = csv::Writer::from_writer(writer);
    out.write_record(EXPORT_COLUMNS.iter().chain(field_columns.iter()))?;

    for record in records {
        let mut row = vec![
            record.unique_id.clone(),
            record.sub_region.clone(),
            record.bundle_number.to_string(),
            record.processed_by.clone(),
            record.processed_by_name.clone().unwrap_or_default(),
            record.processed_by_mobile.clone().unwrap_or_default(),
            record.processed_at.to_rfc3339(),
            record.source_dataset_name.clone(),
        ];
        row.extend(field_columns.iter().map(|column| {
            record
                .fields
                .get(*column)
                .and_then(fields::value_to_string)
                .unwrap_or_default()
        }));
        out.write_record(&row)?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_export_file(records: &[ExportedRecord], path: &Path) -> Result<()> {
    write_export(records, File::create(path)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn test_cells_stay_text() {
        let data = "Search from ,Taluka,Pin\nR-1,Paithan,007\n,,\nR-2,Sillod\n";
        let rows = read_rows(data.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Search from "], json!("R-1"));
        assert_eq!(rows[0]["Pin"], json!("007"));
        assert_eq!(rows[1]["Pin"], json!(""));
    }

    #[test]
    fn test_export_flattens_fields() {
        let mut fields = FieldMap::new();
        fields.insert("Search from".into(), json!("R-1"));
        fields.insert("Owner".into(), json!("Patil, S."));
        let record = ExportedRecord {
            sub_region: "Paithan".into(),
            bundle_number: 1,
            unique_id: "CSPA0".into(),
            fields,
            processed_by: "w1".into(),
            processed_by_name: Some("Asha".into()),
            processed_by_mobile: None,
            processed_at: Utc::now(),
            source_dataset_name: "survey.csv".into(),
        };

        let mut buffer = Vec::new();
        write_export(&[record], &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();

        assert!(lines.next().unwrap().ends_with("source_dataset_name,Search from,Owner"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("CSPA0,Paithan,1,w1,Asha,,"));
        assert!(row.ends_with("R-1,\"Patil, S.\""));
    }
}
