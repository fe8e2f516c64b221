use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TrancheError;
use crate::fields;

/// Ordered column name -> cell map of one spreadsheet row.
pub type FieldMap = serde_json::Map<String, serde_json::Value>;

/// Processing state of a cached record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Pending,
    Processed,
    Synced,
}

impl RecordStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Processed => "processed",
            RecordStatus::Synced => "synced",
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordStatus {
    type Err = TrancheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RecordStatus::Pending),
            "processed" => Ok(RecordStatus::Processed),
            "synced" => Ok(RecordStatus::Synced),
            other => Err(TrancheError::InvalidInput(format!(
                "unknown record status '{}'",
                other
            ))),
        }
    }
}

/// One unit of work taken from an uploaded dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    pub record_id: String,
    pub sub_region: Option<String>,
    pub fields: FieldMap,
}

impl SourceRow {
    /// Build a row from raw cells. Returns `None` when the record id cell
    /// (`record_id_column`) is missing or blank.
    pub fn from_fields(fields: FieldMap, record_id_column: &str) -> Option<Self> {
        let record_id = fields
            .get(record_id_column)
            .and_then(fields::value_to_string)?;
        let sub_region = fields::find_field_case_insensitive(&fields, fields::SUB_REGION_FIELD)
            .and_then(fields::value_to_string);
        Some(Self {
            record_id,
            sub_region,
            fields,
        })
    }
}

/// Dataset metadata without its rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub id: String,
    pub region: String,
    pub name: String,
    pub size_bytes: i64,
    pub record_count: i64,
    pub uploaded_at: DateTime<Utc>,
}

/// A dataset with its full row content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(flatten)]
    pub summary: DatasetSummary,
    pub rows: Vec<FieldMap>,
}

impl Dataset {
    /// Header of the record id column, if the dataset has one.
    pub fn record_id_column(&self) -> Option<String> {
        self.rows
            .first()
            .and_then(|row| fields::find_header_trimmed(row, fields::RECORD_ID_COLUMN))
            .map(str::to_string)
    }
}

/// Canonical result of a processed record, stored under
/// `(region, sub_region, bundle_number, unique_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub region: String,
    pub sub_region: String,
    pub bundle_number: u32,
    pub unique_id: String,
    pub fields: FieldMap,
    pub processed_by: String,
    pub processed_at: DateTime<Utc>,
    pub source_dataset_name: String,
}
