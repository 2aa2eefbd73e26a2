use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared type of one output column, using the protocol's wire names.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Boolean,
    Long,
    Double,
    String,
    Timestamp,
    Json,
}

impl ColumnType {
    pub fn as_str(self) -> &'static str {
        match self {
            ColumnType::Boolean => "boolean",
            ColumnType::Long => "long",
            ColumnType::Double => "double",
            ColumnType::String => "string",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Json => "json",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One column declared by the setup phase. Never mutated after negotiation.
#[derive(Clone, Debug, Deserialize, Serialize, Eq, PartialEq)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Timestamp pattern (strftime-style); only meaningful for timestamp
    /// columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            format: None,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

/// Ordered column list negotiated during the setup phase.
///
/// Column order defines raw-field position; every decoded record must carry
/// exactly this many fields.
#[derive(Clone, Debug, Default, Deserialize, Serialize, Eq, PartialEq)]
#[serde(transparent)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Configuration document the setup phase writes back: the negotiated schema
/// plus how many run tasks to request. Persisted as `setup.yml` so later
/// phases can reload it from another process.
#[derive(Clone, Debug, Deserialize, Serialize, Eq, PartialEq)]
pub struct SetupResult {
    pub columns: Schema,
    #[serde(default = "default_tasks")]
    pub tasks: usize,
}

fn default_tasks() -> usize {
    1
}
