use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(rename = "dtable_uuid")]
    pub base_id: String,
}

impl Session {
    /// Short form of the base id for progress output.
    pub fn base_prefix(&self) -> &str {
        let end = self
            .base_id
            .char_indices()
            .nth(8)
            .map(|(idx, _)| idx)
            .unwrap_or(self.base_id.len());
        &self.base_id[..end]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnType {
    Image,
    File,
    LongText,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }

    pub fn is_display(&self) -> bool {
        !matches!(
            self.column_type,
            ColumnType::Image | ColumnType::File | ColumnType::LongText
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<Column>,
}

impl Table {
    pub fn image_column(&self) -> Option<&Column> {
        self.columns
            .iter()
            .find(|column| column.column_type == ColumnType::Image)
    }

    pub fn display_columns(&self) -> Vec<Column> {
        self.columns
            .iter()
            .filter(|column| column.is_display())
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub tables: Vec<Table>,
}

impl Schema {
    /// Picks the named table, or the first one when no name is given.
    pub fn select_table(&self, name: Option<&str>) -> Option<&Table> {
        match name {
            Some(name) => self.tables.iter().find(|table| table.name == name),
            None => self.tables.first(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// First asset reference held by `column`. Lists yield their first
    /// element; a scalar is treated as a one-element list.
    pub fn first_asset(&self, column: &str) -> Option<AssetReference> {
        let value = self.0.get(column)?;
        let first = match value {
            Value::Array(items) => items.first()?,
            other => other,
        };
        AssetReference::from_value(first)
    }
}

impl From<Value> for Record {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AssetReference(String);

impl AssetReference {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_value(value: &Value) -> Option<Self> {
        let raw = match value {
            Value::String(raw) => raw.as_str(),
            Value::Object(map) => map.get("url")?.as_str()?,
            _ => return None,
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }
}

impl fmt::Display for AssetReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
