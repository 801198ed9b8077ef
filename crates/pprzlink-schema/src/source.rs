//! Raw schema input.
//!
//! The compiler consumes an ordered stream of [`RawRecord`]s, each a flat map
//! of string attributes. Nesting is implied by order: a message belongs to the
//! last class before it and a field to the last message before it.
//!
//! [`SchemaDocument`] is the JSON form of the same information and flattens
//! into that record stream.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::compiler::SchemaCompiler;
use crate::config::SchemaConfig;
use crate::error::LoadError;
use crate::model::SchemaModel;

/// String attributes of one record.
pub type Attributes = BTreeMap<String, String>;

/// One schema record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawRecord {
    Class(Attributes),
    Message(Attributes),
    Field(Attributes),
}

impl RawRecord {
    pub fn attributes(&self) -> &Attributes {
        match self {
            Self::Class(attrs) | Self::Message(attrs) | Self::Field(attrs) => attrs,
        }
    }
}

/// Build an attribute map from `(key, value)` pairs.
pub fn attrs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Attributes {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// JSON schema document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default)]
    pub classes: Vec<ClassDocument>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDocument {
    #[serde(flatten)]
    pub attributes: Attributes,
    #[serde(default)]
    pub messages: Vec<MessageDocument>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDocument {
    #[serde(flatten)]
    pub attributes: Attributes,
    #[serde(default)]
    pub fields: Vec<Attributes>,
}

impl SchemaDocument {
    /// Parse a JSON document.
    pub fn from_json(text: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a JSON document from disk, enforcing the configured limits.
    pub fn from_path(path: &Path, config: &SchemaConfig) -> Result<Self, LoadError> {
        let metadata = std::fs::symlink_metadata(path)
            .map_err(|err| LoadError::LoadFailed(format!("{}: {err}", path.display())))?;
        if config.reject_symlinks && metadata.file_type().is_symlink() {
            return Err(LoadError::LoadFailed(format!(
                "refusing to load schema symlink: {}",
                path.display()
            )));
        }
        if metadata.len() > config.max_schema_file_size as u64 {
            return Err(LoadError::TooLarge {
                size: metadata.len(),
                max: config.max_schema_file_size,
            });
        }

        let file = std::fs::File::open(path)
            .map_err(|err| LoadError::LoadFailed(format!("{}: {err}", path.display())))?;
        let read_limit = u64::try_from(config.max_schema_file_size.saturating_add(1))
            .unwrap_or(u64::MAX);
        let mut content = String::new();
        file.take(read_limit)
            .read_to_string(&mut content)
            .map_err(|err| LoadError::LoadFailed(format!("{}: {err}", path.display())))?;
        if content.len() > config.max_schema_file_size {
            return Err(LoadError::TooLarge {
                size: content.len() as u64,
                max: config.max_schema_file_size,
            });
        }

        debug!(path = %path.display(), bytes = content.len(), "read schema document");
        Self::from_json(&content)
    }

    /// Flatten into the ordered record stream.
    pub fn records(&self) -> Vec<RawRecord> {
        let mut records = Vec::new();
        for class in &self.classes {
            records.push(RawRecord::Class(class.attributes.clone()));
            for message in &class.messages {
                records.push(RawRecord::Message(message.attributes.clone()));
                records.extend(message.fields.iter().cloned().map(RawRecord::Field));
            }
        }
        records
    }
}

/// Parse and compile a JSON schema document.
pub fn load_json(text: &str) -> Result<SchemaModel, LoadError> {
    let document = SchemaDocument::from_json(text)?;
    Ok(SchemaCompiler::new().compile(&document.records())?)
}

/// Read and compile a JSON schema document from disk.
pub fn load_path(path: &Path, config: &SchemaConfig) -> Result<SchemaModel, LoadError> {
    let document = SchemaDocument::from_path(path, config)?;
    Ok(SchemaCompiler::new().compile(&document.records())?)
}
