//! Accessor descriptors.
//!
//! Offsets index the frame body the parser hands out, i.e. they count the
//! header id bytes in front of the payload.

use std::fmt;

use serde::Serialize;

/// Where a field starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ByteOffset {
    /// Known from the schema alone.
    Static { offset: usize },
    /// Known only once the named Variable array has been read: `relative`
    /// bytes past its last element.
    Dynamic { after_field: String, relative: usize },
}

impl ByteOffset {
    pub fn as_static(&self) -> Option<usize> {
        match self {
            Self::Static { offset } => Some(*offset),
            Self::Dynamic { .. } => None,
        }
    }
}

impl fmt::Display for ByteOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static { offset } => write!(f, "{offset}"),
            Self::Dynamic {
                after_field,
                relative: 0,
            } => write!(f, "end({after_field})"),
            Self::Dynamic {
                after_field,
                relative,
            } => write!(f, "end({after_field})+{relative}"),
        }
    }
}

/// Element count accessor of a Variable array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LengthAccessor {
    /// Offset of the count byte.
    pub offset: ByteOffset,
    pub getter: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldAccessor {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    /// Offset of the first element (after the count byte for Variable arrays).
    pub offset: ByteOffset,
    pub element_width: usize,
    /// Encoded width, absent for Variable arrays.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<usize>,
    /// Element count of Fixed arrays.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elements: Option<usize>,
    pub getter: String,
    pub setter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<LengthAccessor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageBinding {
    pub class: String,
    pub class_id: u8,
    pub name: String,
    pub id: u8,
    pub fields: Vec<FieldAccessor>,
}

impl MessageBinding {
    pub fn field(&self, name: &str) -> Option<&FieldAccessor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Descriptor set for one schema, protocol version and backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bindings {
    pub protocol: String,
    pub backend: String,
    pub messages: Vec<MessageBinding>,
}

impl Bindings {
    pub fn message(&self, class: &str, name: &str) -> Option<&MessageBinding> {
        self.messages
            .iter()
            .find(|m| m.class == class && m.name == name)
    }
}
