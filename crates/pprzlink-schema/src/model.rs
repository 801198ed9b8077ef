//! Compiled, immutable schema representation.
//!
//! A [`SchemaModel`] is produced once by the
//! [`SchemaCompiler`](crate::SchemaCompiler) and then shared read-only by
//! every codec. Message definitions are reference counted so decoded message
//! instances can outlive the borrow of the model they came from.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::types::FieldType;

/// Named values of an integer field. The n-th entry has value n.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enumeration {
    names: Vec<String>,
}

impl Enumeration {
    /// Build from raw names, suffixing repeated names with their occurrence
    /// count (`A`, `A_2`, `A_3`, ...).
    pub fn from_names<'a>(raw: impl IntoIterator<Item = &'a str>) -> Self {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        let mut names = Vec::new();
        for name in raw {
            let count = seen.entry(name).or_insert(0);
            *count += 1;
            if *count == 1 {
                names.push(name.to_string());
            } else {
                names.push(format!("{name}_{count}"));
            }
        }
        Self { names }
    }

    /// Parse a pipe-delimited value list (`"OFF|ON|AUTO"`).
    pub fn parse(values: &str) -> Self {
        Self::from_names(values.split('|').map(str::trim))
    }

    pub fn name_of(&self, value: u64) -> Option<&str> {
        usize::try_from(value)
            .ok()
            .and_then(|idx| self.names.get(idx))
            .map(String::as_str)
    }

    pub fn value_of(&self, name: &str) -> Option<u64> {
        self.names
            .iter()
            .position(|candidate| candidate == name)
            .map(|idx| idx as u64)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// One field of a message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_unit: Option<String>,
    /// Conversion factor from `unit` to `alt_unit`. Defaults to 1.0.
    pub alt_unit_coef: f64,
    /// Display format hint (`%d`, `csv`, `;sv`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Enumeration>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            unit: None,
            alt_unit: None,
            alt_unit_coef: 1.0,
            format: None,
            values: None,
            description: String::new(),
        }
    }

    pub fn is_enum(&self) -> bool {
        self.values.is_some()
    }

    /// Separator for `csv` / `;sv` formatted text fields.
    pub fn list_separator(&self) -> Option<char> {
        match self.format.as_deref() {
            Some("csv") => Some(','),
            Some(";sv") => Some(';'),
            _ => None,
        }
    }
}

/// One message of a class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageDefinition {
    pub class_name: String,
    pub class_id: u8,
    pub name: String,
    pub id: u8,
    /// False when the message is marked `link="forwarded"` (point-to-point).
    pub broadcast: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub fields: Vec<FieldDefinition>,
    #[serde(skip)]
    field_index: HashMap<String, usize>,
}

impl MessageDefinition {
    /// Build a definition. Field names are assumed unique; the compiler
    /// guarantees it.
    pub fn new(
        class_name: impl Into<String>,
        class_id: u8,
        name: impl Into<String>,
        id: u8,
        fields: Vec<FieldDefinition>,
    ) -> Self {
        let field_index = fields
            .iter()
            .enumerate()
            .map(|(idx, field)| (field.name.clone(), idx))
            .collect();
        Self {
            class_name: class_name.into(),
            class_id,
            name: name.into(),
            id,
            broadcast: true,
            description: String::new(),
            fields,
            field_index,
        }
    }

    pub fn index_of(&self, field: &str) -> Option<usize> {
        self.field_index.get(field).copied()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.index_of(name).map(|idx| &self.fields[idx])
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn has_variable_fields(&self) -> bool {
        self.fields.iter().any(|f| f.field_type.is_variable())
    }

    /// Payload size when no field is a Variable array.
    pub fn static_payload_len(&self) -> Option<usize> {
        self.fields
            .iter()
            .map(|f| f.field_type.static_width())
            .sum()
    }

    /// Smallest valid payload size (Variable arrays empty).
    pub fn min_payload_len(&self) -> usize {
        self.fields.iter().map(|f| f.field_type.min_width()).sum()
    }
}

/// A message namespace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageClass {
    pub name: String,
    /// Absent only for classes that declare no messages.
    pub id: Option<u8>,
    messages: Vec<Arc<MessageDefinition>>,
    #[serde(skip)]
    by_id: HashMap<u8, usize>,
    #[serde(skip)]
    by_name: HashMap<String, usize>,
}

impl MessageClass {
    pub(crate) fn new(name: String, id: Option<u8>, messages: Vec<MessageDefinition>) -> Self {
        let messages: Vec<Arc<MessageDefinition>> = messages.into_iter().map(Arc::new).collect();
        let by_id = messages
            .iter()
            .enumerate()
            .map(|(idx, m)| (m.id, idx))
            .collect();
        let by_name = messages
            .iter()
            .enumerate()
            .map(|(idx, m)| (m.name.clone(), idx))
            .collect();
        Self {
            name,
            id,
            messages,
            by_id,
            by_name,
        }
    }

    /// Messages in declaration order.
    pub fn messages(&self) -> &[Arc<MessageDefinition>] {
        &self.messages
    }

    pub fn message(&self, name: &str) -> Option<&Arc<MessageDefinition>> {
        self.by_name.get(name).map(|idx| &self.messages[*idx])
    }

    pub fn message_by_id(&self, id: u8) -> Option<&Arc<MessageDefinition>> {
        self.by_id.get(&id).map(|idx| &self.messages[*idx])
    }
}

/// The compiled schema: classes in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaModel {
    classes: Vec<MessageClass>,
    #[serde(skip)]
    by_name: HashMap<String, usize>,
    #[serde(skip)]
    by_id: HashMap<u8, usize>,
}

impl SchemaModel {
    pub(crate) fn new(classes: Vec<MessageClass>) -> Self {
        let by_name = classes
            .iter()
            .enumerate()
            .map(|(idx, c)| (c.name.clone(), idx))
            .collect();
        let by_id = classes
            .iter()
            .enumerate()
            .filter_map(|(idx, c)| c.id.map(|id| (id, idx)))
            .collect();
        Self {
            classes,
            by_name,
            by_id,
        }
    }

    pub fn classes(&self) -> &[MessageClass] {
        &self.classes
    }

    pub fn class(&self, name: &str) -> Option<&MessageClass> {
        self.by_name.get(name).map(|idx| &self.classes[*idx])
    }

    pub fn class_by_id(&self, id: u8) -> Option<&MessageClass> {
        self.by_id.get(&id).map(|idx| &self.classes[*idx])
    }

    pub fn message(&self, class: &str, name: &str) -> Option<&Arc<MessageDefinition>> {
        self.class(class).and_then(|c| c.message(name))
    }

    pub fn message_by_id(&self, class_id: u8, msg_id: u8) -> Option<&Arc<MessageDefinition>> {
        self.class_by_id(class_id)
            .and_then(|c| c.message_by_id(msg_id))
    }

    /// First message with this name, searching classes in declaration order.
    pub fn find_message(&self, name: &str) -> Option<&Arc<MessageDefinition>> {
        self.classes.iter().find_map(|c| c.message(name))
    }

    /// Total number of messages across classes.
    pub fn message_count(&self) -> usize {
        self.classes.iter().map(|c| c.messages.len()).sum()
    }
}
