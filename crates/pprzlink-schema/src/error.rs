use std::fmt;

/// One problem found while compiling a schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// The same message id is used twice in a class.
    #[error("duplicate message id {id} in class {class} ({first} and {second})")]
    DuplicateMessageId {
        class: String,
        id: u8,
        first: String,
        second: String,
    },

    /// The same message name is used twice in a class.
    #[error("duplicate message name {message} in class {class}")]
    DuplicateMessageName { class: String, message: String },

    /// The same field name is used twice in a message.
    #[error("duplicate field {field} in message {class}.{message}")]
    DuplicateFieldName {
        class: String,
        message: String,
        field: String,
    },

    /// Two classes share a numeric id.
    #[error("duplicate class id {id} ({first} and {second})")]
    DuplicateClassId {
        id: u8,
        first: String,
        second: String,
    },

    /// A field type string could not be parsed.
    #[error("unknown type '{type_name}' for field {class}.{message}.{field}")]
    UnknownFieldType {
        class: String,
        message: String,
        field: String,
        type_name: String,
    },

    /// A class declares messages but has no numeric id.
    #[error("class {class} has messages but no id")]
    MissingClassId { class: String },

    /// A required attribute is absent.
    #[error("{context}: missing attribute '{attribute}'")]
    MissingAttribute {
        context: String,
        attribute: &'static str,
    },

    /// An attribute value is not valid.
    #[error("{context}: invalid {attribute} '{value}'")]
    InvalidAttribute {
        context: String,
        attribute: &'static str,
        value: String,
    },

    /// A message record before any class, or a field record before any message.
    #[error("{kind} record '{name}' has no enclosing {parent}")]
    OrphanRecord {
        kind: &'static str,
        name: String,
        parent: &'static str,
    },
}

/// Compilation failure: every problem found, in source order. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileErrors(Vec<SchemaError>);

impl CompileErrors {
    pub(crate) fn new(errors: Vec<SchemaError>) -> Self {
        debug_assert!(!errors.is_empty());
        Self(errors)
    }

    pub fn errors(&self) -> &[SchemaError] {
        &self.0
    }

    pub fn into_errors(self) -> Vec<SchemaError> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CompileErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [single] => write!(f, "schema compilation failed: {single}"),
            [first, rest @ ..] => write!(
                f,
                "schema compilation failed: {first} (and {} more)",
                rest.len()
            ),
            [] => f.write_str("schema compilation failed"),
        }
    }
}

impl std::error::Error for CompileErrors {}

impl IntoIterator for CompileErrors {
    type Item = SchemaError;
    type IntoIter = std::vec::IntoIter<SchemaError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Errors that can occur while loading a schema document.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The document could not be read.
    #[error("failed to load schema: {0}")]
    LoadFailed(String),

    /// The document exceeds the configured size limit.
    #[error("schema document too large ({size} bytes, max {max})")]
    TooLarge { size: u64, max: usize },

    /// The document is not valid JSON or does not have the expected shape.
    #[error("schema document is not valid: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The document parsed but does not compile.
    #[error(transparent)]
    Compile(#[from] CompileErrors),
}

pub type Result<T> = std::result::Result<T, CompileErrors>;
