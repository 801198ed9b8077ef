/// Errors produced while generating or emitting bindings.
#[derive(Debug, thiserror::Error)]
pub enum BindgenError {
    /// The requested class is not in the schema.
    #[error("unknown message class: {0}")]
    UnknownClass(String),

    /// A Variable array is followed by another field and the backend needs
    /// every offset to be static.
    #[error("variable field {class}.{message}.{field} is not the last field")]
    VariableFieldNotLast {
        class: String,
        message: String,
        field: String,
    },

    #[error("emit failed: {0}")]
    Emit(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BindgenError>;
