use pprzlink_frame::ProtocolVersion;
use pprzlink_schema::{ArrayKind, MessageClass, MessageDefinition, SchemaModel};
use tracing::debug;

use crate::backend::{Backend, Position, Site};
use crate::descriptor::{Bindings, ByteOffset, FieldAccessor, LengthAccessor, MessageBinding};
use crate::error::{BindgenError, Result};

/// Next free byte while walking a message in encoding order.
enum Cursor {
    Static(usize),
    Dynamic {
        after_field: String,
        end: String,
        relative: usize,
    },
}

impl Cursor {
    fn position(&self) -> Position {
        match self {
            Self::Static(offset) => Position {
                offset: ByteOffset::Static { offset: *offset },
                expr: offset.to_string(),
            },
            Self::Dynamic {
                after_field,
                end,
                relative,
            } => Position {
                offset: ByteOffset::Dynamic {
                    after_field: after_field.clone(),
                    relative: *relative,
                },
                expr: if *relative == 0 {
                    end.clone()
                } else {
                    format!("{end} + {relative}")
                },
            },
        }
    }

    fn advance(&mut self, n: usize) {
        match self {
            Self::Static(offset) => *offset += n,
            Self::Dynamic { relative, .. } => *relative += n,
        }
    }
}

/// Accessor descriptors for every message of the schema, classes and
/// messages in schema order.
///
/// The output depends on nothing but the arguments.
pub fn generate(
    schema: &SchemaModel,
    version: ProtocolVersion,
    backend: &dyn Backend,
) -> Result<Bindings> {
    let mut messages = Vec::with_capacity(schema.message_count());
    for class in schema.classes() {
        messages.extend(class_bindings(class, version, backend)?);
    }
    debug!(
        backend = backend.name(),
        protocol = %version,
        messages = messages.len(),
        "generated bindings"
    );
    Ok(Bindings {
        protocol: version.as_str().to_string(),
        backend: backend.name().to_string(),
        messages,
    })
}

/// Same as [`generate`] restricted to one class.
pub fn generate_class(
    schema: &SchemaModel,
    class: &str,
    version: ProtocolVersion,
    backend: &dyn Backend,
) -> Result<Bindings> {
    let class = schema
        .class(class)
        .ok_or_else(|| BindgenError::UnknownClass(class.to_string()))?;
    Ok(Bindings {
        protocol: version.as_str().to_string(),
        backend: backend.name().to_string(),
        messages: class_bindings(class, version, backend)?,
    })
}

fn class_bindings(
    class: &MessageClass,
    version: ProtocolVersion,
    backend: &dyn Backend,
) -> Result<Vec<MessageBinding>> {
    class
        .messages()
        .iter()
        .map(|message| message_binding(message, version, backend))
        .collect()
}

/// Walk the fields in encoding order, accumulating widths from the end of
/// the header ids.
pub fn message_binding(
    message: &MessageDefinition,
    version: ProtocolVersion,
    backend: &dyn Backend,
) -> Result<MessageBinding> {
    let mut cursor = Cursor::Static(version.header_len());
    let mut fields = Vec::with_capacity(message.fields.len());

    for field in &message.fields {
        if let Cursor::Dynamic { after_field, .. } = &cursor {
            if backend.requires_variable_last() {
                return Err(BindgenError::VariableFieldNotLast {
                    class: message.class_name.clone(),
                    message: message.name.clone(),
                    field: after_field.clone(),
                });
            }
        }

        let ty = field.field_type;
        let element_width = ty.base.width();

        let accessor = if ty.array == ArrayKind::Variable {
            let count = cursor.position();
            cursor.advance(1);
            let at = cursor.position();
            let site = Site {
                field,
                at: &at,
                count: Some(&count),
            };
            let accessor = FieldAccessor {
                name: field.name.clone(),
                field_type: ty.to_string(),
                offset: at.offset.clone(),
                element_width,
                width: None,
                elements: None,
                getter: backend.getter(&site),
                setter: backend.setter(&site),
                length: Some(LengthAccessor {
                    offset: count.offset.clone(),
                    getter: backend.length_getter(&site),
                }),
            };
            cursor = Cursor::Dynamic {
                after_field: field.name.clone(),
                end: backend.variable_end(&site),
                relative: 0,
            };
            accessor
        } else {
            let width = ty.min_width();
            let at = cursor.position();
            let site = Site {
                field,
                at: &at,
                count: None,
            };
            let accessor = FieldAccessor {
                name: field.name.clone(),
                field_type: ty.to_string(),
                offset: at.offset.clone(),
                element_width,
                width: Some(width),
                elements: match ty.array {
                    ArrayKind::Fixed(n) => Some(n),
                    _ => None,
                },
                getter: backend.getter(&site),
                setter: backend.setter(&site),
                length: None,
            };
            cursor.advance(width);
            accessor
        };
        fields.push(accessor);
    }

    Ok(MessageBinding {
        class: message.class_name.clone(),
        class_id: message.class_id,
        name: message.name.clone(),
        id: message.id,
        fields,
    })
}
