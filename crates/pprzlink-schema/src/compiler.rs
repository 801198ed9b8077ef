use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::{CompileErrors, Result, SchemaError};
use crate::model::{Enumeration, FieldDefinition, MessageClass, MessageDefinition, SchemaModel};
use crate::source::{Attributes, RawRecord};
use crate::types::{FieldType, MAX_FIELD_WIDTH};

/// Turns raw schema records into a validated [`SchemaModel`].
///
/// Compilation is atomic: either every record is valid and a model is
/// returned, or every problem found is reported and no model exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaCompiler;

struct FieldBuilder {
    def: FieldDefinition,
    raw_values: Option<String>,
}

struct MessageBuilder {
    name: String,
    id: u8,
    broadcast: bool,
    description: String,
    fields: Vec<FieldBuilder>,
}

struct ClassBuilder {
    name: String,
    id: Option<u8>,
    messages: Vec<MessageBuilder>,
}

impl SchemaCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Compile an ordered record stream.
    pub fn compile(&self, records: &[RawRecord]) -> Result<SchemaModel> {
        let mut errors = Vec::new();
        let classes = collect(records, &mut errors);

        check_classes(&classes, &mut errors);

        if !errors.is_empty() {
            debug!(errors = errors.len(), "schema compilation failed");
            return Err(CompileErrors::new(errors));
        }

        let model = SchemaModel::new(
            classes
                .into_iter()
                .map(|class| {
                    let class_id = class.id.unwrap_or_default();
                    let messages = class
                        .messages
                        .into_iter()
                        .map(|m| build_message(&class.name, class_id, m))
                        .collect();
                    MessageClass::new(class.name, class.id, messages)
                })
                .collect(),
        );
        debug!(
            classes = model.classes().len(),
            messages = model.message_count(),
            "schema compiled"
        );
        Ok(model)
    }
}

/// First pass: group records into classes, messages and fields.
fn collect(records: &[RawRecord], errors: &mut Vec<SchemaError>) -> Vec<ClassBuilder> {
    let mut classes: Vec<ClassBuilder> = Vec::new();
    let mut class_index: HashMap<String, usize> = HashMap::new();
    let mut current_class: Option<usize> = None;
    let mut in_message = false;

    for record in records {
        match record {
            RawRecord::Class(attrs) => {
                in_message = false;
                let Some(name) = required(attrs, "name", "class", errors) else {
                    current_class = None;
                    continue;
                };
                let context = format!("class {name}");
                let id = id_attribute(attrs)
                    .and_then(|raw| parse_id(raw, &context, "id", errors));

                let idx = *class_index.entry(name.to_string()).or_insert_with(|| {
                    classes.push(ClassBuilder {
                        name: name.to_string(),
                        id: None,
                        messages: Vec::new(),
                    });
                    classes.len() - 1
                });
                let class = &mut classes[idx];
                match (class.id, id) {
                    (None, id) => class.id = id,
                    (Some(existing), Some(new)) if existing != new => {
                        errors.push(SchemaError::InvalidAttribute {
                            context,
                            attribute: "id",
                            value: new.to_string(),
                        });
                    }
                    _ => {}
                }
                current_class = Some(idx);
            }
            RawRecord::Message(attrs) => {
                in_message = false;
                let Some(class_idx) = current_class else {
                    errors.push(orphan("message", attrs, "class"));
                    continue;
                };
                let class = &mut classes[class_idx];
                let context = format!("message in class {}", class.name);
                let Some(name) = required(attrs, "name", &context, errors) else {
                    continue;
                };
                let context = format!("message {}.{name}", class.name);
                let id = match id_attribute(attrs) {
                    Some(raw) => parse_id(raw, &context, "id", errors),
                    None => {
                        errors.push(SchemaError::MissingAttribute {
                            context,
                            attribute: "id",
                        });
                        None
                    }
                };
                let Some(id) = id else {
                    continue;
                };

                class.messages.push(MessageBuilder {
                    name: name.to_string(),
                    id,
                    broadcast: attrs.get("link").map(String::as_str) != Some("forwarded"),
                    description: attrs.get("description").cloned().unwrap_or_default(),
                    fields: Vec::new(),
                });
                in_message = true;
            }
            RawRecord::Field(attrs) => {
                let Some(class_idx) = current_class.filter(|_| in_message) else {
                    errors.push(orphan("field", attrs, "message"));
                    continue;
                };
                let class = &mut classes[class_idx];
                let Some(message) = class.messages.last_mut() else {
                    errors.push(orphan("field", attrs, "message"));
                    continue;
                };
                if let Some(field) = field_builder(attrs, &class.name, message, errors) {
                    message.fields.push(field);
                }
            }
        }
    }

    classes
}

fn field_builder(
    attrs: &Attributes,
    class: &str,
    message: &MessageBuilder,
    errors: &mut Vec<SchemaError>,
) -> Option<FieldBuilder> {
    let context = format!("field in message {class}.{}", message.name);
    let name = required(attrs, "name", &context, errors)?;
    let context = format!("field {class}.{}.{name}", message.name);
    let type_name = required(attrs, "type", &context, errors)?;

    let Some(field_type) = FieldType::parse(type_name) else {
        errors.push(SchemaError::UnknownFieldType {
            class: class.to_string(),
            message: message.name.clone(),
            field: name.to_string(),
            type_name: type_name.to_string(),
        });
        return None;
    };
    if field_type.static_width().is_some_and(|width| width > MAX_FIELD_WIDTH) {
        errors.push(SchemaError::InvalidAttribute {
            context: context.clone(),
            attribute: "type",
            value: type_name.to_string(),
        });
        return None;
    }

    let mut def = FieldDefinition::new(name, field_type);
    def.unit = attrs.get("unit").cloned();
    def.alt_unit = attrs.get("alt_unit").cloned();
    def.format = attrs.get("format").cloned();
    def.description = attrs.get("description").cloned().unwrap_or_default();

    if let Some(raw) = attrs.get("alt_unit_coef") {
        match raw.trim().parse::<f64>() {
            Ok(coef) if coef.is_finite() => def.alt_unit_coef = coef,
            _ => errors.push(SchemaError::InvalidAttribute {
                context: context.clone(),
                attribute: "alt_unit_coef",
                value: raw.clone(),
            }),
        }
    }

    let raw_values = attrs.get("values").cloned();
    if raw_values.is_some() && !(field_type.base.is_integer() && !field_type.is_array()) {
        errors.push(SchemaError::InvalidAttribute {
            context,
            attribute: "values",
            value: field_type.to_string(),
        });
    }

    Some(FieldBuilder { def, raw_values })
}

/// Uniqueness and completeness checks over the collected classes.
fn check_classes(classes: &[ClassBuilder], errors: &mut Vec<SchemaError>) {
    let mut class_ids: HashMap<u8, &str> = HashMap::new();

    for class in classes {
        match class.id {
            Some(id) => {
                if let Some(first) = class_ids.insert(id, &class.name) {
                    errors.push(SchemaError::DuplicateClassId {
                        id,
                        first: first.to_string(),
                        second: class.name.clone(),
                    });
                }
            }
            None if !class.messages.is_empty() => {
                errors.push(SchemaError::MissingClassId {
                    class: class.name.clone(),
                });
            }
            None => {}
        }

        let mut ids: HashMap<u8, &str> = HashMap::new();
        let mut names: HashSet<&str> = HashSet::new();
        for message in &class.messages {
            if let Some(first) = ids.insert(message.id, &message.name) {
                errors.push(SchemaError::DuplicateMessageId {
                    class: class.name.clone(),
                    id: message.id,
                    first: first.to_string(),
                    second: message.name.clone(),
                });
            }
            if !names.insert(&message.name) {
                errors.push(SchemaError::DuplicateMessageName {
                    class: class.name.clone(),
                    message: message.name.clone(),
                });
            }

            let mut fields: HashSet<&str> = HashSet::new();
            for field in &message.fields {
                if !fields.insert(&field.def.name) {
                    errors.push(SchemaError::DuplicateFieldName {
                        class: class.name.clone(),
                        message: message.name.clone(),
                        field: field.def.name.clone(),
                    });
                }
            }
        }
    }
}

/// Second pass: resolve value lists and build the immutable definition.
fn build_message(class_name: &str, class_id: u8, message: MessageBuilder) -> MessageDefinition {
    let fields = message
        .fields
        .into_iter()
        .map(|field| {
            let mut def = field.def;
            def.values = field.raw_values.as_deref().map(Enumeration::parse);
            def
        })
        .collect();
    let mut def = MessageDefinition::new(class_name, class_id, message.name, message.id, fields);
    def.broadcast = message.broadcast;
    def.description = message.description;
    def
}

fn required<'a>(
    attrs: &'a Attributes,
    attribute: &'static str,
    context: &str,
    errors: &mut Vec<SchemaError>,
) -> Option<&'a str> {
    match attrs.get(attribute).map(|v| v.trim()) {
        Some(value) if !value.is_empty() => Some(value),
        _ => {
            errors.push(SchemaError::MissingAttribute {
                context: context.to_string(),
                attribute,
            });
            None
        }
    }
}

fn id_attribute(attrs: &Attributes) -> Option<&str> {
    attrs
        .get("id")
        .or_else(|| attrs.get("ID"))
        .map(String::as_str)
}

/// Parse a one-byte id, decimal or `0x` hexadecimal.
fn parse_id(
    raw: &str,
    context: &str,
    attribute: &'static str,
    errors: &mut Vec<SchemaError>,
) -> Option<u8> {
    let trimmed = raw.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16).ok(),
        None => trimmed.parse::<u8>().ok(),
    };
    if parsed.is_none() {
        errors.push(SchemaError::InvalidAttribute {
            context: context.to_string(),
            attribute,
            value: raw.to_string(),
        });
    }
    parsed
}

fn orphan(kind: &'static str, attrs: &Attributes, parent: &'static str) -> SchemaError {
    SchemaError::OrphanRecord {
        kind,
        name: attrs.get("name").cloned().unwrap_or_default(),
        parent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::attrs;
    use crate::types::{ArrayKind, BaseType};

    fn class(name: &str, id: Option<&str>) -> RawRecord {
        let mut a = attrs([("name", name)]);
        if let Some(id) = id {
            a.insert("id".to_string(), id.to_string());
        }
        RawRecord::Class(a)
    }

    fn message(name: &str, id: &str) -> RawRecord {
        RawRecord::Message(attrs([("name", name), ("id", id)]))
    }

    fn field(name: &str, ty: &str) -> RawRecord {
        RawRecord::Field(attrs([("name", name), ("type", ty)]))
    }

    fn sample() -> Vec<RawRecord> {
        vec![
            class("telemetry", Some("1")),
            message("ALIVE", "2"),
            field("md5sum", "uint8[]"),
            message("ATTITUDE", "6"),
            field("phi", "float"),
            field("psi", "float"),
            field("theta", "float"),
            class("datalink", Some("2")),
            message("PING", "8"),
            RawRecord::Message(attrs([("name", "SETTING"), ("id", "0x04"), ("link", "forwarded")])),
            field("index", "uint8"),
            field("ac_id", "uint8"),
            field("value", "float"),
            RawRecord::Field(attrs([
                ("name", "mode"),
                ("type", "uint8"),
                ("values", "MANUAL|AUTO1|AUTO2|MANUAL"),
                ("unit", "enum"),
            ])),
            RawRecord::Field(attrs([
                ("name", "course"),
                ("type", "int16"),
                ("unit", "decideg"),
                ("alt_unit", "deg"),
                ("alt_unit_coef", "0.1"),
            ])),
            field("name", "string"),
        ]
    }

    #[test]
    fn compiles_classes_messages_and_fields() {
        let model = SchemaCompiler::new().compile(&sample()).unwrap();

        assert_eq!(model.classes().len(), 2);
        let telemetry = model.class("telemetry").unwrap();
        assert_eq!(telemetry.id, Some(1));
        assert_eq!(telemetry.messages().len(), 2);

        let attitude = model.message_by_id(1, 6).unwrap();
        assert_eq!(attitude.name, "ATTITUDE");
        assert_eq!(attitude.field_names().collect::<Vec<_>>(), ["phi", "psi", "theta"]);
        assert!(attitude.broadcast);

        let setting = model.message("datalink", "SETTING").unwrap();
        assert_eq!(setting.id, 4);
        assert!(!setting.broadcast);
        assert_eq!(setting.class_id, 2);
    }

    #[test]
    fn resolves_types_units_and_enumerations() {
        let model = SchemaCompiler::new().compile(&sample()).unwrap();
        let setting = model.message("datalink", "SETTING").unwrap();

        let mode = setting.field("mode").unwrap();
        let values = mode.values.as_ref().unwrap();
        assert_eq!(values.names(), ["MANUAL", "AUTO1", "AUTO2", "MANUAL_2"]);
        assert_eq!(mode.unit.as_deref(), Some("enum"));

        let course = setting.field("course").unwrap();
        assert_eq!(course.alt_unit.as_deref(), Some("deg"));
        assert!((course.alt_unit_coef - 0.1).abs() < f64::EPSILON);
        assert!((setting.field("value").unwrap().alt_unit_coef - 1.0).abs() < f64::EPSILON);

        let name = setting.field("name").unwrap();
        assert_eq!(name.field_type.base, BaseType::Char);
        assert_eq!(name.field_type.array, ArrayKind::Variable);
    }

    #[test]
    fn duplicate_message_id_fails_without_model() {
        let records = vec![
            class("datalink", Some("2")),
            message("PING", "8"),
            message("PONG", "8"),
        ];
        let err = SchemaCompiler::new().compile(&records).unwrap_err();
        assert_eq!(
            err.errors(),
            [SchemaError::DuplicateMessageId {
                class: "datalink".to_string(),
                id: 8,
                first: "PING".to_string(),
                second: "PONG".to_string(),
            }]
        );
    }

    #[test]
    fn same_id_in_different_classes_is_allowed() {
        let records = vec![
            class("telemetry", Some("1")),
            message("PING", "8"),
            class("datalink", Some("2")),
            message("PING", "8"),
        ];
        assert!(SchemaCompiler::new().compile(&records).is_ok());
    }

    #[test]
    fn duplicate_field_name_is_reported() {
        let records = vec![
            class("telemetry", Some("1")),
            message("GPS", "8"),
            field("alt", "int32"),
            field("alt", "int32"),
        ];
        let err = SchemaCompiler::new().compile(&records).unwrap_err();
        assert!(matches!(
            &err.errors()[0],
            SchemaError::DuplicateFieldName { field, .. } if field == "alt"
        ));
    }

    #[test]
    fn unknown_type_and_missing_class_id_are_all_reported() {
        let records = vec![
            class("telemetry", None),
            message("GPS", "8"),
            field("fix", "bool"),
            class("empty", None),
        ];
        let err = SchemaCompiler::new().compile(&records).unwrap_err();
        assert_eq!(err.len(), 2);
        assert!(matches!(
            &err.errors()[0],
            SchemaError::UnknownFieldType { type_name, .. } if type_name == "bool"
        ));
        assert!(matches!(
            &err.errors()[1],
            SchemaError::MissingClassId { class } if class == "telemetry"
        ));
    }

    #[test]
    fn orphans_and_bad_attributes_are_reported() {
        let records = vec![
            field("lost", "uint8"),
            message("LOST", "1"),
            class("telemetry", Some("300")),
            RawRecord::Message(attrs([("name", "NO_ID")])),
        ];
        let err = SchemaCompiler::new().compile(&records).unwrap_err();
        let errors = err.errors();
        assert!(matches!(&errors[0], SchemaError::OrphanRecord { kind: "field", .. }));
        assert!(matches!(&errors[1], SchemaError::OrphanRecord { kind: "message", .. }));
        assert!(matches!(&errors[2], SchemaError::InvalidAttribute { attribute: "id", .. }));
        assert!(matches!(&errors[3], SchemaError::MissingAttribute { attribute: "id", .. }));
    }

    #[test]
    fn enumeration_on_float_field_is_rejected() {
        let records = vec![
            class("telemetry", Some("1")),
            message("BAD", "1"),
            RawRecord::Field(attrs([("name", "x"), ("type", "float"), ("values", "A|B")])),
        ];
        let err = SchemaCompiler::new().compile(&records).unwrap_err();
        assert!(matches!(
            &err.errors()[0],
            SchemaError::InvalidAttribute { attribute: "values", .. }
        ));
    }

    #[test]
    fn fixed_arrays_wider_than_a_frame_are_rejected() {
        let records = vec![
            class("telemetry", Some("1")),
            message("BIG", "1"),
            field("huge", "uint64[3000000000000000000]"),
            field("wide", "uint8[300]"),
            field("edge", "uint8[249]"),
        ];
        let err = SchemaCompiler::new().compile(&records).unwrap_err();
        assert_eq!(err.len(), 2);
        assert!(matches!(
            &err.errors()[0],
            SchemaError::UnknownFieldType { field, .. } if field == "huge"
        ));
        assert!(matches!(
            &err.errors()[1],
            SchemaError::InvalidAttribute { attribute: "type", value, .. } if value == "uint8[300]"
        ));

        let records = vec![
            class("telemetry", Some("1")),
            message("BIG", "1"),
            field("edge", "float[62]"),
        ];
        let model = SchemaCompiler::new().compile(&records).unwrap();
        let big = model.message("telemetry", "BIG").unwrap();
        assert_eq!(big.fields[0].field_type.static_width(), Some(248));
    }

    #[test]
    fn repeated_class_merges() {
        let records = vec![
            class("telemetry", Some("1")),
            message("A", "1"),
            class("telemetry", None),
            message("B", "2"),
        ];
        let model = SchemaCompiler::new().compile(&records).unwrap();
        assert_eq!(model.classes().len(), 1);
        assert_eq!(model.class("telemetry").unwrap().messages().len(), 2);
    }

    #[test]
    fn recompiling_yields_equal_independent_models() {
        let compiler = SchemaCompiler::new();
        let first = compiler.compile(&sample()).unwrap();
        let second = compiler.compile(&sample()).unwrap();
        assert_eq!(first, second);
        assert!(!std::ptr::eq(
            first.message("datalink", "PING").unwrap().as_ref(),
            second.message("datalink", "PING").unwrap().as_ref()
        ));
    }
}
