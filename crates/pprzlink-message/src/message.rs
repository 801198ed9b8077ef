use std::fmt;
use std::sync::Arc;

use pprzlink_schema::{BaseType, FieldDefinition, MessageDefinition, SchemaModel};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::error::{CodecError, Result};
use crate::value::FieldValue;

/// One message instance: a definition plus a value per field, in
/// declaration order.
///
/// Values are always stored in the representation their field requires;
/// every setter goes through [`FieldValue::coerce`].
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    definition: Arc<MessageDefinition>,
    values: Vec<FieldValue>,
}

impl Message {
    /// Message with every field at its zero value.
    pub fn new(definition: Arc<MessageDefinition>) -> Self {
        let values = definition
            .fields
            .iter()
            .map(|f| FieldValue::default_for(&f.field_type))
            .collect();
        Self { definition, values }
    }

    pub fn with_values(definition: Arc<MessageDefinition>, values: Vec<FieldValue>) -> Result<Self> {
        let mut message = Self::new(definition);
        message.set_values(values)?;
        Ok(message)
    }

    /// Default instance of `class.name`.
    pub fn from_schema(schema: &SchemaModel, class: &str, name: &str) -> Result<Self> {
        let class_def = schema
            .class(class)
            .ok_or_else(|| CodecError::UnknownClass(class.to_string()))?;
        let definition = class_def
            .message(name)
            .ok_or_else(|| CodecError::UnknownMessage {
                class: class.to_string(),
                message: name.to_string(),
            })?;
        Ok(Self::new(Arc::clone(definition)))
    }

    pub fn definition(&self) -> &Arc<MessageDefinition> {
        &self.definition
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn class_name(&self) -> &str {
        &self.definition.class_name
    }

    pub fn id(&self) -> u8 {
        self.definition.id
    }

    pub fn class_id(&self) -> u8 {
        self.definition.class_id
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<FieldValue> {
        self.values
    }

    /// Field definitions paired with their current values.
    pub fn fields(&self) -> impl Iterator<Item = (&FieldDefinition, &FieldValue)> {
        self.definition.fields.iter().zip(&self.values)
    }

    pub fn get(&self, field: &str) -> Result<&FieldValue> {
        let idx = self.index(field)?;
        Ok(&self.values[idx])
    }

    pub fn get_index(&self, idx: usize) -> Option<&FieldValue> {
        self.values.get(idx)
    }

    pub fn set(&mut self, field: &str, value: impl Into<FieldValue>) -> Result<()> {
        let idx = self.index(field)?;
        self.set_index(idx, value)
    }

    pub fn set_index(&mut self, idx: usize, value: impl Into<FieldValue>) -> Result<()> {
        let Some(def) = self.definition.fields.get(idx) else {
            return Err(CodecError::UnknownField {
                message: self.definition.name.clone(),
                field: format!("#{idx}"),
            });
        };
        let value: FieldValue = value.into();
        self.values[idx] = value.coerce(def)?;
        Ok(())
    }

    /// Replace every value at once. Nothing changes on error.
    pub fn set_values(&mut self, values: Vec<FieldValue>) -> Result<()> {
        if values.len() != self.definition.fields.len() {
            return Err(CodecError::FieldCountMismatch {
                message: self.definition.name.clone(),
                expected: self.definition.fields.len(),
                actual: values.len(),
            });
        }
        let coerced = self
            .definition
            .fields
            .iter()
            .zip(values)
            .map(|(def, value)| value.coerce(def))
            .collect::<Result<Vec<_>>>()?;
        self.values = coerced;
        Ok(())
    }

    /// Symbolic name of an enumerated field's current value.
    ///
    /// `Ok(None)` when the field has no enumeration or the value is not one
    /// of its entries.
    pub fn enum_name(&self, field: &str) -> Result<Option<&str>> {
        let idx = self.index(field)?;
        let def = &self.definition.fields[idx];
        let (Some(values), Some(raw)) = (def.values.as_ref(), self.values[idx].as_u64()) else {
            return Ok(None);
        };
        Ok(values.name_of(raw))
    }

    /// Set an enumerated field by symbolic name.
    pub fn set_enum(&mut self, field: &str, name: &str) -> Result<()> {
        let idx = self.index(field)?;
        let def = &self.definition.fields[idx];
        let value = def
            .values
            .as_ref()
            .and_then(|values| values.value_of(name))
            .ok_or_else(|| CodecError::UnknownEnumValue {
                field: field.to_string(),
                name: name.to_string(),
            })?;
        self.set_index(idx, FieldValue::UInt(value))
    }

    /// Value scaled into the field's alternate unit (`value * alt_unit_coef`).
    pub fn alt_value(&self, field: &str) -> Result<f64> {
        let idx = self.index(field)?;
        let def = &self.definition.fields[idx];
        let value = &self.values[idx];
        value
            .as_f64()
            .map(|v| v * def.alt_unit_coef)
            .ok_or_else(|| CodecError::TypeMismatch {
                field: field.to_string(),
                expected: "a numeric scalar".to_string(),
                found: value.kind(),
            })
    }

    /// Set a field from a value in its alternate unit. Integer fields round
    /// to the nearest representable value.
    pub fn set_alt_value(&mut self, field: &str, alt: f64) -> Result<()> {
        let idx = self.index(field)?;
        let def = &self.definition.fields[idx];
        if def.alt_unit_coef == 0.0 {
            return Err(CodecError::ValueOutOfRange {
                field: field.to_string(),
                value: alt.to_string(),
                ty: def.field_type.to_string(),
            });
        }
        let raw = alt / def.alt_unit_coef;
        let value = if def.field_type.base.is_float() {
            FieldValue::Float(raw)
        } else {
            let rounded = raw.round();
            if !rounded.is_finite() || rounded < i64::MIN as f64 || rounded > u64::MAX as f64 {
                return Err(CodecError::ValueOutOfRange {
                    field: field.to_string(),
                    value: raw.to_string(),
                    ty: def.field_type.to_string(),
                });
            }
            if rounded < 0.0 {
                FieldValue::Int(rounded as i64)
            } else {
                FieldValue::UInt(rounded as u64)
            }
        };
        self.set_index(idx, value)
    }

    /// Items of a `csv` / `;sv` formatted text field.
    ///
    /// Returns `None` for fields without a list format.
    pub fn list_items(&self, field: &str) -> Result<Option<Vec<&str>>> {
        let idx = self.index(field)?;
        let Some(sep) = self.definition.fields[idx].list_separator() else {
            return Ok(None);
        };
        let items = match &self.values[idx] {
            FieldValue::Text(s) if s.is_empty() => Vec::new(),
            FieldValue::Text(s) => s.split(sep).collect(),
            _ => return Ok(None),
        };
        Ok(Some(items))
    }

    /// JSON object with `msgclass`, `msgname` and one key per field.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// JSON object with one key per field only.
    pub fn to_json_payload(&self) -> Result<String> {
        Ok(serde_json::to_string(&Payload(self))?)
    }

    /// Rebuild a message from its [`to_json`](Self::to_json) form. Missing
    /// fields keep their zero value.
    pub fn from_json(schema: &SchemaModel, text: &str) -> Result<Self> {
        let json: Value = serde_json::from_str(text)?;
        let Value::Object(map) = json else {
            return Err(CodecError::InvalidJson("expected an object".to_string()));
        };
        let class = map.get("msgclass").and_then(Value::as_str);
        let name = map.get("msgname").and_then(Value::as_str);
        let (Some(class), Some(name)) = (class, name) else {
            return Err(CodecError::InvalidJson(
                "missing 'msgclass' or 'msgname'".to_string(),
            ));
        };

        let mut message = Self::from_schema(schema, class, name)?;
        for (key, value) in &map {
            if key == "msgclass" || key == "msgname" {
                continue;
            }
            let idx = message.index(key)?;
            let def = &message.definition.fields[idx];
            message.values[idx] = FieldValue::from_json(def, value)?;
        }
        Ok(message)
    }

    fn index(&self, field: &str) -> Result<usize> {
        self.definition
            .index_of(field)
            .ok_or_else(|| CodecError::UnknownField {
                message: self.definition.name.clone(),
                field: field.to_string(),
            })
    }
}

impl fmt::Display for Message {
    /// `class.NAME { field : value, ... }`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} {{", self.class_name(), self.name())?;
        for (def, value) in self.fields() {
            let mut text = String::new();
            value.write_text(def.field_type.base, &mut text);
            write!(f, " {} : {},", def.name, text)?;
        }
        f.write_str(" }")
    }
}

struct JsonField<'a> {
    base: BaseType,
    value: &'a FieldValue,
}

impl Serialize for JsonField<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let single = self.base == BaseType::Float;
        match self.value {
            FieldValue::Int(v) => serializer.serialize_i64(*v),
            FieldValue::UInt(v) => serializer.serialize_u64(*v),
            FieldValue::Float(v) if single => serializer.serialize_f32(*v as f32),
            FieldValue::Float(v) => serializer.serialize_f64(*v),
            FieldValue::Char(c) => serializer.serialize_char(char::from(*c)),
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::IntArray(v) => v.serialize(serializer),
            FieldValue::UIntArray(v) => v.serialize(serializer),
            FieldValue::FloatArray(v) if single => v
                .iter()
                .map(|x| *x as f32)
                .collect::<Vec<_>>()
                .serialize(serializer),
            FieldValue::FloatArray(v) => v.serialize(serializer),
        }
    }
}

fn serialize_fields<M: SerializeMap>(message: &Message, map: &mut M) -> std::result::Result<(), M::Error> {
    for (def, value) in message.fields() {
        map.serialize_entry(
            &def.name,
            &JsonField {
                base: def.field_type.base,
                value,
            },
        )?;
    }
    Ok(())
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 2))?;
        map.serialize_entry("msgclass", self.class_name())?;
        map.serialize_entry("msgname", self.name())?;
        serialize_fields(self, &mut map)?;
        map.end()
    }
}

struct Payload<'a>(&'a Message);

impl Serialize for Payload<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.values.len()))?;
        serialize_fields(self.0, &mut map)?;
        map.end()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use pprzlink_schema::{attrs, FieldType, RawRecord, SchemaCompiler};

    use super::*;

    pub(crate) fn schema() -> SchemaModel {
        let class = |name: &str, id: &str| RawRecord::Class(attrs([("name", name), ("id", id)]));
        let message = |name: &str, id: &str| RawRecord::Message(attrs([("name", name), ("id", id)]));
        let field = |name: &str, ty: &str| RawRecord::Field(attrs([("name", name), ("type", ty)]));
        SchemaCompiler::new()
            .compile(&[
                class("telemetry", "1"),
                message("ALIVE", "2"),
                field("md5sum", "uint8[]"),
                message("ATTITUDE", "6"),
                field("phi", "float"),
                field("psi", "float"),
                field("theta", "float"),
                message("GPS_POS", "7"),
                field("pos", "uint8[3]"),
                field("tow", "uint32"),
                message("TRAJ", "9"),
                field("xs", "float[]"),
                field("ys", "float[]"),
                class("datalink", "2"),
                message("PING", "8"),
                RawRecord::Message(attrs([("name", "SETTING"), ("id", "4"), ("link", "forwarded")])),
                field("index", "uint8"),
                field("ac_id", "uint8"),
                field("value", "float"),
                RawRecord::Field(attrs([
                    ("name", "mode"),
                    ("type", "uint8"),
                    ("values", "MANUAL|AUTO1|AUTO2"),
                ])),
                RawRecord::Field(attrs([
                    ("name", "course"),
                    ("type", "int16"),
                    ("alt_unit", "deg"),
                    ("alt_unit_coef", "0.1"),
                ])),
                field("name", "string"),
                message("WP_MOVED", "5"),
                field("wp_id", "uint8"),
                field("ac_id", "uint8"),
                field("east", "int32"),
                field("label", "char[4]"),
                class("ground", "3"),
                message("RAW_DATALINK", "10"),
                field("ac_id", "uint8"),
                RawRecord::Field(attrs([("name", "message"), ("type", "string"), ("format", ";sv")])),
                message("CONFIG_REQ", "11"),
                field("ac_id", "uint8"),
                message("CONFIG", "12"),
                field("ac_id", "uint8"),
                field("url", "string"),
            ])
            .unwrap()
    }

    pub(crate) fn setting() -> Message {
        Message::from_schema(&schema(), "datalink", "SETTING").unwrap()
    }

    #[test]
    fn new_message_has_zero_values() {
        let msg = setting();
        assert_eq!(msg.name(), "SETTING");
        assert_eq!(msg.class_id(), 2);
        assert_eq!(msg.get("index").unwrap(), &FieldValue::UInt(0));
        assert_eq!(msg.get("value").unwrap(), &FieldValue::Float(0.0));
        assert_eq!(msg.get("name").unwrap(), &FieldValue::Text(String::new()));
    }

    #[test]
    fn unknown_names_are_errors() {
        let mut msg = setting();
        assert!(matches!(
            msg.get("nope"),
            Err(CodecError::UnknownField { .. })
        ));
        assert!(msg.set("nope", 1u8).is_err());
        assert!(matches!(
            Message::from_schema(&schema(), "datalink", "NOPE"),
            Err(CodecError::UnknownMessage { .. })
        ));
        assert!(matches!(
            Message::from_schema(&schema(), "nope", "PING"),
            Err(CodecError::UnknownClass(_))
        ));
    }

    #[test]
    fn set_values_checks_count_atomically() {
        let mut msg = setting();
        let err = msg.set_values(vec![FieldValue::UInt(1)]).unwrap_err();
        assert!(matches!(
            err,
            CodecError::FieldCountMismatch { expected: 6, actual: 1, .. }
        ));

        let err = msg
            .set_values(vec![
                1u8.into(),
                2u8.into(),
                0.5f64.into(),
                1u8.into(),
                FieldValue::Int(40_000),
                "x".into(),
            ])
            .unwrap_err();
        assert!(matches!(err, CodecError::ValueOutOfRange { .. }));
        assert_eq!(msg.get("index").unwrap(), &FieldValue::UInt(0));
    }

    #[test]
    fn enumerated_fields() {
        let mut msg = setting();
        msg.set_enum("mode", "AUTO2").unwrap();
        assert_eq!(msg.get("mode").unwrap(), &FieldValue::UInt(2));
        assert_eq!(msg.enum_name("mode").unwrap(), Some("AUTO2"));
        assert_eq!(msg.enum_name("index").unwrap(), None);
        assert!(matches!(
            msg.set_enum("mode", "AUTO9"),
            Err(CodecError::UnknownEnumValue { .. })
        ));
    }

    #[test]
    fn alternate_unit() {
        let mut msg = setting();
        msg.set("course", 900i64).unwrap();
        assert!((msg.alt_value("course").unwrap() - 90.0).abs() < 1e-9);

        msg.set_alt_value("course", -45.0).unwrap();
        assert_eq!(msg.get("course").unwrap(), &FieldValue::Int(-450));
        assert!(msg.alt_value("name").is_err());
    }

    #[test]
    fn zero_alternate_coefficient_is_rejected() {
        let mut gain = FieldDefinition::new("gain", FieldType::scalar(BaseType::Float));
        gain.alt_unit_coef = 0.0;
        let definition = MessageDefinition::new("datalink", 2, "GAIN", 30, vec![gain]);
        let mut msg = Message::new(Arc::new(definition));

        assert!(matches!(
            msg.set_alt_value("gain", 2.0),
            Err(CodecError::ValueOutOfRange { field, .. }) if field == "gain"
        ));
        assert_eq!(msg.get("gain").unwrap(), &FieldValue::Float(0.0));
    }

    #[test]
    fn list_formatted_field() {
        let schema = schema();
        let mut raw = Message::from_schema(&schema, "ground", "RAW_DATALINK").unwrap();
        raw.set("message", "PING;").unwrap();
        assert_eq!(raw.list_items("message").unwrap(), Some(vec!["PING", ""]));
        assert_eq!(raw.list_items("ac_id").unwrap(), None);
    }

    #[test]
    fn json_round_trip() {
        let schema = schema();
        let mut msg = setting();
        msg.set("index", 3u8).unwrap();
        msg.set("value", 0.1f32).unwrap();
        msg.set("name", "alt").unwrap();

        let json = msg.to_json().unwrap();
        assert!(json.starts_with(r#"{"msgclass":"datalink","msgname":"SETTING","index":3"#));
        assert!(json.contains(r#""value":0.1,"#));

        let back = Message::from_json(&schema, &json).unwrap();
        assert_eq!(back.get("index").unwrap(), &FieldValue::UInt(3));
        assert_eq!(back.get("name").unwrap(), &FieldValue::Text("alt".into()));

        let payload = msg.to_json_payload().unwrap();
        assert!(payload.starts_with(r#"{"index":3,"#));
    }

    #[test]
    fn json_requires_addressing_keys() {
        assert!(matches!(
            Message::from_json(&schema(), r#"{"index": 1}"#),
            Err(CodecError::InvalidJson(_))
        ));
    }

    #[test]
    fn display_form() {
        let schema = schema();
        let mut msg = Message::from_schema(&schema, "telemetry", "GPS_POS").unwrap();
        msg.set("pos", vec![1u64, 2, 3]).unwrap();
        msg.set("tow", 77u32).unwrap();
        assert_eq!(msg.to_string(), "telemetry.GPS_POS { pos : 1,2,3, tow : 77, }");
    }
}
