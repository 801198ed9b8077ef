//! Typed field values.

use std::fmt::{self, Write as _};

use pprzlink_schema::{ArrayKind, BaseType, FieldDefinition, FieldType};
use serde_json::Value;

use crate::error::{CodecError, Result};

/// Largest element count a Variable array can carry (one count byte).
pub const MAX_VARIABLE_LEN: usize = u8::MAX as usize;

/// Value of one message field.
///
/// Char arrays are held as [`FieldValue::Text`], one `char` per wire byte
/// (`U+0000..=U+00FF`), so any byte sequence round-trips.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Char(u8),
    Text(String),
    IntArray(Vec<i64>),
    UIntArray(Vec<u64>),
    FloatArray(Vec<f64>),
}

impl FieldValue {
    /// Zero value for a field type. Fixed arrays are pre-sized.
    pub fn default_for(ty: &FieldType) -> Self {
        let len = match ty.array {
            ArrayKind::None => return scalar_default(ty.base),
            ArrayKind::Fixed(n) => n,
            ArrayKind::Variable => 0,
        };
        match ty.base {
            BaseType::Char => Self::Text(String::new()),
            base if base.is_float() => Self::FloatArray(vec![0.0; len]),
            base if base.is_signed() => Self::IntArray(vec![0; len]),
            _ => Self::UIntArray(vec![0; len]),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Int(_) => "a signed integer",
            Self::UInt(_) => "an unsigned integer",
            Self::Float(_) => "a float",
            Self::Char(_) => "a char",
            Self::Text(_) => "text",
            Self::IntArray(_) => "a signed integer array",
            Self::UIntArray(_) => "an unsigned integer array",
            Self::FloatArray(_) => "a float array",
        }
    }

    /// Numeric scalar as `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Int(v) => Some(v as f64),
            Self::UInt(v) => Some(v as f64),
            Self::Float(v) => Some(v),
            Self::Char(v) => Some(f64::from(v)),
            _ => None,
        }
    }

    /// Integer scalar as `i64`, if it fits.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Int(v) => Some(v),
            Self::UInt(v) => i64::try_from(v).ok(),
            Self::Char(v) => Some(i64::from(v)),
            _ => None,
        }
    }

    /// Integer scalar as `u64`, if it fits.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Self::Int(v) => u64::try_from(v).ok(),
            Self::UInt(v) => Some(v),
            Self::Char(v) => Some(u64::from(v)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Element count of an array value.
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::Text(s) => Some(s.chars().count()),
            Self::IntArray(v) => Some(v.len()),
            Self::UIntArray(v) => Some(v.len()),
            Self::FloatArray(v) => Some(v.len()),
            _ => None,
        }
    }

    /// Convert to the representation `field` stores, checking ranges and
    /// array lengths.
    pub fn coerce(self, field: &FieldDefinition) -> Result<Self> {
        let ty = &field.field_type;
        match ty.array {
            ArrayKind::None => coerce_scalar(field, ty.base, self),
            ArrayKind::Fixed(_) | ArrayKind::Variable => {
                let value = if ty.base == BaseType::Char {
                    coerce_text(field, self)?
                } else {
                    coerce_array(field, ty.base, self)?
                };
                check_len(field, value.len().unwrap_or_default())?;
                Ok(value)
            }
        }
    }

    /// Build a value of `field`'s type from JSON.
    pub fn from_json(field: &FieldDefinition, json: &Value) -> Result<Self> {
        let value = match json {
            Value::Number(n) => json_number(n),
            Value::String(s) => Self::Text(s.clone()),
            Value::Bool(b) => Self::UInt(u64::from(*b)),
            Value::Array(items) => {
                let numbers = items
                    .iter()
                    .map(|item| match item {
                        Value::Number(n) => Ok(json_number(n)),
                        _ => Err(mismatch(field, "a mixed array")),
                    })
                    .collect::<Result<Vec<_>>>()?;
                numbers_to_array(numbers)
            }
            Value::Null | Value::Object(_) => {
                return Err(mismatch(field, "a JSON object or null"));
            }
        };
        value.coerce(field)
    }

    /// Append the text bus form: scalars plainly, arrays comma-joined, text
    /// unquoted. Single-precision floats print at `f32` precision.
    pub fn write_text(&self, base: BaseType, out: &mut String) {
        match self {
            Self::Int(v) => {
                let _ = write!(out, "{v}");
            }
            Self::UInt(v) => {
                let _ = write!(out, "{v}");
            }
            Self::Float(v) => write_float(out, base, *v),
            Self::Char(c) => out.push(char::from(*c)),
            Self::Text(s) => out.push_str(s),
            Self::IntArray(items) => write_joined(out, items, |out, v| {
                let _ = write!(out, "{v}");
            }),
            Self::UIntArray(items) => write_joined(out, items, |out, v| {
                let _ = write!(out, "{v}");
            }),
            Self::FloatArray(items) => {
                write_joined(out, items, |out, v| write_float(out, base, *v));
            }
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write_text(BaseType::Double, &mut out);
        f.write_str(&out)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        Self::UInt(u64::from(v))
    }
}

impl From<u8> for FieldValue {
    fn from(v: u8) -> Self {
        Self::UInt(u64::from(v))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<f32> for FieldValue {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<i64>> for FieldValue {
    fn from(v: Vec<i64>) -> Self {
        Self::IntArray(v)
    }
}

impl From<Vec<u64>> for FieldValue {
    fn from(v: Vec<u64>) -> Self {
        Self::UIntArray(v)
    }
}

impl From<Vec<f64>> for FieldValue {
    fn from(v: Vec<f64>) -> Self {
        Self::FloatArray(v)
    }
}

fn scalar_default(base: BaseType) -> FieldValue {
    match base {
        BaseType::Char => FieldValue::Char(0),
        base if base.is_float() => FieldValue::Float(0.0),
        base if base.is_signed() => FieldValue::Int(0),
        _ => FieldValue::UInt(0),
    }
}

/// Inclusive integer range of a base type.
fn int_range(base: BaseType) -> (i128, i128) {
    match base {
        BaseType::Int8 => (i8::MIN.into(), i8::MAX.into()),
        BaseType::Int16 => (i16::MIN.into(), i16::MAX.into()),
        BaseType::Int32 => (i32::MIN.into(), i32::MAX.into()),
        BaseType::Int64 => (i64::MIN.into(), i64::MAX.into()),
        BaseType::Uint8 | BaseType::Char => (0, u8::MAX.into()),
        BaseType::Uint16 => (0, u16::MAX.into()),
        BaseType::Uint32 => (0, u32::MAX.into()),
        BaseType::Uint64 => (0, u64::MAX.into()),
        BaseType::Float | BaseType::Double => (i128::MIN, i128::MAX),
    }
}

fn mismatch(field: &FieldDefinition, found: &'static str) -> CodecError {
    CodecError::TypeMismatch {
        field: field.name.clone(),
        expected: field.field_type.to_string(),
        found,
    }
}

fn out_of_range(field: &FieldDefinition, value: impl fmt::Display) -> CodecError {
    CodecError::ValueOutOfRange {
        field: field.name.clone(),
        value: value.to_string(),
        ty: field.field_type.to_string(),
    }
}

fn integer_of(field: &FieldDefinition, value: &FieldValue) -> Result<i128> {
    match *value {
        FieldValue::Int(v) => Ok(v.into()),
        FieldValue::UInt(v) => Ok(v.into()),
        FieldValue::Char(v) => Ok(v.into()),
        _ => Err(mismatch(field, value.kind())),
    }
}

fn checked_integer(field: &FieldDefinition, base: BaseType, v: i128) -> Result<FieldValue> {
    let (min, max) = int_range(base);
    if v < min || v > max {
        return Err(out_of_range(field, v));
    }
    Ok(match base {
        BaseType::Char => FieldValue::Char(v as u8),
        base if base.is_signed() => FieldValue::Int(v as i64),
        _ => FieldValue::UInt(v as u64),
    })
}

fn coerce_scalar(field: &FieldDefinition, base: BaseType, value: FieldValue) -> Result<FieldValue> {
    if base.is_float() {
        let v = value.as_f64().ok_or_else(|| mismatch(field, value.kind()))?;
        return stored_float(field, base, v).map(FieldValue::Float);
    }
    if base == BaseType::Char {
        if let FieldValue::Text(s) = &value {
            let mut chars = s.chars();
            return match (chars.next(), chars.next()) {
                (Some(c), None) => u8::try_from(c)
                    .map(FieldValue::Char)
                    .map_err(|_| out_of_range(field, c)),
                _ => Err(mismatch(field, "text longer than one char")),
            };
        }
    }
    let v = integer_of(field, &value)?;
    checked_integer(field, base, v)
}

/// Single-precision fields hold exactly what the wire can carry.
fn stored_float(field: &FieldDefinition, base: BaseType, v: f64) -> Result<f64> {
    if base != BaseType::Float {
        return Ok(v);
    }
    let narrowed = v as f32;
    if narrowed.is_infinite() && v.is_finite() {
        return Err(out_of_range(field, v));
    }
    Ok(f64::from(narrowed))
}

fn coerce_text(field: &FieldDefinition, value: FieldValue) -> Result<FieldValue> {
    match value {
        FieldValue::Text(s) => {
            if let Some(c) = s.chars().find(|&c| u32::from(c) > 0xFF) {
                return Err(out_of_range(field, c));
            }
            Ok(FieldValue::Text(s))
        }
        FieldValue::UIntArray(bytes) => bytes
            .into_iter()
            .map(|b| {
                u8::try_from(b)
                    .map(char::from)
                    .map_err(|_| out_of_range(field, b))
            })
            .collect::<Result<String>>()
            .map(FieldValue::Text),
        other => Err(mismatch(field, other.kind())),
    }
}

fn coerce_array(field: &FieldDefinition, base: BaseType, value: FieldValue) -> Result<FieldValue> {
    let items: Vec<FieldValue> = match value {
        FieldValue::IntArray(v) => v.into_iter().map(FieldValue::Int).collect(),
        FieldValue::UIntArray(v) => v.into_iter().map(FieldValue::UInt).collect(),
        FieldValue::FloatArray(v) => v.into_iter().map(FieldValue::Float).collect(),
        other => return Err(mismatch(field, other.kind())),
    };
    if base.is_float() {
        return items
            .iter()
            .map(|item| {
                let v = item.as_f64().ok_or_else(|| mismatch(field, item.kind()))?;
                stored_float(field, base, v)
            })
            .collect::<Result<Vec<_>>>()
            .map(FieldValue::FloatArray);
    }
    let ints = items
        .iter()
        .map(|item| {
            let v = integer_of(field, item)?;
            let (min, max) = int_range(base);
            if v < min || v > max {
                return Err(out_of_range(field, v));
            }
            Ok(v)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(if base.is_signed() {
        FieldValue::IntArray(ints.into_iter().map(|v| v as i64).collect())
    } else {
        FieldValue::UIntArray(ints.into_iter().map(|v| v as u64).collect())
    })
}

fn check_len(field: &FieldDefinition, len: usize) -> Result<()> {
    match field.field_type.array {
        ArrayKind::Fixed(n) if field.field_type.base == BaseType::Char && len > n => {
            Err(CodecError::ArrayTooLong {
                field: field.name.clone(),
                len,
                max: n,
            })
        }
        ArrayKind::Fixed(n) if field.field_type.base != BaseType::Char && len != n => {
            Err(CodecError::ArrayLengthMismatch {
                field: field.name.clone(),
                expected: n,
                actual: len,
            })
        }
        ArrayKind::Variable if len > MAX_VARIABLE_LEN => Err(CodecError::ArrayTooLong {
            field: field.name.clone(),
            len,
            max: MAX_VARIABLE_LEN,
        }),
        _ => Ok(()),
    }
}

fn json_number(n: &serde_json::Number) -> FieldValue {
    if let Some(v) = n.as_u64() {
        FieldValue::UInt(v)
    } else if let Some(v) = n.as_i64() {
        FieldValue::Int(v)
    } else {
        FieldValue::Float(n.as_f64().unwrap_or(f64::NAN))
    }
}

/// Collapse parsed numbers into the narrowest array kind that holds them all.
pub(crate) fn numbers_to_array(numbers: Vec<FieldValue>) -> FieldValue {
    if numbers.iter().any(|n| matches!(n, FieldValue::Float(_))) {
        FieldValue::FloatArray(numbers.iter().filter_map(FieldValue::as_f64).collect())
    } else if numbers.iter().any(|n| matches!(n, FieldValue::Int(_))) {
        FieldValue::IntArray(numbers.iter().filter_map(FieldValue::as_i64).collect())
    } else {
        FieldValue::UIntArray(numbers.iter().filter_map(FieldValue::as_u64).collect())
    }
}

fn write_float(out: &mut String, base: BaseType, v: f64) {
    if base == BaseType::Float {
        let _ = write!(out, "{:?}", v as f32);
    } else {
        let _ = write!(out, "{v:?}");
    }
}

fn write_joined<T>(out: &mut String, items: &[T], mut each: impl FnMut(&mut String, &T)) {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        each(out, item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, ty: &str) -> FieldDefinition {
        FieldDefinition::new(name, FieldType::parse(ty).unwrap())
    }

    #[test]
    fn defaults_follow_type() {
        assert_eq!(
            FieldValue::default_for(&FieldType::parse("int16").unwrap()),
            FieldValue::Int(0)
        );
        assert_eq!(
            FieldValue::default_for(&FieldType::parse("float[3]").unwrap()),
            FieldValue::FloatArray(vec![0.0; 3])
        );
        assert_eq!(
            FieldValue::default_for(&FieldType::parse("uint8[]").unwrap()),
            FieldValue::UIntArray(Vec::new())
        );
        assert_eq!(
            FieldValue::default_for(&FieldType::parse("string").unwrap()),
            FieldValue::Text(String::new())
        );
    }

    #[test]
    fn integers_are_range_checked() {
        let f = field("x", "int8");
        assert_eq!(FieldValue::UInt(127).coerce(&f).unwrap(), FieldValue::Int(127));
        assert!(matches!(
            FieldValue::Int(128).coerce(&f),
            Err(CodecError::ValueOutOfRange { .. })
        ));

        let f = field("y", "uint16");
        assert_eq!(FieldValue::Int(5).coerce(&f).unwrap(), FieldValue::UInt(5));
        assert!(FieldValue::Int(-1).coerce(&f).is_err());
        assert!(matches!(
            FieldValue::Float(1.5).coerce(&f),
            Err(CodecError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn floats_accept_integers() {
        let f = field("z", "double");
        assert_eq!(FieldValue::Int(-3).coerce(&f).unwrap(), FieldValue::Float(-3.0));
    }

    #[test]
    fn single_precision_fields_narrow_on_store() {
        let f = field("phi", "float");
        assert_eq!(
            FieldValue::Float(0.1).coerce(&f).unwrap(),
            FieldValue::Float(f64::from(0.1f32))
        );
        assert!(matches!(
            FieldValue::Float(1e40).coerce(&f),
            Err(CodecError::ValueOutOfRange { .. })
        ));
        assert_eq!(
            FieldValue::FloatArray(vec![0.1]).coerce(&field("xs", "float[]")).unwrap(),
            FieldValue::FloatArray(vec![f64::from(0.1f32)])
        );
        assert_eq!(
            FieldValue::Float(0.1).coerce(&field("z", "double")).unwrap(),
            FieldValue::Float(0.1)
        );
    }

    #[test]
    fn array_lengths_are_checked() {
        let f = field("v", "uint8[3]");
        assert_eq!(
            FieldValue::IntArray(vec![1, 2, 3]).coerce(&f).unwrap(),
            FieldValue::UIntArray(vec![1, 2, 3])
        );
        assert!(matches!(
            FieldValue::UIntArray(vec![1, 2]).coerce(&f),
            Err(CodecError::ArrayLengthMismatch { expected: 3, actual: 2, .. })
        ));

        let f = field("w", "int16[]");
        assert!(matches!(
            FieldValue::IntArray(vec![0; 256]).coerce(&f),
            Err(CodecError::ArrayTooLong { len: 256, max: 255, .. })
        ));
    }

    #[test]
    fn text_fields() {
        let f = field("name", "char[4]");
        assert!(FieldValue::from("abc").coerce(&f).is_ok());
        assert!(matches!(
            FieldValue::from("abcde").coerce(&f),
            Err(CodecError::ArrayTooLong { max: 4, .. })
        ));
        assert!(matches!(
            FieldValue::from("é€").coerce(&field("s", "string")),
            Err(CodecError::ValueOutOfRange { .. })
        ));

        let c = field("c", "char");
        assert_eq!(FieldValue::from("A").coerce(&c).unwrap(), FieldValue::Char(b'A'));
    }

    #[test]
    fn json_values() {
        let f = field("v", "int16[2]");
        let value = FieldValue::from_json(&f, &serde_json::json!([-1, 2])).unwrap();
        assert_eq!(value, FieldValue::IntArray(vec![-1, 2]));

        let f = field("phi", "float");
        let value = FieldValue::from_json(&f, &serde_json::json!(0.5)).unwrap();
        assert_eq!(value, FieldValue::Float(0.5));

        assert!(FieldValue::from_json(&f, &serde_json::json!({})).is_err());
    }

    #[test]
    fn text_form() {
        let mut out = String::new();
        FieldValue::FloatArray(vec![0.1, 2.0]).write_text(BaseType::Float, &mut out);
        assert_eq!(out, "0.1,2.0");

        assert_eq!(FieldValue::IntArray(vec![1, -2, 3]).to_string(), "1,-2,3");
        assert_eq!(FieldValue::UIntArray(Vec::new()).to_string(), "");
        assert_eq!(FieldValue::Char(b'x').to_string(), "x");
    }
}
