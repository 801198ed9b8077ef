use std::fmt;

use serde::{Deserialize, Serialize};

/// Scalar element type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseType {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float,
    Double,
    Char,
}

impl BaseType {
    /// Parse a base type name. Both `uint8` and `uint8_t` spellings are accepted.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.strip_suffix("_t").unwrap_or(name);
        let ty = match name {
            "int8" => Self::Int8,
            "uint8" => Self::Uint8,
            "int16" => Self::Int16,
            "uint16" => Self::Uint16,
            "int32" => Self::Int32,
            "uint32" => Self::Uint32,
            "int64" => Self::Int64,
            "uint64" => Self::Uint64,
            "float" => Self::Float,
            "double" => Self::Double,
            "char" => Self::Char,
            _ => return None,
        };
        Some(ty)
    }

    /// Encoded width of one element in bytes.
    pub fn width(self) -> usize {
        match self {
            Self::Int8 | Self::Uint8 | Self::Char => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Int32 | Self::Uint32 | Self::Float => 4,
            Self::Int64 | Self::Uint64 | Self::Double => 8,
        }
    }

    /// Canonical schema spelling (`uint8`, `float`, ...).
    pub fn name(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Uint8 => "uint8",
            Self::Int16 => "int16",
            Self::Uint16 => "uint16",
            Self::Int32 => "int32",
            Self::Uint32 => "uint32",
            Self::Int64 => "int64",
            Self::Uint64 => "uint64",
            Self::Float => "float",
            Self::Double => "double",
            Self::Char => "char",
        }
    }

    /// C spelling (`uint8_t`, `float`, ...).
    pub fn c_name(self) -> &'static str {
        match self {
            Self::Int8 => "int8_t",
            Self::Uint8 => "uint8_t",
            Self::Int16 => "int16_t",
            Self::Uint16 => "uint16_t",
            Self::Int32 => "int32_t",
            Self::Uint32 => "uint32_t",
            Self::Int64 => "int64_t",
            Self::Uint64 => "uint64_t",
            Self::Float => "float",
            Self::Double => "double",
            Self::Char => "char",
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }

    pub fn is_signed(self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    pub fn is_unsigned(self) -> bool {
        matches!(self, Self::Uint8 | Self::Uint16 | Self::Uint32 | Self::Uint64)
    }

    pub fn is_integer(self) -> bool {
        self.is_signed() || self.is_unsigned()
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Largest payload any frame carries, hence the widest field a message can
/// have.
pub const MAX_FIELD_WIDTH: usize = u8::MAX as usize - 6;

/// Array shape of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "len", rename_all = "lowercase")]
pub enum ArrayKind {
    None,
    Fixed(usize),
    Variable,
}

/// Fully resolved field type: scalar kind × array kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldType {
    pub base: BaseType,
    pub array: ArrayKind,
}

impl FieldType {
    pub const fn scalar(base: BaseType) -> Self {
        Self {
            base,
            array: ArrayKind::None,
        }
    }

    pub const fn fixed(base: BaseType, len: usize) -> Self {
        Self {
            base,
            array: ArrayKind::Fixed(len),
        }
    }

    pub const fn variable(base: BaseType) -> Self {
        Self {
            base,
            array: ArrayKind::Variable,
        }
    }

    /// Parse a schema type string: `uint8`, `float[3]`, `int16[]`, `string`.
    ///
    /// `string` is sugar for `char[]`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text == "string" {
            return Some(Self::variable(BaseType::Char));
        }

        let Some(open) = text.find('[') else {
            return BaseType::parse(text).map(Self::scalar);
        };

        let inner = text[open + 1..].strip_suffix(']')?;
        let base = BaseType::parse(&text[..open])?;
        if inner.is_empty() {
            return Some(Self::variable(base));
        }
        let len: usize = inner.trim().parse().ok()?;
        len.checked_mul(base.width())?;
        Some(Self::fixed(base, len))
    }

    pub fn is_array(&self) -> bool {
        !matches!(self.array, ArrayKind::None)
    }

    pub fn is_variable(&self) -> bool {
        matches!(self.array, ArrayKind::Variable)
    }

    /// Char arrays carry text.
    pub fn is_text(&self) -> bool {
        self.base == BaseType::Char && self.is_array()
    }

    /// Encoded width when it does not depend on the value, i.e. for everything
    /// except Variable arrays.
    pub fn static_width(&self) -> Option<usize> {
        match self.array {
            ArrayKind::None => Some(self.base.width()),
            ArrayKind::Fixed(n) => Some(n.saturating_mul(self.base.width())),
            ArrayKind::Variable => None,
        }
    }

    /// Smallest encoded width: a Variable array costs at least its count byte.
    pub fn min_width(&self) -> usize {
        self.static_width().unwrap_or(1)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.array {
            ArrayKind::None => write!(f, "{}", self.base),
            ArrayKind::Fixed(n) => write!(f, "{}[{n}]", self.base),
            ArrayKind::Variable => write!(f, "{}[]", self.base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scalars_with_and_without_suffix() {
        assert_eq!(
            FieldType::parse("uint16"),
            Some(FieldType::scalar(BaseType::Uint16))
        );
        assert_eq!(
            FieldType::parse("int32_t"),
            Some(FieldType::scalar(BaseType::Int32))
        );
        assert_eq!(
            FieldType::parse("double"),
            Some(FieldType::scalar(BaseType::Double))
        );
    }

    #[test]
    fn parses_array_syntax() {
        assert_eq!(
            FieldType::parse("float[3]"),
            Some(FieldType::fixed(BaseType::Float, 3))
        );
        assert_eq!(
            FieldType::parse("uint8[]"),
            Some(FieldType::variable(BaseType::Uint8))
        );
        assert_eq!(
            FieldType::parse("string"),
            Some(FieldType::variable(BaseType::Char))
        );
    }

    #[test]
    fn rejects_unknown_and_malformed_types() {
        assert_eq!(FieldType::parse("bool"), None);
        assert_eq!(FieldType::parse("uint8[x]"), None);
        assert_eq!(FieldType::parse("uint8[3"), None);
        assert_eq!(FieldType::parse("[]"), None);
        assert_eq!(FieldType::parse("uint64[3000000000000000000]"), None);
    }

    #[test]
    fn widths() {
        assert_eq!(FieldType::parse("int16[4]").unwrap().static_width(), Some(8));
        assert_eq!(FieldType::parse("uint64").unwrap().static_width(), Some(8));
        assert_eq!(FieldType::parse("char[]").unwrap().static_width(), None);
        assert_eq!(FieldType::parse("char[]").unwrap().min_width(), 1);
        assert_eq!(
            FieldType::fixed(BaseType::Uint64, usize::MAX).static_width(),
            Some(usize::MAX)
        );
    }

    #[test]
    fn display_is_canonical() {
        assert_eq!(FieldType::parse("uint8_t[2]").unwrap().to_string(), "uint8[2]");
        assert_eq!(FieldType::parse("string").unwrap().to_string(), "char[]");
    }
}
