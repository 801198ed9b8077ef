//! Accessor expression backends.
//!
//! A backend only turns already computed positions into target syntax. It
//! never decides offsets.

use pprzlink_schema::{ArrayKind, BaseType, FieldDefinition};

use crate::descriptor::ByteOffset;

/// A byte position both as descriptor data and as a target expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub offset: ByteOffset,
    pub expr: String,
}

/// Everything a backend sees about one field.
#[derive(Debug, Clone, Copy)]
pub struct Site<'a> {
    pub field: &'a FieldDefinition,
    /// First element.
    pub at: &'a Position,
    /// Count byte, Variable arrays only.
    pub count: Option<&'a Position>,
}

impl Site<'_> {
    fn width(&self) -> usize {
        self.field.field_type.base.width()
    }
}

pub trait Backend {
    fn name(&self) -> &'static str;

    /// Whether every offset must be known statically, which forbids fields
    /// after a Variable array.
    fn requires_variable_last(&self) -> bool {
        false
    }

    fn getter(&self, site: &Site<'_>) -> String;

    fn setter(&self, site: &Site<'_>) -> String;

    /// Element count of a Variable array.
    fn length_getter(&self, site: &Site<'_>) -> String;

    /// Expression for the byte just past a Variable array.
    fn variable_end(&self, site: &Site<'_>) -> String;
}

/// Backend names accepted by [`backend_by_name`].
pub const BACKENDS: &[&str] = &["c", "rust"];

pub fn backend_by_name(name: &str) -> Option<Box<dyn Backend>> {
    match name {
        "c" => Some(Box::new(CBackend)),
        "rust" => Some(Box::new(RustBackend)),
        _ => None,
    }
}

/// Payload macros of the C runtime headers (`_PPRZ_VAL_<type>(_payload, offset)`)
/// and transport `put_bytes` calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct CBackend;

impl CBackend {
    fn dl_type(base: BaseType) -> String {
        format!("DL_TYPE_{}", base.name().to_ascii_uppercase())
    }

    fn put(base: BaseType, format: &str, value: &str, len: &str) -> String {
        format!(
            "msg->trans->put_bytes(msg, _FD, {}, {format}, (void *) {value}, {len})",
            Self::dl_type(base)
        )
    }
}

impl Backend for CBackend {
    fn name(&self) -> &'static str {
        "c"
    }

    fn requires_variable_last(&self) -> bool {
        true
    }

    fn getter(&self, site: &Site<'_>) -> String {
        let ty = site.field.field_type.base.c_name();
        if site.field.field_type.is_array() {
            format!("_PPRZ_VAL_{ty}_array(_payload, {})", site.at.expr)
        } else {
            format!("_PPRZ_VAL_{ty}(_payload, {})", site.at.expr)
        }
    }

    fn setter(&self, site: &Site<'_>) -> String {
        let base = site.field.field_type.base;
        let name = &site.field.name;
        let width = site.width();
        match site.field.field_type.array {
            ArrayKind::None => Self::put(
                base,
                "DL_FORMAT_SCALAR",
                &format!("_{name}"),
                &width.to_string(),
            ),
            ArrayKind::Fixed(n) => Self::put(
                base,
                "DL_FORMAT_ARRAY",
                &format!("_{name}"),
                &(n * width).to_string(),
            ),
            ArrayKind::Variable => format!(
                "msg->trans->put_bytes(msg, _FD, DL_TYPE_ARRAY_LENGTH, DL_FORMAT_SCALAR, (void *) &nb_{name}, 1); {}",
                Self::put(
                    base,
                    "DL_FORMAT_ARRAY",
                    &format!("_{name}"),
                    &format!("nb_{name}*{width}"),
                )
            ),
        }
    }

    fn length_getter(&self, site: &Site<'_>) -> String {
        let Some(count) = site.count else {
            return match site.field.field_type.array {
                ArrayKind::Fixed(n) => n.to_string(),
                _ => "1".to_string(),
            };
        };
        // Targets without unaligned reads go through the aligned helper when
        // the elements do not start on their natural boundary.
        let aligned = count
            .offset
            .as_static()
            .is_some_and(|at| (at + 1) % site.width().min(4) == 0);
        if aligned {
            format!("_PPRZ_VAL_uint8_t(_payload, {})", count.expr)
        } else {
            format!("_PPRZ_VAL_len_aligned(_payload, {})", count.expr)
        }
    }

    fn variable_end(&self, site: &Site<'_>) -> String {
        let count = site.count.map_or("0", |c| c.expr.as_str());
        format!(
            "{} + _PPRZ_VAL_uint8_t(_payload, {count})*{}",
            site.at.expr,
            site.width()
        )
    }
}

/// Slice expressions over a `payload: &[u8]` (setters: `&mut [u8]`) frame
/// body, reading multi-byte values with `bytes::Buf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustBackend;

impl RustBackend {
    fn ty(base: BaseType) -> &'static str {
        match base {
            BaseType::Int8 => "i8",
            BaseType::Uint8 | BaseType::Char => "u8",
            BaseType::Int16 => "i16",
            BaseType::Uint16 => "u16",
            BaseType::Int32 => "i32",
            BaseType::Uint32 => "u32",
            BaseType::Int64 => "i64",
            BaseType::Uint64 => "u64",
            BaseType::Float => "f32",
            BaseType::Double => "f64",
        }
    }

    fn count(site: &Site<'_>) -> String {
        match (site.field.field_type.array, site.count) {
            (ArrayKind::Fixed(n), _) => n.to_string(),
            (_, Some(count)) => format!("payload[{}] as usize", count.expr),
            _ => "1".to_string(),
        }
    }

    fn byte_len(site: &Site<'_>) -> String {
        let count = Self::count(site);
        match site.width() {
            1 => count,
            w => format!("{count} * {w}"),
        }
    }
}

impl Backend for RustBackend {
    fn name(&self) -> &'static str {
        "rust"
    }

    fn getter(&self, site: &Site<'_>) -> String {
        let base = site.field.field_type.base;
        let ty = Self::ty(base);
        let at = &site.at.expr;
        if !site.field.field_type.is_array() {
            return match ty {
                "u8" => format!("payload[{at}]"),
                "i8" => format!("payload[{at}] as i8"),
                _ => format!("(&payload[{at}..]).get_{ty}_le()"),
            };
        }

        let range = format!("payload[{at}..{at} + {}]", Self::byte_len(site));
        match ty {
            "u8" => format!("&{range}"),
            "i8" => format!("{range}.iter().map(|&b| b as i8).collect::<Vec<_>>()"),
            _ => format!(
                "{range}.chunks_exact({}).map(|mut b| b.get_{ty}_le()).collect::<Vec<_>>()",
                site.width()
            ),
        }
    }

    fn setter(&self, site: &Site<'_>) -> String {
        let base = site.field.field_type.base;
        let ty = Self::ty(base);
        let at = &site.at.expr;
        let w = site.width();

        if !site.field.field_type.is_array() {
            return match ty {
                "u8" => format!("payload[{at}] = value"),
                "i8" => format!("payload[{at}] = value as u8"),
                _ => format!("payload[{at}..{at} + {w}].copy_from_slice(&value.to_le_bytes())"),
            };
        }

        let prefix = match site.count {
            Some(count) => format!("payload[{}] = value.len() as u8; ", count.expr),
            None => String::new(),
        };
        let body = if w == 1 {
            format!("payload[{at}..{at} + value.len()].copy_from_slice(&value.iter().map(|&v| v as u8).collect::<Vec<_>>())")
        } else {
            format!(
                "for (i, v) in value.iter().enumerate() {{ payload[{at} + i * {w}..{at} + (i + 1) * {w}].copy_from_slice(&v.to_le_bytes()) }}"
            )
        };
        format!("{prefix}{body}")
    }

    fn length_getter(&self, site: &Site<'_>) -> String {
        Self::count(site)
    }

    fn variable_end(&self, site: &Site<'_>) -> String {
        format!("{} + {}", site.at.expr, Self::byte_len(site))
    }
}

#[cfg(test)]
mod tests {
    use pprzlink_schema::FieldType;

    use super::*;

    fn position(offset: usize) -> Position {
        Position {
            offset: ByteOffset::Static { offset },
            expr: offset.to_string(),
        }
    }

    #[test]
    fn lookup_by_name() {
        for name in BACKENDS {
            assert_eq!(backend_by_name(name).unwrap().name(), *name);
        }
        assert!(backend_by_name("python").is_none());
    }

    #[test]
    fn c_scalar_and_array_getters() {
        let phi = FieldDefinition::new("phi", FieldType::parse("float").unwrap());
        let at = position(4);
        let site = Site {
            field: &phi,
            at: &at,
            count: None,
        };
        assert_eq!(CBackend.getter(&site), "_PPRZ_VAL_float(_payload, 4)");
        assert_eq!(
            CBackend.setter(&site),
            "msg->trans->put_bytes(msg, _FD, DL_TYPE_FLOAT, DL_FORMAT_SCALAR, (void *) _phi, 4)"
        );

        let pos = FieldDefinition::new("pos", FieldType::parse("int16[3]").unwrap());
        let site = Site {
            field: &pos,
            at: &at,
            count: None,
        };
        assert_eq!(CBackend.getter(&site), "_PPRZ_VAL_int16_t_array(_payload, 4)");
        assert!(CBackend.setter(&site).ends_with("(void *) _pos, 6)"));
    }

    #[test]
    fn c_length_getter_follows_alignment() {
        let bytes = FieldDefinition::new("md5sum", FieldType::parse("uint8[]").unwrap());
        let count = position(4);
        let at = position(5);
        let site = Site {
            field: &bytes,
            at: &at,
            count: Some(&count),
        };
        assert_eq!(CBackend.length_getter(&site), "_PPRZ_VAL_uint8_t(_payload, 4)");

        let floats = FieldDefinition::new("xs", FieldType::parse("float[]").unwrap());
        let site = Site {
            field: &floats,
            at: &at,
            count: Some(&count),
        };
        assert_eq!(
            CBackend.length_getter(&site),
            "_PPRZ_VAL_len_aligned(_payload, 4)"
        );

        let count = position(3);
        let at = position(4);
        let site = Site {
            field: &floats,
            at: &at,
            count: Some(&count),
        };
        assert_eq!(CBackend.length_getter(&site), "_PPRZ_VAL_uint8_t(_payload, 3)");
    }

    #[test]
    fn rust_expressions() {
        let tow = FieldDefinition::new("tow", FieldType::parse("uint32").unwrap());
        let at = position(7);
        let site = Site {
            field: &tow,
            at: &at,
            count: None,
        };
        assert_eq!(RustBackend.getter(&site), "(&payload[7..]).get_u32_le()");
        assert_eq!(
            RustBackend.setter(&site),
            "payload[7..7 + 4].copy_from_slice(&value.to_le_bytes())"
        );

        let xs = FieldDefinition::new("xs", FieldType::parse("float[]").unwrap());
        let count = position(4);
        let at = position(5);
        let site = Site {
            field: &xs,
            at: &at,
            count: Some(&count),
        };
        assert_eq!(RustBackend.length_getter(&site), "payload[4] as usize");
        assert_eq!(RustBackend.variable_end(&site), "5 + payload[4] as usize * 4");
        assert_eq!(
            RustBackend.getter(&site),
            "payload[5..5 + payload[4] as usize * 4].chunks_exact(4).map(|mut b| b.get_f32_le()).collect::<Vec<_>>()"
        );
        assert!(RustBackend
            .setter(&site)
            .starts_with("payload[4] = value.len() as u8; for (i, v)"));
    }
}
