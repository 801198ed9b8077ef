//! Textual emission of already computed descriptors.

use std::fmt::Write as _;

use crate::descriptor::Bindings;
use crate::error::Result;

pub trait Emitter {
    fn emit(&self, bindings: &Bindings) -> Result<String>;
}

/// Emitter names accepted by [`emitter_by_name`].
pub const EMITTERS: &[&str] = &["json", "listing"];

pub fn emitter_by_name(name: &str) -> Option<Box<dyn Emitter>> {
    match name {
        "json" => Some(Box::new(JsonEmitter)),
        "listing" => Some(Box::new(ListingEmitter)),
        _ => None,
    }
}

/// Pretty JSON with a trailing newline, stable enough to diff against a
/// golden file.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEmitter;

impl Emitter for JsonEmitter {
    fn emit(&self, bindings: &Bindings) -> Result<String> {
        let mut out = serde_json::to_string_pretty(bindings)?;
        out.push('\n');
        Ok(out)
    }
}

/// One line per field:
/// `class.MESSAGE.field type @offset [len=...] get=... set=...`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListingEmitter;

impl Emitter for ListingEmitter {
    fn emit(&self, bindings: &Bindings) -> Result<String> {
        let mut out = String::new();
        let _ = writeln!(out, "# protocol {} backend {}", bindings.protocol, bindings.backend);
        for message in &bindings.messages {
            let _ = writeln!(
                out,
                "{}.{} class={} id={}",
                message.class, message.name, message.class_id, message.id
            );
            for field in &message.fields {
                let _ = write!(
                    out,
                    "  {}.{}.{} {} @{}",
                    message.class, message.name, field.name, field.field_type, field.offset
                );
                if let Some(length) = &field.length {
                    let _ = write!(out, " len@{}={}", length.offset, length.getter);
                }
                let _ = writeln!(out, " get={} set={}", field.getter, field.setter);
            }
        }
        Ok(out)
    }
}
