//! Accessor descriptors for pprzlink message payloads.
//!
//! Generation runs in two stages. [`generate`] replays the payload encoding
//! order of every message and produces a [`Bindings`] value holding, per
//! field, its byte offset, widths and backend-specific getter/setter
//! expressions. An [`Emitter`] then only formats that value.
//!
//! Offsets count the header id bytes (2 for protocol 1.0, 4 for 2.0) so
//! they index the frame body handed out by the parser directly.
//!
//! A Variable array makes every later offset depend on a count byte read
//! at runtime. [`CBackend`] refuses such messages; [`RustBackend`] expresses
//! those offsets relative to the end of the array.

pub mod backend;
pub mod descriptor;
pub mod emit;
pub mod error;
pub mod generator;

pub use backend::{backend_by_name, Backend, CBackend, Position, RustBackend, Site, BACKENDS};
pub use descriptor::{Bindings, ByteOffset, FieldAccessor, LengthAccessor, MessageBinding};
pub use emit::{emitter_by_name, Emitter, JsonEmitter, ListingEmitter, EMITTERS};
pub use error::{BindgenError, Result};
pub use generator::{generate, generate_class, message_binding};
