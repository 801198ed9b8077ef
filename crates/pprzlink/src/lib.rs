//! Paparazzi message link.
//!
//! Messages are declared in a schema of classes, messages and typed fields,
//! exchanged as checksummed binary frames over serial/radio links or as text
//! lines on a software bus, and read on embedded targets through generated
//! accessors.
//!
//! # Crate Structure
//!
//! - [`schema`]: schema model, compiler and JSON document loader
//! - [`frame`]: protocol headers, checksum, frame encoder and byte-at-a-time parser
//! - [`message`]: typed message values, binary payload codec, text bus codec
//! - [`bindgen`]: per-field accessor descriptors for C and Rust targets

/// Re-export schema types.
pub mod schema {
    pub use pprzlink_schema::*;
}

/// Re-export frame types.
pub mod frame {
    pub use pprzlink_frame::*;
}

/// Re-export message types.
pub mod message {
    pub use pprzlink_message::*;
}

/// Re-export binding generator types.
pub mod bindgen {
    pub use pprzlink_bindgen::*;
}
