//! Binary payload codec and frame-level message encoding.

use std::sync::Arc;

use bytes::{Buf, BufMut, BytesMut};
use pprzlink_frame::{encode_frame, Frame, FrameConfig, FrameHeader, ProtocolVersion};
use pprzlink_schema::{ArrayKind, BaseType, FieldDefinition, MessageDefinition, SchemaModel};
use tracing::trace;

use crate::error::{CodecError, Result};
use crate::message::Message;
use crate::value::FieldValue;

/// Link addressing of one frame. The class id comes from the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Address {
    pub sender_id: u8,
    pub receiver_id: u8,
    pub component_id: u8,
}

impl Address {
    pub fn from_sender(sender_id: u8) -> Self {
        Self {
            sender_id,
            ..Self::default()
        }
    }
}

/// A message received over a binary link.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub address: Address,
    pub message: Message,
}

/// Append the payload bytes of `message`: fields in declaration order,
/// little-endian scalars, one count byte before each Variable array.
pub fn encode_payload<B: BufMut>(message: &Message, dst: &mut B) -> Result<()> {
    for (field, value) in message.fields() {
        encode_field(field, value, dst)?;
    }
    Ok(())
}

/// Consume one payload from `src`. Bytes after the last field are left in
/// `src` for the caller.
pub fn decode_payload<B: Buf>(definition: &Arc<MessageDefinition>, src: &mut B) -> Result<Message> {
    let values = definition
        .fields
        .iter()
        .map(|field| decode_field(definition, field, src))
        .collect::<Result<Vec<_>>>()?;
    Message::with_values(Arc::clone(definition), values)
}

fn type_error(field: &FieldDefinition, value: &FieldValue) -> CodecError {
    CodecError::TypeMismatch {
        field: field.name.clone(),
        expected: field.field_type.to_string(),
        found: value.kind(),
    }
}

fn put_integer<B: BufMut>(dst: &mut B, base: BaseType, v: i128) {
    match base {
        BaseType::Int8 => dst.put_i8(v as i8),
        BaseType::Uint8 | BaseType::Char => dst.put_u8(v as u8),
        BaseType::Int16 => dst.put_i16_le(v as i16),
        BaseType::Uint16 => dst.put_u16_le(v as u16),
        BaseType::Int32 => dst.put_i32_le(v as i32),
        BaseType::Uint32 => dst.put_u32_le(v as u32),
        BaseType::Int64 => dst.put_i64_le(v as i64),
        BaseType::Uint64 => dst.put_u64_le(v as u64),
        BaseType::Float => dst.put_f32_le(v as f32),
        BaseType::Double => dst.put_f64_le(v as f64),
    }
}

fn put_float<B: BufMut>(dst: &mut B, base: BaseType, v: f64) {
    match base {
        BaseType::Float => dst.put_f32_le(v as f32),
        BaseType::Double => dst.put_f64_le(v),
        _ => put_integer(dst, base, v as i128),
    }
}

fn put_scalar<B: BufMut>(dst: &mut B, field: &FieldDefinition, value: &FieldValue) -> Result<()> {
    let base = field.field_type.base;
    match *value {
        FieldValue::Int(v) => put_integer(dst, base, v.into()),
        FieldValue::UInt(v) => put_integer(dst, base, v.into()),
        FieldValue::Char(v) => put_integer(dst, base, v.into()),
        FieldValue::Float(v) => put_float(dst, base, v),
        _ => return Err(type_error(field, value)),
    }
    Ok(())
}

fn encode_field<B: BufMut>(field: &FieldDefinition, value: &FieldValue, dst: &mut B) -> Result<()> {
    let ty = &field.field_type;
    if ty.array == ArrayKind::None {
        return put_scalar(dst, field, value);
    }

    let len = value.len().ok_or_else(|| type_error(field, value))?;
    if ty.array == ArrayKind::Variable {
        // coercion keeps Variable arrays within one count byte
        dst.put_u8(len as u8);
    }

    let base = ty.base;
    match value {
        FieldValue::Text(text) => {
            for c in text.chars() {
                dst.put_u8(u32::from(c) as u8);
            }
            if let ArrayKind::Fixed(n) = ty.array {
                dst.put_bytes(0, n.saturating_sub(len));
            }
        }
        FieldValue::IntArray(items) => items.iter().for_each(|&v| put_integer(dst, base, v.into())),
        FieldValue::UIntArray(items) => items.iter().for_each(|&v| put_integer(dst, base, v.into())),
        FieldValue::FloatArray(items) => items.iter().for_each(|&v| put_float(dst, base, v)),
        _ => return Err(type_error(field, value)),
    }
    Ok(())
}

fn ensure<B: Buf>(
    definition: &MessageDefinition,
    field: &FieldDefinition,
    src: &B,
    needed: usize,
) -> Result<()> {
    if src.remaining() < needed {
        return Err(CodecError::TruncatedPayload {
            message: definition.name.clone(),
            field: field.name.clone(),
            needed,
            available: src.remaining(),
        });
    }
    Ok(())
}

fn get_scalar<B: Buf>(src: &mut B, base: BaseType) -> FieldValue {
    match base {
        BaseType::Int8 => FieldValue::Int(src.get_i8().into()),
        BaseType::Uint8 => FieldValue::UInt(src.get_u8().into()),
        BaseType::Char => FieldValue::Char(src.get_u8()),
        BaseType::Int16 => FieldValue::Int(src.get_i16_le().into()),
        BaseType::Uint16 => FieldValue::UInt(src.get_u16_le().into()),
        BaseType::Int32 => FieldValue::Int(src.get_i32_le().into()),
        BaseType::Uint32 => FieldValue::UInt(src.get_u32_le().into()),
        BaseType::Int64 => FieldValue::Int(src.get_i64_le()),
        BaseType::Uint64 => FieldValue::UInt(src.get_u64_le()),
        BaseType::Float => FieldValue::Float(src.get_f32_le().into()),
        BaseType::Double => FieldValue::Float(src.get_f64_le()),
    }
}

fn decode_field<B: Buf>(
    definition: &MessageDefinition,
    field: &FieldDefinition,
    src: &mut B,
) -> Result<FieldValue> {
    let ty = &field.field_type;
    let width = ty.base.width();
    let count = match ty.array {
        ArrayKind::None => {
            ensure(definition, field, src, width)?;
            return Ok(get_scalar(src, ty.base));
        }
        ArrayKind::Fixed(n) => n,
        ArrayKind::Variable => {
            ensure(definition, field, src, 1)?;
            usize::from(src.get_u8())
        }
    };
    ensure(definition, field, src, count * width)?;

    let items: Vec<FieldValue> = (0..count).map(|_| get_scalar(src, ty.base)).collect();
    let value = match ty.base {
        BaseType::Char => {
            let mut text: String = items
                .iter()
                .filter_map(|item| match item {
                    FieldValue::Char(c) => Some(char::from(*c)),
                    _ => None,
                })
                .collect();
            if matches!(ty.array, ArrayKind::Fixed(_)) {
                text.truncate(text.trim_end_matches('\0').len());
            }
            FieldValue::Text(text)
        }
        base if base.is_float() => {
            FieldValue::FloatArray(items.iter().filter_map(FieldValue::as_f64).collect())
        }
        base if base.is_signed() => {
            FieldValue::IntArray(items.iter().filter_map(FieldValue::as_i64).collect())
        }
        _ => FieldValue::UIntArray(items.iter().filter_map(FieldValue::as_u64).collect()),
    };
    Ok(value)
}

/// Binary message codec for one link: schema lookups plus framing.
#[derive(Debug, Clone)]
pub struct WireCodec {
    schema: Arc<SchemaModel>,
    config: FrameConfig,
}

impl WireCodec {
    pub fn new(schema: Arc<SchemaModel>, version: ProtocolVersion) -> Self {
        Self::with_config(
            schema,
            FrameConfig {
                version,
                ..FrameConfig::default()
            },
        )
    }

    pub fn with_config(schema: Arc<SchemaModel>, config: FrameConfig) -> Self {
        Self { schema, config }
    }

    pub fn schema(&self) -> &Arc<SchemaModel> {
        &self.schema
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Encode `message` as a complete frame.
    pub fn encode(&self, message: &Message, address: Address, dst: &mut BytesMut) -> Result<()> {
        let mut payload = BytesMut::new();
        encode_payload(message, &mut payload)?;

        let header = FrameHeader {
            sender_id: address.sender_id,
            receiver_id: address.receiver_id,
            component_id: address.component_id,
            class_id: message.class_id(),
            msg_id: message.id(),
        };
        encode_frame(self.config.version, &header, &payload, dst)?;
        Ok(())
    }

    /// Decode a payload for `(class_id, msg_id)`.
    pub fn decode(&self, class_id: u8, msg_id: u8, payload: &[u8]) -> Result<Message> {
        let definition = self
            .schema
            .message_by_id(class_id, msg_id)
            .ok_or(CodecError::UnknownMessageId { class_id, msg_id })?;

        let mut src = payload;
        let message = decode_payload(definition, &mut src)?;
        if src.has_remaining() {
            trace!(
                message = %definition.name,
                trailing = src.remaining(),
                "ignoring trailing payload bytes"
            );
        }
        Ok(message)
    }

    /// Decode a frame produced by a [`FrameParser`](pprzlink_frame::FrameParser).
    pub fn decode_frame(&self, frame: &Frame) -> Result<Envelope> {
        let message = self.decode(frame.header.class_id, frame.header.msg_id, &frame.payload)?;
        Ok(Envelope {
            address: Address {
                sender_id: frame.header.sender_id,
                receiver_id: frame.header.receiver_id,
                component_id: frame.header.component_id,
            },
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use pprzlink_frame::FrameParser;

    use super::*;
    use crate::message::tests::schema;

    fn codec(version: ProtocolVersion) -> WireCodec {
        WireCodec::new(Arc::new(schema()), version)
    }

    #[test]
    fn v1_ping_scenario() {
        let codec = codec(ProtocolVersion::V1);
        let ping = Message::from_schema(codec.schema(), "datalink", "PING").unwrap();
        let mut wire = BytesMut::new();
        codec.encode(&ping, Address::from_sender(5), &mut wire).unwrap();
        assert_eq!(wire.as_ref(), &[0x99, 0x06, 0x05, 0x08, 0x13, 0x24]);
    }

    #[test]
    fn fixed_array_consumes_exactly_its_bytes() {
        let codec = codec(ProtocolVersion::V2);
        let payload = [1, 2, 3, 0x10, 0x27, 0, 0, 0xEE];
        let definition = codec.schema().message("telemetry", "GPS_POS").unwrap();

        let mut src = &payload[..];
        let msg = decode_payload(definition, &mut src).unwrap();
        assert_eq!(msg.get("pos").unwrap(), &FieldValue::UIntArray(vec![1, 2, 3]));
        assert_eq!(msg.get("tow").unwrap(), &FieldValue::UInt(10_000));
        assert_eq!(src, &[0xEE]);
    }

    #[test]
    fn v2_frame_round_trip() {
        let codec = codec(ProtocolVersion::V2);
        let mut msg = Message::from_schema(codec.schema(), "datalink", "SETTING").unwrap();
        msg.set("index", 4u8).unwrap();
        msg.set("ac_id", 12u8).unwrap();
        msg.set("value", 1.5f64).unwrap();
        msg.set_enum("mode", "AUTO1").unwrap();
        msg.set("course", -900i64).unwrap();
        msg.set("name", "roll gain").unwrap();

        let address = Address {
            sender_id: 0,
            receiver_id: 12,
            component_id: 1,
        };
        let mut wire = BytesMut::new();
        codec.encode(&msg, address, &mut wire).unwrap();
        assert_eq!(wire[4], 0x12);

        let mut parser = FrameParser::new(FrameConfig::v2());
        let frames = parser.push(&wire);
        assert_eq!(frames.len(), 1);

        let envelope = codec.decode_frame(&frames[0]).unwrap();
        assert_eq!(envelope.address, address);
        assert_eq!(envelope.message, msg);
    }

    #[test]
    fn variable_arrays_carry_count_byte() {
        let codec = codec(ProtocolVersion::V2);
        let mut traj = Message::from_schema(codec.schema(), "telemetry", "TRAJ").unwrap();
        traj.set("xs", vec![1.0f64, 2.5]).unwrap();
        traj.set("ys", Vec::<f64>::new()).unwrap();

        let mut payload = BytesMut::new();
        encode_payload(&traj, &mut payload).unwrap();
        assert_eq!(payload.len(), 1 + 8 + 1);
        assert_eq!(payload[0], 2);
        assert_eq!(payload[9], 0);

        let back = codec.decode(1, 9, &payload).unwrap();
        assert_eq!(back, traj);
    }

    #[test]
    fn fixed_char_array_pads_and_trims() {
        let codec = codec(ProtocolVersion::V2);
        let mut wp = Message::from_schema(codec.schema(), "datalink", "WP_MOVED").unwrap();
        wp.set("east", -2i64).unwrap();
        wp.set("label", "AB").unwrap();

        let mut payload = BytesMut::new();
        encode_payload(&wp, &mut payload).unwrap();
        assert_eq!(&payload[6..], b"AB\0\0");

        assert_eq!(codec.decode(2, 5, &payload).unwrap(), wp);
    }

    #[test]
    fn truncated_payload() {
        let codec = codec(ProtocolVersion::V2);
        let err = codec.decode(1, 6, &[0; 10]).unwrap_err();
        assert!(matches!(
            err,
            CodecError::TruncatedPayload { ref field, needed: 4, available: 2, .. } if field == "theta"
        ));

        let err = codec.decode(1, 2, &[5, 1, 2]).unwrap_err();
        assert!(matches!(err, CodecError::TruncatedPayload { needed: 5, .. }));
    }

    #[test]
    fn unknown_message_id() {
        let codec = codec(ProtocolVersion::V2);
        assert!(matches!(
            codec.decode(1, 200, &[]),
            Err(CodecError::UnknownMessageId { class_id: 1, msg_id: 200 })
        ));
        assert!(matches!(
            codec.decode(9, 2, &[]),
            Err(CodecError::UnknownMessageId { .. })
        ));
    }

    #[test]
    fn v1_link_class_comes_from_config() {
        let codec = WireCodec::with_config(Arc::new(schema()), FrameConfig::v1(1));
        let mut alive = Message::from_schema(codec.schema(), "telemetry", "ALIVE").unwrap();
        alive.set("md5sum", vec![0xAAu64, 0xBB]).unwrap();

        let mut wire = BytesMut::new();
        codec.encode(&alive, Address::from_sender(3), &mut wire).unwrap();

        let mut parser = FrameParser::new(*codec.config());
        let frame = parser.push(&wire).remove(0);
        let envelope = codec.decode_frame(&frame).unwrap();
        assert_eq!(envelope.address.sender_id, 3);
        assert_eq!(envelope.message, alive);
    }

    #[test]
    fn float_fields_round_trip_at_single_precision() {
        let codec = codec(ProtocolVersion::V2);
        let mut att = Message::from_schema(codec.schema(), "telemetry", "ATTITUDE").unwrap();
        att.set("phi", 0.25f64).unwrap();
        att.set("psi", -1.5f64).unwrap();
        att.set("theta", 3.0f64).unwrap();

        let mut payload = BytesMut::new();
        encode_payload(&att, &mut payload).unwrap();
        assert_eq!(payload.len(), 12);
        assert_eq!(codec.decode(1, 6, &payload).unwrap(), att);
    }

    #[test]
    fn inexact_floats_survive_the_wire() {
        let codec = codec(ProtocolVersion::V2);
        let mut att = Message::from_schema(codec.schema(), "telemetry", "ATTITUDE").unwrap();
        att.set("phi", 0.1f64).unwrap();
        att.set("psi", -2.7f64).unwrap();
        let mut traj = Message::from_schema(codec.schema(), "telemetry", "TRAJ").unwrap();
        traj.set("xs", vec![0.1f64, 1.0 / 3.0]).unwrap();

        for message in [att, traj] {
            let mut payload = BytesMut::new();
            encode_payload(&message, &mut payload).unwrap();
            let decoded = codec.decode(1, message.id(), &payload).unwrap();
            assert_eq!(decoded, message);
        }
    }
}
