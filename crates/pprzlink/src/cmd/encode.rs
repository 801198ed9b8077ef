use bytes::BytesMut;
use pprzlink_message::{Address, CodecError, TextCodec, WireCodec};
use serde::Serialize;
use tracing::debug;

use crate::cmd::EncodeArgs;
use crate::exit::{codec_error, text_error, CliResult, SUCCESS};
use crate::output::{hex, print_json, print_raw, OutputFormat};

#[derive(Serialize)]
struct EncodeOutput<'a> {
    class: &'a str,
    message: &'a str,
    protocol: &'static str,
    length: usize,
    frame: String,
}

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let schema = args.schema.load()?;
    let version = args.protocol.protocol;

    let definition = schema
        .message(&args.class, &args.message)
        .cloned()
        .ok_or_else(|| {
            codec_error(
                "encode failed",
                CodecError::UnknownMessage {
                    class: args.class.clone(),
                    message: args.message.clone(),
                },
            )
        })?;

    let text = TextCodec::new(schema.clone());
    let message = text
        .parse_payload(&definition, &args.payload.join(" "))
        .map_err(|err| text_error("invalid payload", err))?;

    let address = Address {
        sender_id: args.sender,
        receiver_id: args.receiver,
        component_id: args.component,
    };
    let mut frame = BytesMut::new();
    WireCodec::new(schema, version)
        .encode(&message, address, &mut frame)
        .map_err(|err| codec_error("encode failed", err))?;
    debug!(message = %message, bytes = frame.len(), "encoded frame");

    match format {
        OutputFormat::Raw => print_raw(&frame),
        OutputFormat::Json => print_json(&EncodeOutput {
            class: &args.class,
            message: &args.message,
            protocol: version.as_str(),
            length: frame.len(),
            frame: hex(&frame),
        }),
        OutputFormat::Table | OutputFormat::Pretty => println!("{}", hex(&frame)),
    }
    Ok(SUCCESS)
}
