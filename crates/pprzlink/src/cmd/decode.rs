use std::fs::File;
use std::io::{BufReader, Read};

use pprzlink_frame::{FrameConfig, FrameError, FrameReader, ProtocolVersion};
use pprzlink_message::WireCodec;
use pprzlink_schema::SchemaModel;
use tracing::{info, warn};

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_message, MessageRecord, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let schema = args.schema.load()?;
    let config = frame_config(&schema, args.protocol.protocol, &args.class)?;
    let codec = WireCodec::with_config(schema, config);

    let input: Box<dyn Read> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).map_err(|err| io_error(&format!("open {}", path.display()), err))?,
        )),
        None => Box::new(std::io::stdin().lock()),
    };
    let mut reader = FrameReader::with_config(input, config);

    let mut decoded = 0usize;
    let mut rejected = 0usize;
    loop {
        if args.count.is_some_and(|count| decoded >= count) {
            break;
        }
        let frame = match reader.read_frame() {
            Ok(frame) => frame,
            Err(FrameError::ConnectionClosed) => break,
            Err(err) => return Err(frame_error("read failed", err)),
        };

        match codec.decode_frame(&frame) {
            Ok(envelope) => {
                let record = MessageRecord {
                    sender: envelope.address.sender_id.to_string(),
                    receiver: (config.version == ProtocolVersion::V2)
                        .then_some(envelope.address.receiver_id),
                    component: (config.version == ProtocolVersion::V2)
                        .then_some(envelope.address.component_id),
                    ac_id: None,
                    request_id: None,
                    message: &envelope.message,
                };
                print_message(&record, format);
                decoded += 1;
            }
            Err(err) => {
                rejected += 1;
                warn!(
                    class_id = frame.header.class_id,
                    msg_id = frame.header.msg_id,
                    error = %err,
                    "dropping undecodable frame"
                );
            }
        }
    }

    let stats = reader.stats();
    info!(
        decoded,
        rejected,
        frames = stats.frames,
        checksum_errors = stats.checksum_errors,
        malformed_lengths = stats.malformed_lengths,
        discarded_bytes = stats.discarded_bytes,
        "decode finished"
    );
    Ok(SUCCESS)
}

/// A 1.0 header has no class byte, so the link class comes from `class`.
fn frame_config(
    schema: &SchemaModel,
    version: ProtocolVersion,
    class: &str,
) -> CliResult<FrameConfig> {
    match version {
        ProtocolVersion::V2 => Ok(FrameConfig::v2()),
        ProtocolVersion::V1 => {
            let id = schema
                .class(class)
                .and_then(|class| class.id)
                .ok_or_else(|| CliError::new(USAGE, format!("unknown message class: {class}")))?;
            Ok(FrameConfig::v1(id))
        }
    }
}
