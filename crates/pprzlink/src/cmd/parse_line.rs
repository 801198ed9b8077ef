use pprzlink_message::TextCodec;

use crate::cmd::ParseLineArgs;
use crate::exit::{text_error, CliResult, SUCCESS};
use crate::output::{print_message, MessageRecord, OutputFormat};

pub fn run(args: ParseLineArgs, format: OutputFormat) -> CliResult<i32> {
    let schema = args.schema.load()?;
    let codec = TextCodec::new(schema);

    let parsed = match &args.class {
        Some(class) => codec.parse_line_in(class, &args.line),
        None => codec.parse_line(&args.line),
    }
    .map_err(|err| text_error("parse failed", err))?;

    let record = MessageRecord {
        sender: parsed.sender.clone(),
        receiver: None,
        component: None,
        ac_id: Some(parsed.ac_id),
        request_id: parsed.request_id.as_ref().map(ToString::to_string),
        message: &parsed.message,
    };
    print_message(&record, format);
    Ok(SUCCESS)
}
