use std::fmt::Write as _;
use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use pprzlink_message::{payload_string, Message};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One decoded message with whatever addressing its source carried.
#[derive(Serialize)]
pub struct MessageRecord<'a> {
    pub sender: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ac_id: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(flatten)]
    pub message: &'a Message,
}

pub fn print_message(record: &MessageRecord<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(record),
        OutputFormat::Table => {
            let fields = record
                .message
                .fields()
                .map(|(def, value)| format!("{}={}", def.name, value))
                .collect::<Vec<_>>()
                .join(" ");
            print_table(
                vec!["CLASS", "MESSAGE", "SENDER", "FIELDS"],
                vec![vec![
                    record.message.class_name().to_string(),
                    record.message.name().to_string(),
                    record.sender.clone(),
                    fields,
                ]],
            );
        }
        OutputFormat::Pretty => {
            println!("[{}] {}", record.sender, record.message);
        }
        OutputFormat::Raw => {
            let payload = payload_string(record.message, ' ');
            if payload.is_empty() {
                println!("{} {}", record.sender, record.message.name());
            } else {
                println!("{} {} {}", record.sender, record.message.name(), payload);
            }
        }
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_table(header: Vec<&str>, rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    for row in rows {
        table.add_row(row);
    }
    println!("{table}");
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Space separated lowercase hex.
pub fn hex(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 3);
    for (idx, byte) in data.iter().enumerate() {
        if idx > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{byte:02x}");
    }
    out
}
