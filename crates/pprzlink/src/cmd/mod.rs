use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Subcommand, ValueEnum};
use pprzlink_frame::ProtocolVersion;
use pprzlink_schema::{load_path, SchemaConfig, SchemaModel};
use tracing::debug;

use crate::exit::{load_error, CliResult};
use crate::output::OutputFormat;

pub mod bindgen;
pub mod check;
pub mod decode;
pub mod encode;
pub mod parse_line;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile a schema and summarize its classes.
    Check(CheckArgs),
    /// Generate accessor descriptors for every message.
    Bindgen(BindgenArgs),
    /// Decode binary frames from a file or stdin.
    Decode(DecodeArgs),
    /// Encode one message from a text payload into a binary frame.
    Encode(EncodeArgs),
    /// Parse one text bus line.
    ParseLine(ParseLineArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Check(args) => check::run(args, format),
        Command::Bindgen(args) => bindgen::run(args),
        Command::Decode(args) => decode::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::ParseLine(args) => parse_line::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug, Clone)]
pub struct SchemaArgs {
    /// Schema document (JSON).
    #[arg(long, short = 's', value_name = "FILE", env = "PPRZLINK_SCHEMA")]
    pub schema: PathBuf,
}

impl SchemaArgs {
    pub fn load(&self) -> CliResult<Arc<SchemaModel>> {
        load_schema(&self.schema)
    }
}

pub fn load_schema(path: &Path) -> CliResult<Arc<SchemaModel>> {
    let schema = load_path(path, &SchemaConfig::default())
        .map_err(|err| load_error("schema load failed", err))?;
    debug!(
        path = %path.display(),
        classes = schema.classes().len(),
        messages = schema.message_count(),
        "loaded schema"
    );
    Ok(Arc::new(schema))
}

#[derive(Args, Debug, Clone, Copy)]
pub struct ProtocolArgs {
    /// Protocol version of the link (1.0 or 2.0).
    #[arg(long, value_name = "VERSION", env = "PPRZLINK_PROTOCOL", default_value = "2.0")]
    pub protocol: ProtocolVersion,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub schema: SchemaArgs,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum BackendArg {
    C,
    Rust,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum EmitArg {
    Json,
    Listing,
}

#[derive(Args, Debug)]
pub struct BindgenArgs {
    #[command(flatten)]
    pub schema: SchemaArgs,
    #[command(flatten)]
    pub protocol: ProtocolArgs,
    /// Accessor expression syntax.
    #[arg(long, default_value = "c")]
    pub backend: BackendArg,
    /// Only this class.
    #[arg(long)]
    pub class: Option<String>,
    /// Output syntax.
    #[arg(long, default_value = "json")]
    pub emit: EmitArg,
    /// Write to a file instead of stdout.
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    #[command(flatten)]
    pub schema: SchemaArgs,
    #[command(flatten)]
    pub protocol: ProtocolArgs,
    /// Read frames from a file instead of stdin.
    #[arg(long, short = 'i', value_name = "FILE")]
    pub input: Option<PathBuf>,
    /// Class carried by a 1.0 link (its header has no class byte).
    #[arg(long, default_value = "telemetry")]
    pub class: String,
    /// Exit after decoding N messages.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub schema: SchemaArgs,
    #[command(flatten)]
    pub protocol: ProtocolArgs,
    /// Message class.
    #[arg(long)]
    pub class: String,
    /// Message name.
    #[arg(long, short = 'm')]
    pub message: String,
    #[arg(long, default_value = "0")]
    pub sender: u8,
    #[arg(long, default_value = "0")]
    pub receiver: u8,
    #[arg(long, default_value = "0")]
    pub component: u8,
    /// Field values in declaration order, text bus syntax.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub payload: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ParseLineArgs {
    #[command(flatten)]
    pub schema: SchemaArgs,
    /// Restrict the message lookup to this class.
    #[arg(long)]
    pub class: Option<String>,
    /// `sender NAME payload...`, optionally with a request id.
    pub line: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
