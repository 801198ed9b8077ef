//! Text bus codec.
//!
//! Lines are `sender NAME payload...`. Request/answer lines carry an extra
//! `pid_seq` request id token: `sender id NAME_REQ payload...` for requests,
//! `id sender NAME payload...` for answers.
//!
//! Payload fields are separated by spaces (`;` for the CSV form). Numeric
//! arrays are comma-joined, char arrays are double-quoted so they may contain
//! separators. The legacy `|a,b,c|` char array form is accepted on input.

use std::sync::Arc;

use pprzlink_schema::{ArrayKind, BaseType, FieldDefinition, MessageDefinition, SchemaModel};
use tracing::debug;

use crate::error::{CodecError, TextError};
use crate::message::Message;
use crate::request_id::RequestId;
use crate::value::{numbers_to_array, FieldValue};

/// Suffix naming the request form of a message.
pub const REQUEST_SUFFIX: &str = "_REQ";

/// Text codec settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextConfig {
    /// Class whose sender token is the aircraft id.
    pub telemetry_class: String,
    /// Prefix of replayed telemetry senders (`replay12`).
    pub replay_prefix: String,
    /// Payload field separator.
    pub separator: char,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            telemetry_class: "telemetry".to_string(),
            replay_prefix: "replay".to_string(),
            separator: ' ',
        }
    }
}

/// A parsed text bus line.
#[derive(Debug, Clone, PartialEq)]
pub struct TextMessage {
    pub sender: String,
    /// Aircraft the message concerns: the sender for telemetry, the `ac_id`
    /// field (or 0) otherwise.
    pub ac_id: u8,
    pub request_id: Option<RequestId>,
    pub message: Message,
}

/// Payload token.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Plain(String),
    Quoted(String),
    /// Legacy `|a,b|` char array.
    Piped(String),
}

/// Split a payload, keeping quoted and piped tokens whole.
///
/// With an explicit separator every slot between separators is a token, even
/// an empty one; whitespace separation collapses runs.
fn tokenize(payload: &str, separator: char) -> Vec<Token> {
    let keep_empty = separator != ' ' && !payload.trim().is_empty();
    let mut tokens = Vec::new();
    let mut plain = String::new();
    // a quoted or piped token already filled the current slot
    let mut slot_filled = false;
    let mut chars = payload.chars();

    let flush = |plain: &mut String, tokens: &mut Vec<Token>, slot_filled: bool| {
        let token = plain.trim();
        if !token.is_empty() || (keep_empty && !slot_filled) {
            tokens.push(Token::Plain(token.to_string()));
        }
        plain.clear();
    };

    while let Some(c) = chars.next() {
        if c == '"' || c == '|' {
            if !plain.trim().is_empty() {
                flush(&mut plain, &mut tokens, false);
            }
            plain.clear();
            let inner: String = chars.by_ref().take_while(|&c| c != '"' && c != '|').collect();
            tokens.push(if c == '"' {
                Token::Quoted(inner)
            } else {
                Token::Piped(inner)
            });
            slot_filled = true;
        } else if c == separator || (separator == ' ' && c.is_whitespace()) {
            flush(&mut plain, &mut tokens, slot_filled);
            slot_filled = false;
        } else {
            plain.push(c);
        }
    }
    flush(&mut plain, &mut tokens, slot_filled);
    tokens
}

/// First whitespace-delimited token and the remainder.
fn next_token(line: &str) -> (&str, &str) {
    let line = line.trim_start();
    match line.find(char::is_whitespace) {
        Some(end) => (&line[..end], &line[end..]),
        None => (line, ""),
    }
}

fn parse_number(text: &str) -> Option<FieldValue> {
    if let Ok(v) = text.parse::<u64>() {
        Some(FieldValue::UInt(v))
    } else if let Ok(v) = text.parse::<i64>() {
        Some(FieldValue::Int(v))
    } else {
        text.parse::<f64>().ok().map(FieldValue::Float)
    }
}

fn parse_field(field: &FieldDefinition, token: &Token) -> Result<FieldValue, TextError> {
    let invalid = |text: &str| TextError::InvalidValue {
        field: field.name.clone(),
        value: text.to_string(),
    };
    let ty = &field.field_type;

    let value = match (ty.array, ty.base, token) {
        (ArrayKind::None, BaseType::Char, Token::Plain(s) | Token::Quoted(s)) => {
            FieldValue::Text(s.clone())
        }
        (ArrayKind::None, _, Token::Plain(s)) => match parse_number(s) {
            Some(v) => v,
            None => field
                .values
                .as_ref()
                .and_then(|values| values.value_of(s))
                .map(FieldValue::UInt)
                .ok_or_else(|| invalid(s))?,
        },
        (ArrayKind::None, _, Token::Quoted(s) | Token::Piped(s)) => return Err(invalid(s)),
        (_, BaseType::Char, Token::Piped(s)) => FieldValue::Text(s.replace(',', "")),
        (_, BaseType::Char, Token::Plain(s) | Token::Quoted(s)) => FieldValue::Text(s.clone()),
        (_, _, Token::Plain(s) | Token::Quoted(s) | Token::Piped(s)) => {
            let numbers = s
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| parse_number(item).ok_or_else(|| invalid(item)))
                .collect::<Result<Vec<_>, _>>()?;
            numbers_to_array(numbers)
        }
    };
    Ok(value.coerce(field)?)
}

/// `NAME;f1;f2` form used to embed a message in a text field.
pub fn to_csv(message: &Message) -> String {
    format!("{};{}", message.name(), payload_string(message, ';'))
}

/// Name of the request form of `name`.
pub fn request_name(name: &str) -> String {
    format!("{name}{REQUEST_SUFFIX}")
}

/// Name answered by a request message, if `name` is one.
pub fn answered_name(name: &str) -> Option<&str> {
    name.strip_suffix(REQUEST_SUFFIX).filter(|base| !base.is_empty())
}

/// Payload fields joined by `separator`. Text and empty arrays are quoted so
/// every field keeps a token of its own.
pub fn payload_string(message: &Message, separator: char) -> String {
    let mut out = String::new();
    for (idx, (field, value)) in message.fields().enumerate() {
        if idx > 0 {
            out.push(separator);
        }
        if field.field_type.is_text() || value.len() == Some(0) {
            out.push('"');
            value.write_text(field.field_type.base, &mut out);
            out.push('"');
        } else {
            value.write_text(field.field_type.base, &mut out);
        }
    }
    out
}

/// Text bus codec bound to one schema.
#[derive(Debug, Clone)]
pub struct TextCodec {
    schema: Arc<SchemaModel>,
    config: TextConfig,
}

impl TextCodec {
    pub fn new(schema: Arc<SchemaModel>) -> Self {
        Self::with_config(schema, TextConfig::default())
    }

    pub fn with_config(schema: Arc<SchemaModel>, config: TextConfig) -> Self {
        Self { schema, config }
    }

    pub fn schema(&self) -> &Arc<SchemaModel> {
        &self.schema
    }

    pub fn config(&self) -> &TextConfig {
        &self.config
    }

    /// `sender NAME payload`
    pub fn encode(&self, sender: &str, message: &Message) -> String {
        self.line(&[sender, message.name()], message)
    }

    /// `sender id NAME_REQ payload`
    pub fn request_line(&self, sender: &str, id: &RequestId, request: &Message) -> String {
        self.line(&[sender, id.as_str(), request.name()], request)
    }

    /// `id sender NAME payload`
    pub fn answer_line(&self, id: &RequestId, sender: &str, answer: &Message) -> String {
        self.line(&[id.as_str(), sender, answer.name()], answer)
    }

    /// Default instance of the request message for `name` in `class`.
    pub fn request(&self, class: &str, name: &str) -> Result<Message, TextError> {
        Ok(Message::from_schema(&self.schema, class, &request_name(name))?)
    }

    /// Parse a payload for a known message.
    pub fn parse_payload(
        &self,
        definition: &Arc<MessageDefinition>,
        payload: &str,
    ) -> Result<Message, TextError> {
        let tokens = tokenize(payload, self.config.separator);
        let fields = &definition.fields;
        if tokens.len() != fields.len() {
            return Err(CodecError::FieldCountMismatch {
                message: definition.name.clone(),
                expected: fields.len(),
                actual: tokens.len(),
            }
            .into());
        }

        let mut message = Message::new(Arc::clone(definition));
        for (idx, token) in tokens.iter().enumerate() {
            let value = parse_field(&fields[idx], token)?;
            message.set_index(idx, value)?;
        }
        Ok(message)
    }

    /// Parse a line, searching every class for the message name.
    pub fn parse_line(&self, line: &str) -> Result<TextMessage, TextError> {
        self.parse_with(line, |name| self.schema.find_message(name))
    }

    /// Parse a line whose message belongs to `class`.
    pub fn parse_line_in(&self, class: &str, line: &str) -> Result<TextMessage, TextError> {
        let class = self
            .schema
            .class(class)
            .ok_or_else(|| TextError::Codec(CodecError::UnknownClass(class.to_string())))?;
        self.parse_with(line, |name| class.message(name))
    }

    /// Parse a [`to_csv`] string of a message in `class`.
    pub fn from_csv(&self, class: &str, text: &str) -> Result<Message, TextError> {
        let (name, payload) = text.split_once(';').unwrap_or((text, ""));
        let definition = self
            .schema
            .message(class, name.trim())
            .ok_or_else(|| TextError::UnknownMessage(name.trim().to_string()))?;
        let csv = Self::with_config(
            Arc::clone(&self.schema),
            TextConfig {
                separator: ';',
                ..self.config.clone()
            },
        );
        csv.parse_payload(definition, payload)
    }

    fn line(&self, head: &[&str], message: &Message) -> String {
        let mut line = head.join(" ");
        let payload = payload_string(message, self.config.separator);
        if !payload.is_empty() {
            line.push(' ');
            line.push_str(&payload);
        }
        line
    }

    fn parse_with<'s>(
        &'s self,
        line: &str,
        lookup: impl Fn(&str) -> Option<&'s Arc<MessageDefinition>>,
    ) -> Result<TextMessage, TextError> {
        let (first, rest) = next_token(line);
        if first.is_empty() {
            return Err(TextError::Empty);
        }
        let (second, rest) = next_token(rest);
        if second.is_empty() {
            return Err(TextError::Malformed(line.trim().to_string()));
        }

        let (sender, request_id, name, payload) = if RequestId::matches(first) {
            let (name, payload) = next_token(rest);
            (second, first.parse().ok(), name, payload)
        } else if RequestId::matches(second) {
            let (name, payload) = next_token(rest);
            (first, second.parse().ok(), name, payload)
        } else {
            (first, None, second, rest)
        };
        if name.is_empty() {
            return Err(TextError::Malformed(line.trim().to_string()));
        }

        let definition =
            lookup(name).ok_or_else(|| TextError::UnknownMessage(name.to_string()))?;
        let message = self.parse_payload(definition, payload)?;
        let ac_id = self.ac_id(sender, &message)?;
        debug!(sender, message = %name, ac_id, "parsed text message");

        Ok(TextMessage {
            sender: sender.to_string(),
            ac_id,
            request_id,
            message,
        })
    }

    fn ac_id(&self, sender: &str, message: &Message) -> Result<u8, TextError> {
        if message.class_name() == self.config.telemetry_class {
            let id = sender
                .strip_prefix(self.config.replay_prefix.as_str())
                .unwrap_or(sender);
            return id
                .parse()
                .map_err(|_| TextError::InvalidSender(sender.to_string()));
        }
        let Ok(value) = message.get("ac_id") else {
            return Ok(0);
        };
        value
            .as_u64()
            .and_then(|v| u8::try_from(v).ok())
            .ok_or_else(|| TextError::InvalidValue {
                field: "ac_id".to_string(),
                value: value.to_string(),
            })
    }
}
