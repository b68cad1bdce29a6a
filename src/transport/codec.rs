//! Attribute-based wire format.
//!
//! A message is a single `<command .../>` or `<status .../>` element. The
//! reserved attributes carry the task ID and the command type / status label,
//! every other attribute is an opaque parameter or detail.

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;
use tracing::warn;

use super::{Attributes, Command, Status};

const COMMAND_TAG: &str = "command";
const STATUS_TAG: &str = "status";
const TASK_ATTR: &str = "task";
const TYPE_ATTR: &str = "type";
const STATUS_ATTR: &str = "status";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    MalformedMessage(String),
    #[error("missing required attribute '{0}'")]
    MissingRequiredField(&'static str),
}

pub fn decode_command(text: &str) -> Result<Command, ProtocolError> {
    let (task_id, command_type, params) = decode_element(text, COMMAND_TAG, TYPE_ATTR)?;
    Ok(Command {
        task_id,
        command_type,
        params,
    })
}

pub fn decode_status(text: &str) -> Result<Status, ProtocolError> {
    let (task_id, status, details) = decode_element(text, STATUS_TAG, STATUS_ATTR)?;
    Ok(Status {
        task_id,
        status,
        details,
    })
}

pub fn encode_command(command: &Command) -> String {
    encode_element(
        COMMAND_TAG,
        [(TASK_ATTR, &command.task_id), (TYPE_ATTR, &command.command_type)],
        &command.params,
    )
}

pub fn encode_status(status: &Status) -> String {
    encode_element(
        STATUS_TAG,
        [(TASK_ATTR, &status.task_id), (STATUS_ATTR, &status.status)],
        &status.details,
    )
}

fn decode_element(
    text: &str,
    tag: &str,
    label_attr: &'static str,
) -> Result<(String, String, Attributes), ProtocolError> {
    let malformed = |reason: String| Err(ProtocolError::MalformedMessage(reason));
    let mut reader = Reader::from_str(text);
    let mut decoded = None;
    // 1 while inside an open <tag>, 0 before and after it
    let mut depth = 0usize;
    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) | Ok(Event::Empty(element)) if decoded.is_some() => {
                let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
                return malformed(format!("unexpected element <{name}>"));
            }
            Ok(Event::Start(element)) => {
                check_root(&element, tag)?;
                decoded = Some(read_attributes(&element, label_attr)?);
                depth = 1;
            }
            Ok(Event::Empty(element)) => {
                check_root(&element, tag)?;
                decoded = Some(read_attributes(&element, label_attr)?);
            }
            Ok(Event::End(_)) if depth == 1 => depth = 0,
            Ok(Event::End(_)) => return malformed("unexpected end tag".to_string()),
            Ok(Event::Text(content)) if depth == 0 && !content.iter().all(u8::is_ascii_whitespace) => {
                return malformed("text outside the root element".to_string());
            }
            Ok(Event::Eof) if depth == 1 => return malformed(format!("unclosed <{tag}> element")),
            Ok(Event::Eof) => {
                return decoded.map_or_else(|| malformed(format!("no <{tag}> element found")), Ok);
            }
            Ok(_) => continue,
            Err(err) => return malformed(err.to_string()),
        }
    }
}

fn check_root(element: &BytesStart<'_>, tag: &str) -> Result<(), ProtocolError> {
    if element.name().as_ref() == tag.as_bytes() {
        Ok(())
    } else {
        let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
        Err(ProtocolError::MalformedMessage(format!(
            "expected <{tag}> root element, found <{name}>"
        )))
    }
}

fn read_attributes(
    element: &BytesStart<'_>,
    label_attr: &'static str,
) -> Result<(String, String, Attributes), ProtocolError> {
    let mut task_id = None;
    let mut label = None;
    let mut rest = Attributes::new();

    for attr in element.attributes() {
        let attr = attr.map_err(|e| ProtocolError::MalformedMessage(e.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| ProtocolError::MalformedMessage(e.to_string()))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| ProtocolError::MalformedMessage(e.to_string()))?
            .into_owned();

        if key == TASK_ATTR {
            task_id = Some(value);
        } else if key == label_attr {
            label = Some(value);
        } else {
            rest.insert(key, value);
        }
    }

    let task_id = task_id.ok_or(ProtocolError::MissingRequiredField(TASK_ATTR))?;
    let label = label.ok_or(ProtocolError::MissingRequiredField(label_attr))?;
    Ok((task_id, label, rest))
}

fn encode_element(tag: &str, reserved: [(&str, &String); 2], extra: &Attributes) -> String {
    let mut out = String::with_capacity(64);
    out.push('<');
    out.push_str(tag);
    for (name, value) in reserved {
        push_attribute(&mut out, name, value);
    }
    for (name, value) in extra {
        if reserved.iter().any(|(r, _)| *r == name.as_str()) {
            warn!(attribute = %name, "skipping attribute that shadows a reserved name");
            continue;
        }
        if !is_attribute_name(name) {
            warn!(attribute = %name, "skipping attribute with an invalid name");
            continue;
        }
        push_attribute(&mut out, name, value);
    }
    out.push_str("/>");
    out
}

fn push_attribute(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    // readers normalize raw whitespace controls in attribute values
    for c in escape(value).chars() {
        match c {
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            _ => out.push(c),
        }
    }
    out.push('"');
}

fn is_attribute_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.'))
}
