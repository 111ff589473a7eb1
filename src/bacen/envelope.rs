//! SOAP 1.2 envelope codec.
//!
//! The body payload is copied into and out of the envelope byte-for-byte,
//! so a signed body keeps its exact canonical form.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

use crate::bacen::types::Fault;

pub const SOAP_ENVELOPE_NS: &str = "http://www.w3.org/2003/05/soap-envelope";
pub const WSSE_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
pub const DICT_NS: &str = "http://www.bcb.gov.br/dict/api/v1";
pub const SOAP_CONTENT_TYPE: &str = "application/soap+xml; charset=utf-8";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("failed to write envelope: {0}")]
    Write(String),

    #[error("malformed envelope: {0}")]
    Xml(String),

    #[error("envelope has no Body element")]
    MissingBody,
}

/// Wrap `body` in a SOAP envelope.
///
/// A WS-Security header carrying `signature` is added only when a signature
/// is supplied.
pub fn build_envelope(body: &[u8], signature: Option<&str>) -> Result<Vec<u8>, EnvelopeError> {
    let mut writer = Writer::new(Vec::with_capacity(body.len() + 512));

    write(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write(
        &mut writer,
        Event::Start(
            BytesStart::new("soap:Envelope")
                .with_attributes([("xmlns:soap", SOAP_ENVELOPE_NS), ("xmlns:dict", DICT_NS)]),
        ),
    )?;

    if let Some(signature) = signature {
        write(&mut writer, Event::Start(BytesStart::new("soap:Header")))?;
        write(
            &mut writer,
            Event::Start(BytesStart::new("wsse:Security").with_attributes([("xmlns:wsse", WSSE_NS)])),
        )?;
        write(&mut writer, Event::Start(BytesStart::new("wsse:Signature")))?;
        write(&mut writer, Event::Text(BytesText::new(signature)))?;
        write(&mut writer, Event::End(BytesEnd::new("wsse:Signature")))?;
        write(&mut writer, Event::End(BytesEnd::new("wsse:Security")))?;
        write(&mut writer, Event::End(BytesEnd::new("soap:Header")))?;
    }

    write(&mut writer, Event::Start(BytesStart::new("soap:Body")))?;
    writer.get_mut().extend_from_slice(body);
    write(&mut writer, Event::End(BytesEnd::new("soap:Body")))?;
    write(&mut writer, Event::End(BytesEnd::new("soap:Envelope")))?;

    Ok(writer.into_inner())
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), EnvelopeError> {
    writer
        .write_event(event)
        .map_err(|e| EnvelopeError::Write(e.to_string()))
}

/// Extract the exact bytes between `<Body>` and `</Body>`.
pub fn parse_response(envelope: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    let mut reader = Reader::from_reader(envelope);
    let mut path: Vec<Vec<u8>> = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| EnvelopeError::Xml(e.to_string()))?;
        match event {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                if path.len() == 1 && path[0] == b"Envelope" && name == b"Body" {
                    let start = reader.buffer_position() as usize;
                    return read_inner(&mut reader, envelope, start);
                }
                path.push(name);
            }
            Event::Empty(e) => {
                if path.len() == 1 && path[0] == b"Envelope" && e.local_name().as_ref() == b"Body" {
                    return Ok(Vec::new());
                }
            }
            Event::End(_) => {
                path.pop();
            }
            Event::Eof => return Err(EnvelopeError::MissingBody),
            _ => {}
        }
    }
}

/// Consume events up to the end tag matching the element just opened and
/// return the raw bytes in between.
fn read_inner(reader: &mut Reader<&[u8]>, input: &[u8], start: usize) -> Result<Vec<u8>, EnvelopeError> {
    let mut depth = 0usize;
    loop {
        let event = reader
            .read_event()
            .map_err(|e| EnvelopeError::Xml(e.to_string()))?;
        match event {
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => {
                let end_tag_close = reader.buffer_position() as usize;
                let end = input[..end_tag_close]
                    .windows(2)
                    .rposition(|w| w == b"</")
                    .ok_or_else(|| EnvelopeError::Xml("unterminated element".to_string()))?;
                return Ok(input[start..end].to_vec());
            }
            Event::End(_) => depth -= 1,
            Event::Eof => return Err(EnvelopeError::Xml("unexpected end of document".to_string())),
            _ => {}
        }
    }
}

/// Look for a SOAP fault (1.2 or 1.1 shape) with a non-empty code.
///
/// Documents that are not well-formed are reported as carrying no fault;
/// body extraction reports them instead.
pub fn detect_fault(envelope: &[u8]) -> Option<Fault> {
    let mut reader = Reader::from_reader(envelope);
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut in_fault = false;
    let mut code = String::new();
    let mut reason = String::new();
    let mut detail: Option<String> = None;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(_) => return None,
        };
        match event {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                if in_fault && path.len() == 3 && (name == b"Detail" || name == b"detail") {
                    let start = reader.buffer_position() as usize;
                    let raw = read_inner(&mut reader, envelope, start).ok()?;
                    let text = String::from_utf8_lossy(&raw).trim().to_string();
                    if !text.is_empty() {
                        detail = Some(text);
                    }
                    continue;
                }
                path.push(name);
                if path.len() == 3 && is_path(&path, &[b"Envelope", b"Body", b"Fault"]) {
                    in_fault = true;
                }
            }
            Event::End(_) => {
                if in_fault && path.len() == 3 {
                    break;
                }
                path.pop();
            }
            Event::Text(t) if in_fault => {
                let text = match t.unescape() {
                    Ok(text) => text.into_owned(),
                    Err(_) => continue,
                };
                append_fault_text(&path, &text, &mut code, &mut reason);
            }
            Event::CData(t) if in_fault => {
                let text = String::from_utf8_lossy(&t.into_inner()).into_owned();
                append_fault_text(&path, &text, &mut code, &mut reason);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let code = code.trim();
    if code.is_empty() {
        return None;
    }
    Some(Fault {
        code: code.to_string(),
        reason: reason.trim().to_string(),
        detail,
    })
}

fn append_fault_text(path: &[Vec<u8>], text: &str, code: &mut String, reason: &mut String) {
    let tail: Vec<&[u8]> = path.iter().skip(3).map(Vec::as_slice).collect();
    match tail.as_slice() {
        [b"Code", b"Value"] | [b"faultcode"] => code.push_str(text),
        [b"Reason", b"Text"] | [b"faultstring"] => reason.push_str(text),
        _ => {}
    }
}

fn is_path(path: &[Vec<u8>], expected: &[&[u8]]) -> bool {
    path.len() == expected.len() && path.iter().zip(expected).all(|(a, b)| a.as_slice() == *b)
}
