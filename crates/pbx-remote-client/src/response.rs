//! Parser for `ajax-response` manager documents.
//!
//! A response looks like:
//!
//! ```text
//! <ajax-response>
//!   <response type='object' id='unknown'>
//!     <generic response='Success' message='Authentication accepted' />
//!   </response>
//!   <response type='object' id='unknown'>
//!     <generic event='QueueParams' queue='support' ... />
//!   </response>
//! </ajax-response>
//! ```
//!
//! Every `generic` record becomes an [`Event`] holding all of its attributes.

use pbx_remote_core::Event;
use quick_xml::{Reader, events::BytesStart, events::Event as XmlEvent};
use thiserror::Error;

const ROOT: &[u8] = b"ajax-response";
const RESPONSE: &[u8] = b"response";
const GENERIC: &[u8] = b"generic";

/// Attribute holding a record's outcome.
pub const RESPONSE_KEY: &str = "response";
/// Attribute holding a record's human-readable message.
pub const MESSAGE_KEY: &str = "message";

/// Malformed response body.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("empty response body")]
    Empty,
    #[error("unexpected root element '{0}'")]
    UnexpectedRoot(String),
    #[error("response ended before the document was closed")]
    Truncated,
    #[error("XML error: {0}")]
    Xml(String),
}

/// Parse a response body into its records, in document order.
///
/// # Errors
/// Returns error if the body is not a well-formed `ajax-response` document.
pub fn parse_records(body: &str) -> Result<Vec<Event>, ParseError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut saw_root = false;
    let mut records = Vec::new();

    loop {
        match reader.read_event() {
            Ok(XmlEvent::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                check_root(&path, &name, &mut saw_root)?;
                if is_record(&path, &name) {
                    records.push(record_from(&e)?);
                }
                path.push(name);
            }
            Ok(XmlEvent::Empty(e)) => {
                let name = e.local_name().as_ref().to_vec();
                check_root(&path, &name, &mut saw_root)?;
                if is_record(&path, &name) {
                    records.push(record_from(&e)?);
                }
            }
            Ok(XmlEvent::End(_)) => {
                path.pop();
            }
            Ok(XmlEvent::Eof) => break,
            Err(e) => return Err(ParseError::Xml(e.to_string())),
            Ok(_) => {}
        }
    }

    if !saw_root {
        return Err(ParseError::Empty);
    }
    if !path.is_empty() {
        return Err(ParseError::Truncated);
    }
    Ok(records)
}

fn check_root(path: &[Vec<u8>], name: &[u8], saw_root: &mut bool) -> Result<(), ParseError> {
    if !path.is_empty() {
        return Ok(());
    }
    if name != ROOT || *saw_root {
        return Err(ParseError::UnexpectedRoot(
            String::from_utf8_lossy(name).into_owned(),
        ));
    }
    *saw_root = true;
    Ok(())
}

fn is_record(path: &[Vec<u8>], name: &[u8]) -> bool {
    name == GENERIC && path.len() == 2 && path[0] == ROOT && path[1] == RESPONSE
}

fn record_from(element: &BytesStart<'_>) -> Result<Event, ParseError> {
    let mut record = Event::new();
    for attr in element.attributes().with_checks(false) {
        let attr = attr.map_err(|e| ParseError::Xml(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| ParseError::Xml(e.to_string()))?;
        record.set(key, value.into_owned());
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_records_in_order() {
        let body = "<ajax-response>\n\
            <response type='object' id='unknown'><generic response='Success' message='Queue status will follow' /></response>\n\
            <response type='object' id='unknown'><generic event='QueueParams' queue='support' max='0' /></response>\n\
            <response type='object' id='unknown'><generic event='QueueMember' queue='support' name='SIP/1001' /></response>\n\
            </ajax-response>";

        let records = parse_records(body).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].get("response"), Some("Success"));
        assert_eq!(records[1].event_type(), "QueueParams");
        assert_eq!(records[2].get("name"), Some("SIP/1001"));
        let keys: Vec<_> = records[1].iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["event", "queue", "max"]);
    }

    #[test]
    fn test_unescapes_attribute_values() {
        let body = "<ajax-response><response><generic event='UserEvent' body='a &amp; b &lt;c&gt;' /></response></ajax-response>";
        let records = parse_records(body).unwrap();
        assert_eq!(records[0].get("body"), Some("a & b <c>"));
    }

    #[test]
    fn test_duplicate_attribute_keeps_first() {
        let body = "<ajax-response><response><generic event='Dup' key='one' key='two' /></response></ajax-response>";
        let records = parse_records(body).unwrap();
        assert_eq!(records[0].get("key"), Some("one"));
    }

    #[test]
    fn test_ignores_generic_outside_response() {
        let body = "<ajax-response><generic response='Success' /><response><other response='Success' /></response></ajax-response>";
        assert!(parse_records(body).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_malformed_bodies() {
        assert!(matches!(parse_records(""), Err(ParseError::Empty)));
        assert!(matches!(parse_records("404 Not Found"), Err(ParseError::Empty)));
        assert!(matches!(
            parse_records("<html><body/></html>"),
            Err(ParseError::UnexpectedRoot(_))
        ));
        assert!(parse_records("<ajax-response><response>").is_err());
        assert!(parse_records("<ajax-response><response></ajax-response>").is_err());
    }
}
