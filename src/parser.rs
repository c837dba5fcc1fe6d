//! XML scanning for SharePoint web-service responses.
//!
//! Uses quick-xml which is safe against XXE by default (doesn't expand entities).
//! Elements are matched by local name so that prefixed and default-namespace
//! responses scan the same way.

use crate::error::{SoapFault, SpError, SpResult};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// An element located in a response document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    /// Attributes in source order, values unescaped
    pub attributes: Vec<(String, String)>,
}

impl XmlElement {
    /// Attribute access by qualified name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Find every element whose local name is `tag`, in document order.
pub fn find_elements(xml: &str, tag: &str) -> SpResult<Vec<XmlElement>> {
    check_declarations(xml)?;

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut found = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                if local_name_str(e) == tag {
                    found.push(XmlElement {
                        attributes: read_attributes(e)?,
                    });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SpError::XmlParse(format!(
                    "error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }

        buf.clear();
    }

    Ok(found)
}

/// Extract a SOAP Fault (1.1 or 1.2) from a response body, if one is present.
///
/// Malformed documents yield `None`.
pub fn detect_soap_fault(xml: &str) -> Option<SoapFault> {
    if check_declarations(xml).is_err() {
        return None;
    }

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut in_fault = false;
    let mut current = String::new();
    let mut fault = SoapFault {
        code: None,
        reason: None,
    };
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = local_name_str(e);
                if name == "Fault" {
                    in_fault = true;
                }
                current = name;
            }
            Ok(Event::Text(ref e)) if in_fault => {
                let text = e.unescape().ok()?.into_owned();
                match current.as_str() {
                    "faultcode" | "Value" if fault.code.is_none() => fault.code = Some(text),
                    "faultstring" | "Text" if fault.reason.is_none() => fault.reason = Some(text),
                    _ => {}
                }
            }
            Ok(Event::End(ref e)) => {
                if e.local_name().as_ref() == b"Fault" {
                    break;
                }
                current.clear();
            }
            Ok(Event::Eof) => break,
            Err(_) => return None,
            _ => {}
        }

        buf.clear();
    }

    in_fault.then_some(fault)
}

/// Reject DOCTYPE and entity declarations outright.
fn check_declarations(xml: &str) -> SpResult<()> {
    if xml.contains("<!DOCTYPE") || xml.contains("<!doctype") {
        return Err(SpError::XmlParse(
            "DOCTYPE declarations are not allowed".to_string(),
        ));
    }

    if xml.contains("<!ENTITY") || xml.contains("<!entity") {
        return Err(SpError::XmlParse(
            "Entity declarations are not allowed".to_string(),
        ));
    }

    Ok(())
}

/// Extract local name from element.
fn local_name_str(e: &BytesStart) -> String {
    let name = e.local_name();
    std::str::from_utf8(name.as_ref())
        .unwrap_or("")
        .to_string()
}

fn read_attributes(e: &BytesStart) -> SpResult<Vec<(String, String)>> {
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| SpError::XmlParse(format!("bad attribute: {}", err)))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|err| SpError::XmlParse(format!("attribute name is not UTF-8: {}", err)))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|err| SpError::XmlParse(format!("attribute `{}`: {}", key, err)))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(attributes)
}
