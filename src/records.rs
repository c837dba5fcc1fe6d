//! Records produced from SharePoint responses.
//!
//! All records are immutable once built and serialize with camelCase keys.

use crate::error::SpResult;
use crate::parser::{find_elements, XmlElement};
use crate::transport::RawResponse;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Editor descriptor delimiter between the id and the rest.
pub const EDITOR_ID_DELIMITER: &str = ";#";

/// Convert a field name to camelCase.
///
/// Runs of `-`, `_`, `.` or whitespace are dropped and the character after
/// them is uppercased. A leading uppercase letter (or one following `/`) is
/// lowercased, so `EMail` becomes `eMail` and `Title` becomes `title`.
pub fn camelize(name: &str) -> String {
    let mut joined = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '-' || c == '_' || c == '.' || c.is_whitespace() {
            upper_next = true;
        } else if upper_next {
            joined.extend(c.to_uppercase());
            upper_next = false;
        } else {
            joined.push(c);
        }
    }

    let mut out = String::with_capacity(joined.len());
    let mut lower_next = true;
    for c in joined.chars() {
        if lower_next && c.is_ascii_uppercase() {
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
        lower_next = c == '/';
    }
    out
}

/// Map a current-user field name to its record key.
pub fn current_user_key(field: &str) -> String {
    if field == "ID" {
        "id".to_string()
    } else {
        camelize(field)
    }
}

/// The current user, keyed by camelized field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CurrentUser {
    fields: BTreeMap<String, Value>,
}

impl CurrentUser {
    /// Build from raw field names as returned by the transport.
    ///
    /// When two names map to the same key the later one wins.
    pub fn from_fields<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(key, value)| (current_user_key(key.as_ref()), value))
                .collect(),
        }
    }

    /// Look up a field by its camelized key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The `ID` field.
    pub fn id(&self) -> Option<&Value> {
        self.get("id")
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A SharePoint group the user belongs to.
///
/// Values are kept exactly as the attributes read; `owner_is_user` stays
/// `"True"`/`"False"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub owner_id: Option<String>,
    pub owner_is_user: Option<String>,
}

impl Group {
    /// Map a `Group` element.
    pub fn from_element(element: &XmlElement) -> Self {
        let attr = |name: &str| element.attr(name).map(String::from);
        Self {
            id: attr("ID"),
            name: attr("Name"),
            description: attr("Description"),
            owner_id: attr("OwnerID"),
            owner_is_user: attr("OwnerIsUser"),
        }
    }

    /// Every group in `response.response_xml`, document order.
    ///
    /// A response without an XML document yields no groups.
    pub fn collect_from(response: &RawResponse) -> SpResult<Vec<Group>> {
        let Some(xml) = response.response_xml.as_deref() else {
            return Ok(Vec::new());
        };
        Ok(find_elements(xml, "Group")?
            .iter()
            .map(Group::from_element)
            .collect())
    }
}

/// One historical value of a list item field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldVersion {
    /// The value of the field
    pub value: Option<String>,
    /// When the version was modified, e.g. `2015-11-13T10:20:02Z`
    pub modified: Option<String>,
    /// Editor descriptor, e.g.
    /// `11;#Test User,#DOMAIN\testuser,#test.user@example.com,#,#Test User`
    pub editor: Option<String>,
}

impl FieldVersion {
    pub fn new(value: Option<String>, modified: Option<String>, editor: Option<String>) -> Self {
        Self {
            value,
            modified,
            editor,
        }
    }

    /// Map a `Version` element, reading the attribute named `field_name`.
    pub fn from_element(element: &XmlElement, field_name: &str) -> Self {
        Self::new(
            element.attr(field_name).map(String::from),
            element.attr("Modified").map(String::from),
            element.attr("Editor").map(String::from),
        )
    }

    /// Every version in `response.response_text`, in the order returned.
    pub fn collect_from(response: &RawResponse, field_name: &str) -> SpResult<Vec<FieldVersion>> {
        let Some(text) = response.response_text.as_deref() else {
            return Ok(Vec::new());
        };
        Ok(find_elements(text, "Version")?
            .iter()
            .map(|element| FieldVersion::from_element(element, field_name))
            .collect())
    }

    /// Epoch milliseconds of `modified`; `None` when unset or unparseable.
    pub fn modified_epoch_millis(&self) -> Option<i64> {
        self.modified.as_deref().and_then(parse_epoch_millis)
    }

    /// Id of the editor: everything before the first `;#`.
    pub fn editor_id(&self) -> Option<&str> {
        match self.editor.as_deref() {
            Some(editor) if !editor.is_empty() => editor.split(EDITOR_ID_DELIMITER).next(),
            _ => None,
        }
    }

    /// The editor string split into its parts.
    pub fn editor_descriptor(&self) -> Option<EditorDescriptor> {
        self.editor.as_deref().and_then(EditorDescriptor::parse)
    }
}

/// Parsed editor descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorDescriptor {
    pub id: String,
    pub display_name: Option<String>,
    pub login: Option<String>,
    pub email: Option<String>,
}

impl EditorDescriptor {
    /// Parse `<id>;#<displayName>,#<login>,#<email>,#...`.
    pub fn parse(editor: &str) -> Option<Self> {
        if editor.is_empty() {
            return None;
        }
        let (id, rest) = match editor.split_once(EDITOR_ID_DELIMITER) {
            Some((id, rest)) => (id, Some(rest)),
            None => (editor, None),
        };
        let mut parts = rest.into_iter().flat_map(|rest| rest.split(",#"));
        let mut next = || parts.next().filter(|part| !part.is_empty()).map(String::from);
        let display_name = next();
        let login = next();
        let email = next();
        Some(Self {
            id: id.to_string(),
            display_name,
            login,
            email,
        })
    }
}

/// Parse an ISO-8601 timestamp into epoch milliseconds.
///
/// Timestamps without an offset are taken as UTC.
pub fn parse_epoch_millis(timestamp: &str) -> Option<i64> {
    let timestamp = timestamp.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc().timestamp_millis());
    }
    NaiveDate::parse_from_str(timestamp, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}
