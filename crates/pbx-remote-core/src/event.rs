//! Events returned by the remote switch.

use std::borrow::Cow;

use indexmap::IndexMap;
use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};

/// Attribute that carries the event type.
pub const EVENT_TYPE_KEY: &str = "event";

/// Type reported for events without an `event` attribute.
pub const UNDEFINED_EVENT_TYPE: &str = "undefined";

/// Ordered string parameters, used for action requests and queued commands.
pub type Arguments = IndexMap<String, String>;

/// One record returned by the switch.
///
/// Attributes keep the order in which the switch sent them. The first value
/// written for a key wins; later writes for the same key are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event {
    attributes: IndexMap<String, String>,
}

impl Event {
    /// Create an empty event.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute unless it is already present.
    ///
    /// Returns `false` when the key already had a value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        match self.attributes.entry(key.into()) {
            indexmap::map::Entry::Occupied(_) => false,
            indexmap::map::Entry::Vacant(slot) => {
                slot.insert(value.into());
                true
            }
        }
    }

    /// Get an attribute value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Whether the attribute is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// The event type, taken from the `event` attribute.
    #[must_use]
    pub fn event_type(&self) -> &str {
        self.get(EVENT_TYPE_KEY).unwrap_or(UNDEFINED_EVENT_TYPE)
    }

    /// All attributes in insertion order.
    #[must_use]
    pub const fn attributes(&self) -> &IndexMap<String, String> {
        &self.attributes
    }

    /// Iterate over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Whether the event has no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Render the event as a flat XML element.
    ///
    /// Each attribute becomes a child element. Characters a key cannot carry
    /// as an element name are replaced with `_`.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut xml = String::from("<event>");
        for (key, value) in self.iter() {
            let name = element_name(key);
            xml.push('<');
            xml.push_str(&name);
            xml.push('>');
            xml.push_str(&escape(value));
            xml.push_str("</");
            xml.push_str(&name);
            xml.push('>');
        }
        xml.push_str("</event>");
        xml
    }
}

fn element_name(key: &str) -> Cow<'_, str> {
    let is_start = |c: char| c == '_' || c.is_alphabetic();
    let is_name = |c: char| is_start(c) || c.is_alphanumeric() || matches!(c, '-' | '.');
    let valid = key.chars().next().is_some_and(is_start) && key.chars().all(is_name);
    if valid {
        return Cow::Borrowed(key);
    }
    let mut name: String = key
        .chars()
        .map(|c| if is_name(c) { c } else { '_' })
        .collect();
    if !name.chars().next().is_some_and(is_start) {
        name.insert(0, '_');
    }
    Cow::Owned(name)
}

impl<K, V> FromIterator<(K, V)> for Event
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut event = Self::new();
        for (key, value) in iter {
            event.set(key, value);
        }
        event
    }
}
