use std::cmp::Ordering;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A typed, ordered attribute-bag record emitted by the settlement engine.
///
/// Attributes are stored as an ordered sequence of single-key pairs, not a
/// map: real-node emission order for a given event type is part of the wire
/// contract and must survive in the log even though equality (used by the
/// differential replay harness) ignores it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: String,
    pub attributes: Vec<(String, String)>,
    pub height: Option<u64>,
}

impl Event {
    pub fn new(event_type: impl Into<String>, attributes: Vec<(String, String)>) -> Self {
        Self { event_type: event_type.into(), attributes, height: None }
    }

    pub fn at_height(mut self, height: u64) -> Self {
        self.height = Some(height);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Normalized attribute multiset used for equality: upper-cased values,
    /// sorted by key, with the `outbound` event's `id` attribute excluded
    /// (outbound ids are assigned independently by the simulator and the
    /// live node and are not part of the contract this equality checks).
    fn canonical_attrs(&self) -> Vec<(String, String)> {
        let mut attrs: Vec<(String, String)> = self
            .attributes
            .iter()
            .filter(|(k, _)| !(self.event_type == "outbound" && k == "id"))
            .map(|(k, v)| (k.clone(), v.to_uppercase()))
            .collect();
        attrs.sort();
        attrs
    }

    /// A stable string digest of the canonical attributes, used both for
    /// equality and for the `(type, hash)` ordering used to canonicalize a
    /// window of events before differential comparison.
    pub fn canonical_hash(&self) -> String {
        let mut s = String::new();
        for (k, v) in self.canonical_attrs() {
            s.push_str(&k);
            s.push('=');
            s.push_str(&v);
            s.push(';');
        }
        s
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attrs = self
            .attributes
            .iter()
            .map(|(k, v)| format!("{{'{k}': '{v}'}}"))
            .collect::<Vec<_>>()
            .join(" ");
        write!(f, "Event {} | {}", self.event_type, attrs)
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.event_type == other.event_type && self.canonical_hash() == other.canonical_hash()
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.event_type.as_str(), self.canonical_hash())
            .cmp(&(other.event_type.as_str(), other.canonical_hash()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_attribute_order_and_case() {
        let a = Event::new(
            "swap",
            vec![("pool".into(), "BNB.BNB".into()), ("swap_slip".into(), "10".into())],
        );
        let b = Event::new(
            "swap",
            vec![("swap_slip".into(), "10".into()), ("pool".into(), "bnb.bnb".into())],
        );
        assert_eq!(a, b);
    }

    #[test]
    fn outbound_equality_ignores_id() {
        let a = Event::new(
            "outbound",
            vec![("id".into(), "AAA".into()), ("coin".into(), "1 BNB.BNB".into())],
        );
        let b = Event::new(
            "outbound",
            vec![("id".into(), "BBB".into()), ("coin".into(), "1 BNB.BNB".into())],
        );
        assert_eq!(a, b);
    }

    #[test]
    fn non_outbound_events_are_sensitive_to_every_attribute() {
        let a = Event::new("fee", vec![("id".into(), "AAA".into())]);
        let b = Event::new("fee", vec![("id".into(), "BBB".into())]);
        assert_ne!(a, b);
    }

    #[test]
    fn ordering_is_type_then_hash() {
        let a = Event::new("donate", vec![]);
        let b = Event::new("swap", vec![]);
        assert!(a < b);
    }
}
