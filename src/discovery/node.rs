//! Backend node identity and discovery wire formats.
//!
//! # Responsibilities
//! - Represent a backend process (`processId` + reachable address)
//! - Parse membership entries (`"<processId>/<address>"`)
//! - Parse pub/sub change notifications (`"<action>,<processId>/<address>"`)

use std::fmt;

/// A backend server process announced in the shared registry.
///
/// The gateway never creates nodes; it only observes the entries backends
/// write. `address` is `host:port` as seen from the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    pub process_id: String,
    pub address: String,
}

impl Node {
    pub fn new(process_id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            process_id: process_id.into(),
            address: address.into(),
        }
    }

    /// Parse a membership entry of the form `"<processId>/<address>"`.
    ///
    /// Entries missing either part are rejected; callers log and skip them.
    pub fn parse(entry: &str) -> Option<Self> {
        let (process_id, address) = entry.split_once('/')?;
        if process_id.is_empty() || address.is_empty() {
            return None;
        }
        Some(Self::new(process_id, address))
    }

    /// The membership-set entry this node is keyed by.
    pub fn entry(&self) -> String {
        format!("{}/{}", self.process_id, self.address)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.process_id, self.address)
    }
}

/// Membership change kind carried on the discovery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Add,
    Remove,
}

/// A single membership change published on the discovery channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryEvent {
    pub action: Action,
    pub node: Node,
}

impl DiscoveryEvent {
    /// Parse a channel payload of the form `"<action>,<processId>/<address>"`.
    ///
    /// Payloads wrapped in JSON string quotes (legacy publishers) are
    /// tolerated by trimming before parsing.
    pub fn parse(payload: &str) -> Option<Self> {
        let payload = payload.trim().trim_matches('"');
        let (action, entry) = payload.split_once(',')?;
        let action = match action {
            "add" => Action::Add,
            "remove" => Action::Remove,
            _ => return None,
        };
        let node = Node::parse(entry)?;
        Some(Self { action, node })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_node() {
        let node = Node::parse("p1/10.0.0.1:2567").unwrap();
        assert_eq!(node.process_id, "p1");
        assert_eq!(node.address, "10.0.0.1:2567");
        assert_eq!(node.entry(), "p1/10.0.0.1:2567");
    }

    #[test]
    fn test_parse_node_rejects_malformed() {
        assert!(Node::parse("p1").is_none());
        assert!(Node::parse("/10.0.0.1:2567").is_none());
        assert!(Node::parse("p1/").is_none());
        assert!(Node::parse("").is_none());
    }

    #[test]
    fn test_parse_event() {
        let event = DiscoveryEvent::parse("add,p1/10.0.0.1:2567").unwrap();
        assert_eq!(event.action, Action::Add);
        assert_eq!(event.node.process_id, "p1");

        let event = DiscoveryEvent::parse("remove,p2/10.0.0.2:2567").unwrap();
        assert_eq!(event.action, Action::Remove);
    }

    #[test]
    fn test_parse_event_tolerates_quoted_payload() {
        let event = DiscoveryEvent::parse("\"add,p1/10.0.0.1:2567\"").unwrap();
        assert_eq!(event.action, Action::Add);
        assert_eq!(event.node.address, "10.0.0.1:2567");
    }

    #[test]
    fn test_parse_event_rejects_unknown_action() {
        assert!(DiscoveryEvent::parse("update,p1/10.0.0.1:2567").is_none());
        assert!(DiscoveryEvent::parse("add").is_none());
    }
}
