//! Pure functions on node identifiers and pins (§4.1 of the design).
//!
//! Nothing in this module owns any state; it is the lowest layer the rest
//! of the crate builds on, and every function here is total: malformed
//! input produces a best-effort (if nonsensical) result rather than an
//! error. Validity is enforced by callers, not by these codecs.

use crate::node::NodeId;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use std::fmt;

/// An addressable input or output port on a node.
///
/// Position 0 is the default output/input of a node and is the only
/// position most nodes ever use.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Pin {
    /// The node this pin belongs to.
    pub node_id: NodeId,
    /// The pin's position on the node. `0` is the default pin.
    pub position: usize,
}

impl Pin {
    /// A pin at the default (`0`) position of `node_id`.
    pub fn new(node_id: impl Into<NodeId>) -> Self {
        Pin {
            node_id: node_id.into(),
            position: 0,
        }
    }

    /// A pin at an explicit `position` of `node_id`.
    pub fn at(node_id: impl Into<NodeId>, position: usize) -> Self {
        Pin {
            node_id: node_id.into(),
            position,
        }
    }
}

impl<S> From<S> for Pin
where
    S: Into<NodeId>,
{
    fn from(node_id: S) -> Self {
        Pin::new(node_id)
    }
}

impl From<(NodeId, usize)> for Pin {
    fn from((node_id, position): (NodeId, usize)) -> Self {
        Pin::at(node_id, position)
    }
}

/// Matches §6.2: a bare string at position `0`, otherwise a `(nodeId,
/// position)` pair.
impl Serialize for Pin {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.position == 0 {
            serializer.serialize_str(self.node_id.as_str())
        } else {
            (self.node_id.as_str(), self.position).serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Pin {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Bare(String),
            Positional(String, usize),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Bare(node_id) => Ok(Pin::new(NodeId::from(node_id))),
            Repr::Positional(node_id, position) => {
                if position == 0 {
                    Ok(Pin::new(NodeId::from(node_id)))
                } else {
                    Ok(Pin::at(NodeId::from(node_id), position))
                }
            }
        }
    }
}

/// The canonical string form of a [`Pin`].
///
/// Position `0` canonicalizes to the bare [`NodeId`]; any other position is
/// `"{node_id},{position}"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PinId(String);

impl PinId {
    /// Borrow the canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<PinId> for String {
    fn from(id: PinId) -> Self {
        id.0
    }
}

/// Encode a [`Pin`] as its canonical [`PinId`] (§4.1).
pub fn pin_to_pin_id(pin: &Pin) -> PinId {
    if pin.position == 0 {
        PinId(pin.node_id.as_str().to_string())
    } else {
        PinId(format!("{},{}", pin.node_id, pin.position))
    }
}

/// Decode a [`PinId`] back into a [`Pin`].
///
/// A parsed position of `0`, or a missing position, collapses to the bare
/// [`NodeId`] form — the exact inverse of [`pin_to_pin_id`]. A position
/// suffix that fails to parse as a non-negative integer is treated as
/// absent, i.e. the comma and everything after it is taken to be part of
/// the node id.
pub fn pin_id_to_pin(id: &PinId) -> Pin {
    match id.0.rsplit_once(',') {
        Some((node, pos)) => match pos.parse::<usize>() {
            Ok(position) => Pin {
                node_id: NodeId::from(node),
                position,
            },
            Err(_) => Pin::new(NodeId::from(id.0.as_str())),
        },
        None => Pin::new(NodeId::from(id.0.as_str())),
    }
}

/// The [`NodeId`] half of a [`Pin`].
pub fn node_id_of_pin(pin: &Pin) -> &NodeId {
    &pin.node_id
}

/// The `(source, target)` node ids of a pipe's endpoints.
pub fn node_ids_of_pipe(pipe: &crate::pipe::Pipe) -> (&NodeId, &NodeId) {
    (
        node_id_of_pin(&pipe.from),
        node_id_of_pin(&pipe.to),
    )
}

/// The ids of every node that feeds `node_id` directly, i.e. every source
/// of a pipe whose target is some pin on `node_id`.
pub fn parent_node_ids<'a>(
    node_id: &NodeId,
    pipes: impl IntoIterator<Item = &'a crate::pipe::Pipe>,
) -> Vec<NodeId> {
    pipes
        .into_iter()
        .filter(|pipe| node_id_of_pin(&pipe.to) == node_id)
        .map(|pipe| node_id_of_pin(&pipe.from).clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_id_roundtrip_position_zero() {
        let pin = Pin::new("a");
        let id = pin_to_pin_id(&pin);
        assert_eq!(id.as_str(), "a");
        assert_eq!(pin_id_to_pin(&id), pin);
    }

    #[test]
    fn pin_id_roundtrip_nonzero_position() {
        let pin = Pin::at("a", 2);
        let id = pin_to_pin_id(&pin);
        assert_eq!(id.as_str(), "a,2");
        assert_eq!(pin_id_to_pin(&id), pin);
    }

    #[test]
    fn pin_id_canonicalizes_explicit_zero() {
        let id = PinId("a,0".to_string());
        assert_eq!(pin_id_to_pin(&id), Pin::new("a"));
    }

    #[test]
    fn parent_node_ids_filters_by_target() {
        use crate::pipe::Pipe;
        let pipes = vec![
            Pipe::new(Pin::new("a"), Pin::new("b")),
            Pipe::new(Pin::new("c"), Pin::at("b", 1)),
            Pipe::new(Pin::new("a"), Pin::new("d")),
        ];
        let parents = parent_node_ids(&NodeId::from("b"), &pipes);
        assert_eq!(parents, vec![NodeId::from("a"), NodeId::from("c")]);
    }

    #[test]
    fn pin_serializes_bare_string_at_position_zero() {
        let pin = Pin::new("a");
        let value = serde_json::to_value(&pin).unwrap();
        assert_eq!(value, serde_json::json!("a"));
        let back: Pin = serde_json::from_value(value).unwrap();
        assert_eq!(back, pin);
    }

    #[test]
    fn pin_serializes_pair_at_nonzero_position() {
        let pin = Pin::at("a", 3);
        let value = serde_json::to_value(&pin).unwrap();
        assert_eq!(value, serde_json::json!(["a", 3]));
        let back: Pin = serde_json::from_value(value).unwrap();
        assert_eq!(back, pin);
    }
}
