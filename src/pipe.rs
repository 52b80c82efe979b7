//! The directed edge between two nodes' pins.

use crate::id::Pin;
use serde::{Deserialize, Serialize};

/// A directed connection from an output [`Pin`] to an input [`Pin`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pipe {
    /// The output pin this pipe draws its value from.
    pub from: Pin,
    /// The input pin this pipe feeds.
    pub to: Pin,
}

impl Pipe {
    /// Construct a pipe from its two endpoints.
    pub fn new(from: impl Into<Pin>, to: impl Into<Pin>) -> Self {
        Pipe {
            from: from.into(),
            to: to.into(),
        }
    }
}
