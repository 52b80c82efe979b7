//! A minimal dataflow programming engine.
//!
//! A [`Dflow`] is a directed graph of named [`nodes`](node) connected by
//! [`pipes`](pipe::Pipe). Each node is bound to either a [`callable`] (sync
//! or async), a nested graph template (a *sub-graph*), or nothing (an I/O
//! marker, or simply unbound). Calling [`Dflow::run`] or
//! [`Dflow::run_async`] executes every bound node exactly once, in
//! dependency order, threading outputs through [`pipe`]s into downstream
//! inputs and recording every node's result in the engine's output cache.

pub use callable::{Callable, Compiler, Context};
pub use engine::Dflow;
pub use error::DflowError;
pub use id::{Pin, PinId};
pub use node::{Node, NodeId};
pub use pipe::Pipe;
pub use value::Value;

pub mod callable;
mod dispatch;
pub mod engine;
pub mod error;
pub mod id;
pub mod node;
pub mod pipe;
mod schedule;
pub mod serde_format;
mod store;
mod subgraph;
pub mod value;
