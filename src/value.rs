//! The opaque value type threaded through the output cache.

/// A value produced by a node and stored in the output cache.
///
/// Callables are opaque to the engine: it neither inspects nor validates
/// what they return, only stores and forwards it. `serde_json::Value`
/// covers every shape a callable plausibly produces (numbers, strings,
/// bools, arrays, objects, null) and is already on the dependency list for
/// the persistence format of the graph itself, so it is reused here rather
/// than introducing a second "any value" type.
pub type Value = serde_json::Value;
