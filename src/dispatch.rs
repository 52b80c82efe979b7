//! The node dispatcher (§4.4): gathers argument values, invokes the bound
//! callable under a resolved receiver, and records the result.

use crate::error::DflowError;
use crate::node::NodeId;
use crate::store::Store;

/// Dispatch outcome for a single node, prior to any sub-graph handling.
pub(crate) enum Dispatched {
    /// No callable was bound to this node's name; nothing to do.
    Unbound,
    /// A callable ran and its result was written to the output cache.
    Ran,
    /// The bound callable is a generator variant, recognized but not
    /// executed (§4.4).
    Inert,
    /// The bound callable is `Async`, but this dispatch happened on the
    /// synchronous path (`run`), which cannot await it. Callers are
    /// expected to have routed via `has_async_nodes` to `run_async`
    /// instead; this is a fallback that skips the node rather than
    /// blocking or panicking.
    AsyncSkipped,
}

/// Dispatch the synchronous portion of §4.4 for `node_id`/`name`: gather
/// `arg_values`, and if `name` has a `Sync` callable, invoke it and write
/// its result. Returns [`Dispatched::Ran`] without touching the node if
/// the callable is `Async` — callers on the sync path (`run`) must treat
/// that as a logic error in the caller's own graph-inspection, since
/// `has_async_nodes` should have routed them to `run_async` instead.
pub(crate) fn dispatch_sync(
    store: &mut Store,
    node_id: &NodeId,
    name: &str,
) -> Result<Dispatched, DflowError> {
    let Some(binding) = store.binding(name).cloned() else {
        return Ok(Dispatched::Unbound);
    };
    log::trace!("dispatching node `{node_id}` ({name})");
    let args = store.arg_values(node_id)?;
    let receiver = store.context.resolve(node_id, name).cloned();

    match binding.callable {
        crate::callable::Callable::Sync(f) => {
            let value = f(&args, receiver.as_ref()).map_err(|message| DflowError::NodeExecution {
                node_id: node_id.clone(),
                node_name: name.to_string(),
                node_error_message: message,
            })?;
            store.write_output(node_id, value);
            Ok(Dispatched::Ran)
        }
        crate::callable::Callable::Async(_) => {
            log::error!(
                "node `{node_id}` ({name}) is bound to an async callable but was dispatched via \
                 the synchronous `run`; use `run_async` for graphs where `has_async_nodes` is true"
            );
            Ok(Dispatched::AsyncSkipped)
        }
        crate::callable::Callable::Generator(_) | crate::callable::Callable::AsyncGenerator(_) => {
            Ok(Dispatched::Inert)
        }
    }
}

/// Dispatch the full §4.4 protocol, `.await`ing an `Async` callable
/// before proceeding. Used by `run_async`.
pub(crate) async fn dispatch_async(
    store: &mut Store,
    node_id: &NodeId,
    name: &str,
) -> Result<Dispatched, DflowError> {
    let Some(binding) = store.binding(name).cloned() else {
        return Ok(Dispatched::Unbound);
    };
    log::trace!("dispatching node `{node_id}` ({name})");
    let args = store.arg_values(node_id)?;
    let receiver = store.context.resolve(node_id, name).cloned();

    match binding.callable {
        crate::callable::Callable::Sync(f) => {
            let value = f(&args, receiver.as_ref()).map_err(|message| DflowError::NodeExecution {
                node_id: node_id.clone(),
                node_name: name.to_string(),
                node_error_message: message,
            })?;
            store.write_output(node_id, value);
            Ok(Dispatched::Ran)
        }
        crate::callable::Callable::Async(f) => {
            let value = f(&args, receiver.as_ref())
                .await
                .map_err(|message| DflowError::NodeExecution {
                    node_id: node_id.clone(),
                    node_name: name.to_string(),
                    node_error_message: message,
                })?;
            store.write_output(node_id, value);
            Ok(Dispatched::Ran)
        }
        crate::callable::Callable::Generator(_) | crate::callable::Callable::AsyncGenerator(_) => {
            Ok(Dispatched::Inert)
        }
    }
}
