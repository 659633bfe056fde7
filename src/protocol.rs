//! Carrying decoded requests out against an [`Engine`].

use mpvjs_core::{HostValue, Map, OwnedNode};
use tracing::debug;

use crate::engine::{Engine, PropertyValue};
use crate::error::ErrorCode;
use crate::event::id_value;
use crate::message::Request;

/// Error text of a command whose arguments converted to nothing.
pub const BAD_COMMAND_FORMAT: &str = "bad command format";

/// A `command-reply` reporting a command that never reached libmpv.
#[must_use]
pub fn command_failure(id: u64, error: impl Into<String>) -> HostValue {
    let mut reply = Map::with_capacity(3);
    reply.insert("event", "command-reply");
    reply.insert("id", id_value(id));
    reply.insert("error", error.into());
    HostValue::Map(reply)
}

/// Perform `request`, returning the message to post back if there is one.
///
/// Only commands report failures. Every other call that libmpv rejects is
/// absorbed; the host learns about it through the absence of a reply event.
pub fn dispatch<E: Engine + ?Sized>(engine: &E, request: Request) -> Option<HostValue> {
    match request {
        Request::Command { id, args } => {
            let mut tree = OwnedNode::from_host(&args);
            if tree.is_none() {
                debug!(id, "command arguments converted to nothing");
                return Some(command_failure(id, BAD_COMMAND_FORMAT));
            }
            engine
                .command_async(id, &mut tree)
                .err()
                .map(|code| command_failure(id, code.code().to_string()))
        }
        Request::SetProperty { id, name, value } => {
            match PropertyValue::from_host(&value) {
                Some(value) => absorb("set_property", engine.set_property_async(id, &name, value)),
                None => debug!(name = %name, kind = ?value.kind(), "property value is not a scalar"),
            }
            None
        }
        Request::ObserveProperty { id, name } => {
            absorb("observe_property", engine.observe_property(id, &name));
            None
        }
        Request::UnobserveProperty { id } => {
            absorb("unobserve_property", engine.unobserve_property(id));
            None
        }
        Request::GetProperty { id, name } => {
            absorb("get_property_async", engine.get_property_async(id, &name));
            None
        }
        Request::HookContinue { id } => {
            absorb("hook_continue", engine.hook_continue(id));
            None
        }
        Request::HookAdd { id, name, priority } => {
            absorb("hook_add", engine.hook_add(id, &name, priority));
            None
        }
        Request::SetOption { name, value } => {
            absorb("set_option", engine.set_option_string(&name, &value));
            None
        }
    }
}

fn absorb<T>(call: &'static str, result: Result<T, ErrorCode>) {
    if let Err(code) = result {
        debug!(call, %code, "engine call failed");
    }
}
