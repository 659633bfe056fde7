//! Inbound host messages.
//!
//! The host posts maps of the form `{type, data, id?}`. [`Request::decode`]
//! turns one into a typed request, or explains why it was dropped.

use mpvjs_core::HostValue;
use thiserror::Error;

/// A decoded host request.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Run a command. A string payload has already been wrapped into a
    /// one-element array.
    Command {
        /// Reply id.
        id: u64,
        /// Command arguments as they will be handed to libmpv.
        args: HostValue,
    },
    /// Set a property to a scalar value.
    SetProperty {
        /// Reply id.
        id: u64,
        /// Property name.
        name: String,
        /// New value; only scalars reach libmpv.
        value: HostValue,
    },
    /// Report changes of a property, tagged with `id`.
    ObserveProperty {
        /// Observation id.
        id: u64,
        /// Property name.
        name: String,
    },
    /// Cancel the observations registered under `id`.
    UnobserveProperty {
        /// Observation id, taken from `data`.
        id: u64,
    },
    /// Read a property asynchronously.
    GetProperty {
        /// Reply id.
        id: u64,
        /// Property name.
        name: String,
    },
    /// Resume a paused hook.
    HookContinue {
        /// Hook id from the `hook` event.
        id: u64,
    },
    /// Register a hook.
    HookAdd {
        /// Reply id, taken from `data.id`.
        id: u64,
        /// Hook name such as `on_load`.
        name: String,
        /// Hook priority.
        priority: i32,
    },
    /// Set an option synchronously.
    SetOption {
        /// Option name.
        name: String,
        /// Option value.
        value: String,
    },
}

/// Why a message was not turned into a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejected {
    /// The message is not a map.
    #[error("message is not a map")]
    NotAMap,
    /// `type` is missing or not a string.
    #[error("message has no type")]
    MissingType,
    /// `type` names no known request.
    #[error("unknown message type '{0}'")]
    UnknownType(String),
    /// The payload does not have the shape the type requires.
    #[error("'{kind}' payload has no usable {field}")]
    BadPayload {
        /// Message type.
        kind: &'static str,
        /// What was missing.
        field: &'static str,
    },
}

/// A correlation id from a number; anything else reads as 0.
///
/// Ids are unsigned 64-bit values. Negative numbers read as 0, doubles are
/// truncated toward zero, and doubles past `u64::MAX` saturate. Ids above
/// `i64::MAX` can only arrive as doubles, so they carry double precision;
/// [`id_value`](crate::event::id_value) echoes them back as the same double.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn read_id(value: Option<&HostValue>) -> u64 {
    match value {
        Some(HostValue::Int(id)) => u64::try_from(*id).unwrap_or(0),
        Some(HostValue::Double(id)) if *id >= 0.0 => *id as u64,
        _ => 0,
    }
}

fn string_field(
    value: Option<&HostValue>,
    kind: &'static str,
    field: &'static str,
) -> Result<String, Rejected> {
    value
        .and_then(HostValue::as_str)
        .map(str::to_owned)
        .ok_or(Rejected::BadPayload { kind, field })
}

impl Request {
    /// Decode one host message.
    ///
    /// # Errors
    ///
    /// Returns why the message cannot be acted on; callers drop such messages.
    pub fn decode(message: &HostValue) -> Result<Self, Rejected> {
        let map = message.as_map().ok_or(Rejected::NotAMap)?;
        let kind = map
            .get("type")
            .and_then(HostValue::as_str)
            .ok_or(Rejected::MissingType)?;
        let data = map.get("data");
        let id = read_id(map.get("id"));

        let request = match kind {
            "command" => Self::Command {
                id,
                args: match data {
                    Some(HostValue::String(command)) => {
                        HostValue::Array(vec![HostValue::String(command.clone())])
                    }
                    Some(other) => other.clone(),
                    None => HostValue::Null,
                },
            },
            "set_property" => Self::SetProperty {
                id,
                name: string_field(
                    data.and_then(|data| data.get("name")),
                    "set_property",
                    "name",
                )?,
                value: data
                    .and_then(|data| data.get("value"))
                    .cloned()
                    .unwrap_or_default(),
            },
            "observe_property" => Self::ObserveProperty {
                id,
                name: string_field(data, "observe_property", "name")?,
            },
            "unobserve_property" => Self::UnobserveProperty { id: read_id(data) },
            "get_property_async" => Self::GetProperty {
                id,
                name: string_field(data, "get_property_async", "name")?,
            },
            "hook_continue" => Self::HookContinue { id: read_id(data) },
            "hook_add" => {
                let data = data.ok_or(Rejected::BadPayload {
                    kind: "hook_add",
                    field: "payload",
                })?;
                Self::HookAdd {
                    id: read_id(data.get("id")),
                    name: string_field(data.get("name"), "hook_add", "name")?,
                    priority: data
                        .get("priority")
                        .and_then(HostValue::as_i64)
                        .and_then(|priority| i32::try_from(priority).ok())
                        .unwrap_or(0),
                }
            }
            "set_option" => Self::SetOption {
                name: string_field(data.and_then(|data| data.get("name")), "set_option", "name")?,
                value: string_field(
                    data.and_then(|data| data.get("value")),
                    "set_option",
                    "value",
                )?,
            },
            other => return Err(Rejected::UnknownType(other.to_owned())),
        };
        Ok(request)
    }
}
