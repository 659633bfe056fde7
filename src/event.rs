//! Outbound encoding of libmpv events.
//!
//! Every event becomes a map with at least `{event: name}`. Events carrying a
//! negative status add a decoded `error`, replies to tagged requests add `id`,
//! and each event kind adds the fields of its payload.

use core::ffi::{c_char, c_int};

use mpvjs_core::sys::{
    MPV_END_FILE_REASON_EOF, MPV_END_FILE_REASON_ERROR, MPV_END_FILE_REASON_QUIT,
    MPV_END_FILE_REASON_REDIRECT, MPV_END_FILE_REASON_STOP, MPV_EVENT_CLIENT_MESSAGE,
    MPV_EVENT_COMMAND_REPLY, MPV_EVENT_END_FILE, MPV_EVENT_GET_PROPERTY_REPLY, MPV_EVENT_HOOK,
    MPV_EVENT_LOG_MESSAGE, MPV_EVENT_PROPERTY_CHANGE, MPV_EVENT_START_FILE, MPV_FORMAT_DOUBLE,
    MPV_FORMAT_FLAG, MPV_FORMAT_INT64, MPV_FORMAT_NODE, MPV_FORMAT_OSD_STRING, MPV_FORMAT_STRING,
    mpv_end_file_reason, mpv_event, mpv_event_client_message, mpv_event_command,
    mpv_event_end_file, mpv_event_hook, mpv_event_log_message, mpv_event_property,
    mpv_event_start_file, mpv_node,
};
use mpvjs_core::{HostValue, Map, node_to_host, read_c_str};

use crate::engine::Engine;

/// Host form of a correlation id: an `Int` when it fits, else a `Double`, so
/// an id read by [`read_id`](crate::message::read_id) comes back as the
/// number the host sent.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn id_value(id: u64) -> HostValue {
    i64::try_from(id).map_or(HostValue::Double(id as f64), HostValue::Int)
}

/// The `reason` string of an end-file event.
#[must_use]
pub const fn end_file_reason(reason: mpv_end_file_reason) -> &'static str {
    match reason {
        MPV_END_FILE_REASON_EOF => "eof",
        MPV_END_FILE_REASON_STOP => "stop",
        MPV_END_FILE_REASON_QUIT => "quit",
        MPV_END_FILE_REASON_ERROR => "error",
        MPV_END_FILE_REASON_REDIRECT => "redirect",
        _ => "unknown",
    }
}

fn c_text(ptr: *const c_char) -> HostValue {
    // SAFETY: callers pass pointers from a live event payload.
    unsafe { read_c_str(ptr) }.map_or(HostValue::Null, HostValue::String)
}

/// Encode `event` under the name libmpv reported for it.
///
/// # Safety
///
/// `event.data` must be null or point to the payload type libmpv uses for
/// `event.event_id`, valid for the duration of the call.
pub unsafe fn encode_event<E: Engine + ?Sized>(
    engine: &E,
    event: &mpv_event,
    name: &str,
) -> HostValue {
    let mut out = Map::new();
    out.insert("event", name);

    if event.error < 0 {
        out.insert("error", engine.error_string(event.error));
    }
    if event.reply_userdata != 0 {
        out.insert("id", id_value(event.reply_userdata));
    }

    if event.data.is_null() {
        return HostValue::Map(out);
    }

    // SAFETY: the payload type matches the event id per the caller's contract.
    unsafe {
        match event.event_id {
            MPV_EVENT_START_FILE => {
                let payload = &*event.data.cast::<mpv_event_start_file>();
                out.insert("playlist_entry_id", payload.playlist_entry_id);
            }
            MPV_EVENT_END_FILE => {
                let payload = &*event.data.cast::<mpv_event_end_file>();
                out.insert("reason", end_file_reason(payload.reason));
                out.insert("playlist_entry_id", payload.playlist_entry_id);
                if payload.playlist_insert_id != 0 {
                    out.insert("playlist_insert_id", payload.playlist_insert_id);
                    out.insert(
                        "playlist_insert_num_entries",
                        payload.playlist_insert_num_entries,
                    );
                }
                if payload.reason == MPV_END_FILE_REASON_ERROR {
                    out.insert("file_error", engine.error_string(payload.error));
                }
            }
            MPV_EVENT_LOG_MESSAGE => {
                let payload = &*event.data.cast::<mpv_event_log_message>();
                out.insert("prefix", c_text(payload.prefix));
                out.insert("level", c_text(payload.level));
                out.insert("text", c_text(payload.text));
            }
            MPV_EVENT_CLIENT_MESSAGE => {
                let payload = &*event.data.cast::<mpv_event_client_message>();
                out.insert("args", client_args(payload));
            }
            MPV_EVENT_GET_PROPERTY_REPLY | MPV_EVENT_PROPERTY_CHANGE => {
                let payload = &*event.data.cast::<mpv_event_property>();
                out.insert("name", c_text(payload.name));
                if let Some(data) = property_data(payload) {
                    out.insert("data", data);
                }
            }
            MPV_EVENT_COMMAND_REPLY => {
                let payload = &*event.data.cast::<mpv_event_command>();
                out.insert("result", node_to_host(&payload.result));
            }
            MPV_EVENT_HOOK => {
                let payload = &*event.data.cast::<mpv_event_hook>();
                out.insert("hook_id", id_value(payload.id));
            }
            _ => {}
        }
    }

    HostValue::Map(out)
}

unsafe fn client_args(payload: &mpv_event_client_message) -> HostValue {
    let count = usize::try_from(payload.num_args).unwrap_or(0);
    if payload.args.is_null() {
        return HostValue::Array(Vec::new());
    }
    // SAFETY: `args` holds `num_args` string pointers.
    let args = unsafe { core::slice::from_raw_parts(payload.args, count) };
    HostValue::Array(args.iter().map(|arg| c_text(*arg)).collect())
}

/// The `data` field of a property event, or `None` when the property has no
/// value in a format the host can represent.
unsafe fn property_data(payload: &mpv_event_property) -> Option<HostValue> {
    if payload.data.is_null() {
        return None;
    }
    // SAFETY: `data` points at a value of `format`.
    unsafe {
        Some(match payload.format {
            MPV_FORMAT_NODE => node_to_host(&*payload.data.cast::<mpv_node>()),
            MPV_FORMAT_DOUBLE => HostValue::Double(*payload.data.cast::<f64>()),
            MPV_FORMAT_FLAG => HostValue::Bool(*payload.data.cast::<c_int>() != 0),
            MPV_FORMAT_INT64 => HostValue::Int(*payload.data.cast::<i64>()),
            MPV_FORMAT_STRING | MPV_FORMAT_OSD_STRING => {
                c_text(*payload.data.cast::<*const c_char>())
            }
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockEngine;
    use core::ffi::c_void;
    use core::ptr;
    use mpvjs_core::OwnedNode;
    use mpvjs_core::sys::{
        MPV_EVENT_FILE_LOADED, MPV_EVENT_SHUTDOWN, MPV_FORMAT_NONE, mpv_node_u,
    };
    use serde_json::json;

    fn event_with<T>(event_id: i32, payload: &mut T) -> mpv_event {
        mpv_event {
            event_id,
            error: 0,
            reply_userdata: 0,
            data: ptr::from_mut(payload).cast::<c_void>(),
        }
    }

    fn encode(event: &mpv_event, name: &str) -> HostValue {
        unsafe { encode_event(&MockEngine::new(), event, name) }
    }

    #[test]
    fn bare_events_carry_only_their_name() {
        let message = encode(&mpv_event::empty(MPV_EVENT_SHUTDOWN), "shutdown");
        assert_eq!(message, HostValue::from(json!({"event": "shutdown"})));
    }

    #[test]
    fn errors_and_ids_are_attached() {
        let mut event = mpv_event::empty(MPV_EVENT_FILE_LOADED);
        event.error = -13;
        event.reply_userdata = 9;
        assert_eq!(
            encode(&event, "file-loaded"),
            HostValue::from(json!({"event": "file-loaded", "error": "loading failed", "id": 9}))
        );
    }

    #[test]
    fn end_file_with_error_decodes_the_file_error() {
        let mut payload = mpv_event_end_file {
            reason: MPV_END_FILE_REASON_ERROR,
            error: -17,
            playlist_entry_id: 4,
            playlist_insert_id: 0,
            playlist_insert_num_entries: 0,
        };
        let message = encode(&event_with(MPV_EVENT_END_FILE, &mut payload), "end-file");
        assert_eq!(
            message,
            HostValue::from(json!({
                "event": "end-file",
                "reason": "error",
                "playlist_entry_id": 4,
                "file_error": "unrecognized file format",
            }))
        );
    }

    #[test]
    fn end_file_reports_playlist_insertions() {
        let mut payload = mpv_event_end_file {
            reason: MPV_END_FILE_REASON_REDIRECT,
            error: 0,
            playlist_entry_id: 1,
            playlist_insert_id: 2,
            playlist_insert_num_entries: 3,
        };
        let message = encode(&event_with(MPV_EVENT_END_FILE, &mut payload), "end-file");
        assert_eq!(
            message,
            HostValue::from(json!({
                "event": "end-file",
                "reason": "redirect",
                "playlist_entry_id": 1,
                "playlist_insert_id": 2,
                "playlist_insert_num_entries": 3,
            }))
        );
        assert_eq!(end_file_reason(1), "unknown");
    }

    #[test]
    fn start_file_and_hook_carry_ids() {
        let mut start = mpv_event_start_file {
            playlist_entry_id: 6,
        };
        assert_eq!(
            encode(&event_with(MPV_EVENT_START_FILE, &mut start), "start-file"),
            HostValue::from(json!({"event": "start-file", "playlist_entry_id": 6}))
        );

        let mut hook = mpv_event_hook {
            name: c"on_load".as_ptr(),
            id: 31,
        };
        let mut event = event_with(MPV_EVENT_HOOK, &mut hook);
        event.reply_userdata = 2;
        assert_eq!(
            encode(&event, "hook"),
            HostValue::from(json!({"event": "hook", "id": 2, "hook_id": 31}))
        );
    }

    #[test]
    fn log_messages_pass_through() {
        let mut payload = mpv_event_log_message {
            prefix: c"cplayer".as_ptr(),
            level: c"info".as_ptr(),
            text: c"Playing: a.mkv\n".as_ptr(),
            log_level: 30,
        };
        assert_eq!(
            encode(&event_with(MPV_EVENT_LOG_MESSAGE, &mut payload), "log-message"),
            HostValue::from(json!({
                "event": "log-message",
                "prefix": "cplayer",
                "level": "info",
                "text": "Playing: a.mkv\n",
            }))
        );
    }

    #[test]
    fn client_message_forwards_arguments() {
        let mut args = [c"script-message".as_ptr(), c"hello".as_ptr()];
        let mut payload = mpv_event_client_message {
            num_args: 2,
            args: args.as_mut_ptr(),
        };
        assert_eq!(
            encode(&event_with(MPV_EVENT_CLIENT_MESSAGE, &mut payload), "client-message"),
            HostValue::from(json!({"event": "client-message", "args": ["script-message", "hello"]}))
        );
    }

    #[test]
    fn property_data_follows_the_format() {
        let mut double = 12.5_f64;
        let mut flag: c_int = 1;
        let mut int = -3_i64;
        let mut text: *const c_char = c"yes".as_ptr();
        let tree = OwnedNode::from_host(&HostValue::from(json!({"w": 640, "h": 480})));
        let mut node = *tree.node();

        let cases: [(i32, *mut c_void, Option<serde_json::Value>); 7] = [
            (MPV_FORMAT_DOUBLE, ptr::from_mut(&mut double).cast(), Some(json!(12.5))),
            (MPV_FORMAT_FLAG, ptr::from_mut(&mut flag).cast(), Some(json!(true))),
            (MPV_FORMAT_INT64, ptr::from_mut(&mut int).cast(), Some(json!(-3))),
            (MPV_FORMAT_STRING, ptr::from_mut(&mut text).cast(), Some(json!("yes"))),
            (MPV_FORMAT_NODE, ptr::from_mut(&mut node).cast(), Some(json!({"w": 640, "h": 480}))),
            (MPV_FORMAT_NONE, ptr::null_mut(), None),
            (MPV_FORMAT_DOUBLE, ptr::null_mut(), None),
        ];

        for (format, data, expected) in cases {
            let mut payload = mpv_event_property {
                name: c"pause".as_ptr(),
                format,
                data,
            };
            let message = encode(
                &event_with(MPV_EVENT_PROPERTY_CHANGE, &mut payload),
                "property-change",
            );
            let mut want = json!({"event": "property-change", "name": "pause"});
            if let Some(expected) = expected {
                want["data"] = expected;
            }
            assert_eq!(message, HostValue::from(want), "format {format}");
        }
    }

    #[test]
    fn command_reply_converts_the_result() {
        let mut payload = mpv_event_command {
            result: mpv_node {
                u: mpv_node_u { int64: 0 },
                format: MPV_FORMAT_NONE,
            },
        };
        let mut event = event_with(MPV_EVENT_COMMAND_REPLY, &mut payload);
        event.reply_userdata = 5;
        assert_eq!(
            encode(&event, "command-reply"),
            HostValue::from(json!({"event": "command-reply", "id": 5, "result": null}))
        );

        let tree = OwnedNode::from_host(&HostValue::from(json!(["a", 1])));
        let mut payload = mpv_event_command {
            result: *tree.node(),
        };
        let message = encode(&event_with(MPV_EVENT_COMMAND_REPLY, &mut payload), "command-reply");
        assert_eq!(message.get("result"), Some(&HostValue::from(json!(["a", 1]))));
    }

    #[test]
    fn missing_payload_skips_category_fields() {
        let event = mpv_event::empty(MPV_EVENT_END_FILE);
        assert_eq!(
            encode(&event, "end-file"),
            HostValue::from(json!({"event": "end-file"}))
        );
    }
}
