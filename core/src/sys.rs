//! `#[repr(C)]` mirrors of the parts of the libmpv client ABI the bridge touches.
//!
//! Layouts follow `mpv/client.h` and `mpv/render.h` (client API 2.x). Nothing in
//! here owns memory: every pointer is borrowed from whoever built the structure.

#![allow(non_camel_case_types)]

use core::ffi::{CStr, c_char, c_int, c_void};

/// Opaque libmpv client handle.
#[repr(C)]
pub struct mpv_handle {
    _private: [u8; 0],
}

/// Opaque libmpv render context.
#[repr(C)]
pub struct mpv_render_context {
    _private: [u8; 0],
}

/// Data format tag, `mpv_format`.
pub type mpv_format = c_int;

/// No value.
pub const MPV_FORMAT_NONE: mpv_format = 0;
/// `char *`.
pub const MPV_FORMAT_STRING: mpv_format = 1;
/// `char *` formatted for on-screen display.
pub const MPV_FORMAT_OSD_STRING: mpv_format = 2;
/// `int`, 0 or 1.
pub const MPV_FORMAT_FLAG: mpv_format = 3;
/// `int64_t`.
pub const MPV_FORMAT_INT64: mpv_format = 4;
/// `double`.
pub const MPV_FORMAT_DOUBLE: mpv_format = 5;
/// `mpv_node`.
pub const MPV_FORMAT_NODE: mpv_format = 6;
/// `mpv_node_list` without keys.
pub const MPV_FORMAT_NODE_ARRAY: mpv_format = 7;
/// `mpv_node_list` with keys.
pub const MPV_FORMAT_NODE_MAP: mpv_format = 8;
/// `mpv_byte_array`.
pub const MPV_FORMAT_BYTE_ARRAY: mpv_format = 9;

/// Payload of an [`mpv_node`]; which field is live is decided by `format`.
#[repr(C)]
#[derive(Clone, Copy)]
pub union mpv_node_u {
    /// STRING and OSD_STRING.
    pub string: *mut c_char,
    /// FLAG.
    pub flag: c_int,
    /// INT64.
    pub int64: i64,
    /// DOUBLE.
    pub double_: f64,
    /// NODE_ARRAY and NODE_MAP.
    pub list: *mut mpv_node_list,
    /// BYTE_ARRAY.
    pub ba: *mut mpv_byte_array,
}

/// A self-describing value tree node.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct mpv_node {
    /// Payload selected by `format`.
    pub u: mpv_node_u,
    /// Format of `u`.
    pub format: mpv_format,
}

impl mpv_node {
    /// A node carrying no value.
    pub const NONE: Self = Self {
        u: mpv_node_u { int64: 0 },
        format: MPV_FORMAT_NONE,
    };
}

impl core::fmt::Debug for mpv_node {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("mpv_node")
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

/// Children of an array or map node.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct mpv_node_list {
    /// Number of entries.
    pub num: c_int,
    /// `num` values.
    pub values: *mut mpv_node,
    /// Null for arrays, `num` key pointers for maps.
    pub keys: *mut *mut c_char,
}

/// Raw bytes referenced by a node.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct mpv_byte_array {
    /// Start of the bytes.
    pub data: *mut c_void,
    /// Length in bytes.
    pub size: usize,
}

/// Event kind, `mpv_event_id`.
pub type mpv_event_id = c_int;

/// Nothing pending.
pub const MPV_EVENT_NONE: mpv_event_id = 0;
/// The player is quitting.
pub const MPV_EVENT_SHUTDOWN: mpv_event_id = 1;
/// Payload: [`mpv_event_log_message`].
pub const MPV_EVENT_LOG_MESSAGE: mpv_event_id = 2;
/// Payload: [`mpv_event_property`].
pub const MPV_EVENT_GET_PROPERTY_REPLY: mpv_event_id = 3;
/// No payload.
pub const MPV_EVENT_SET_PROPERTY_REPLY: mpv_event_id = 4;
/// Payload: [`mpv_event_command`].
pub const MPV_EVENT_COMMAND_REPLY: mpv_event_id = 5;
/// Payload: [`mpv_event_start_file`].
pub const MPV_EVENT_START_FILE: mpv_event_id = 6;
/// Payload: [`mpv_event_end_file`].
pub const MPV_EVENT_END_FILE: mpv_event_id = 7;
/// A file finished loading.
pub const MPV_EVENT_FILE_LOADED: mpv_event_id = 8;
/// Payload: [`mpv_event_client_message`].
pub const MPV_EVENT_CLIENT_MESSAGE: mpv_event_id = 16;
/// Video output parameters changed.
pub const MPV_EVENT_VIDEO_RECONFIG: mpv_event_id = 17;
/// Audio output parameters changed.
pub const MPV_EVENT_AUDIO_RECONFIG: mpv_event_id = 18;
/// A seek started.
pub const MPV_EVENT_SEEK: mpv_event_id = 20;
/// Playback resumed after a seek or load.
pub const MPV_EVENT_PLAYBACK_RESTART: mpv_event_id = 21;
/// Payload: [`mpv_event_property`].
pub const MPV_EVENT_PROPERTY_CHANGE: mpv_event_id = 22;
/// Events were dropped.
pub const MPV_EVENT_QUEUE_OVERFLOW: mpv_event_id = 24;
/// Payload: [`mpv_event_hook`].
pub const MPV_EVENT_HOOK: mpv_event_id = 25;

/// One event returned by `mpv_wait_event`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct mpv_event {
    /// Event kind.
    pub event_id: mpv_event_id,
    /// Status of the request this replies to.
    pub error: c_int,
    /// Id passed with the request, or 0.
    pub reply_userdata: u64,
    /// Kind-specific payload, or null.
    pub data: *mut c_void,
}

impl mpv_event {
    /// An event of the given kind with no payload.
    #[must_use]
    pub const fn empty(event_id: mpv_event_id) -> Self {
        Self {
            event_id,
            error: 0,
            reply_userdata: 0,
            data: core::ptr::null_mut(),
        }
    }
}

/// Property value carried by change and get replies.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct mpv_event_property {
    /// Property name.
    pub name: *const c_char,
    /// Format of `data`; NONE when unavailable.
    pub format: mpv_format,
    /// Value of `format`.
    pub data: *mut c_void,
}

/// A log line.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct mpv_event_log_message {
    /// Module prefix.
    pub prefix: *const c_char,
    /// Level name.
    pub level: *const c_char,
    /// Message text, usually newline-terminated.
    pub text: *const c_char,
    /// Numeric level.
    pub log_level: c_int,
}

/// Payload of start-file.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct mpv_event_start_file {
    /// Playlist entry being started.
    pub playlist_entry_id: i64,
}

/// Why playback of a file ended.
pub type mpv_end_file_reason = c_int;

/// Reached the end.
pub const MPV_END_FILE_REASON_EOF: mpv_end_file_reason = 0;
/// Stopped by a command.
pub const MPV_END_FILE_REASON_STOP: mpv_end_file_reason = 2;
/// The player is quitting.
pub const MPV_END_FILE_REASON_QUIT: mpv_end_file_reason = 3;
/// Playback failed; see `error`.
pub const MPV_END_FILE_REASON_ERROR: mpv_end_file_reason = 4;
/// The file was a playlist or redirect.
pub const MPV_END_FILE_REASON_REDIRECT: mpv_end_file_reason = 5;

/// Payload of end-file.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct mpv_event_end_file {
    /// Why playback ended.
    pub reason: mpv_end_file_reason,
    /// Failure status when `reason` is ERROR.
    pub error: c_int,
    /// Entry that ended.
    pub playlist_entry_id: i64,
    /// First entry inserted by a redirect, or 0.
    pub playlist_insert_id: i64,
    /// Number of inserted entries.
    pub playlist_insert_num_entries: c_int,
}

/// Payload of client-message.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct mpv_event_client_message {
    /// Number of arguments.
    pub num_args: c_int,
    /// `num_args` strings.
    pub args: *mut *const c_char,
}

/// Payload of hook.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct mpv_event_hook {
    /// Hook name.
    pub name: *const c_char,
    /// Id to pass to `mpv_hook_continue`.
    pub id: u64,
}

/// Payload of command-reply.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct mpv_event_command {
    /// Command result, NONE when there is none.
    pub result: mpv_node,
}

/// Render parameter tag.
pub type mpv_render_param_type = c_int;

/// Terminates a parameter list.
pub const MPV_RENDER_PARAM_INVALID: mpv_render_param_type = 0;
/// `char *` naming the render API.
pub const MPV_RENDER_PARAM_API_TYPE: mpv_render_param_type = 1;
/// [`mpv_opengl_init_params`].
pub const MPV_RENDER_PARAM_OPENGL_INIT_PARAMS: mpv_render_param_type = 2;
/// [`mpv_opengl_fbo`].
pub const MPV_RENDER_PARAM_OPENGL_FBO: mpv_render_param_type = 3;
/// `int`, non-zero to flip vertically.
pub const MPV_RENDER_PARAM_FLIP_Y: mpv_render_param_type = 4;

/// The OpenGL render API name.
pub const MPV_RENDER_API_TYPE_OPENGL: &CStr = c"opengl";

/// One entry of a render parameter list.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct mpv_render_param {
    /// Parameter tag.
    pub type_: mpv_render_param_type,
    /// Parameter value, typed by `type_`.
    pub data: *mut c_void,
}

/// GL function lookup used by the render context.
pub type mpv_get_proc_address_fn =
    unsafe extern "C" fn(ctx: *mut c_void, name: *const c_char) -> *mut c_void;

/// OpenGL render context setup.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct mpv_opengl_init_params {
    /// GL function lookup.
    pub get_proc_address: Option<mpv_get_proc_address_fn>,
    /// Passed to `get_proc_address`.
    pub get_proc_address_ctx: *mut c_void,
}

/// Framebuffer to render into.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct mpv_opengl_fbo {
    /// Framebuffer object name; 0 is the default framebuffer.
    pub fbo: c_int,
    /// Width in pixels.
    pub w: c_int,
    /// Height in pixels.
    pub h: c_int,
    /// Internal format, 0 if unknown.
    pub internal_format: c_int,
}

/// Wakeup and update callback signature.
pub type mpv_callback = unsafe extern "C" fn(ctx: *mut c_void);

/// Name libmpv reports for an event id, mirroring `mpv_event_name`.
#[must_use]
pub const fn event_name(event_id: mpv_event_id) -> Option<&'static str> {
    Some(match event_id {
        MPV_EVENT_NONE => "none",
        MPV_EVENT_SHUTDOWN => "shutdown",
        MPV_EVENT_LOG_MESSAGE => "log-message",
        MPV_EVENT_GET_PROPERTY_REPLY => "get-property-reply",
        MPV_EVENT_SET_PROPERTY_REPLY => "set-property-reply",
        MPV_EVENT_COMMAND_REPLY => "command-reply",
        MPV_EVENT_START_FILE => "start-file",
        MPV_EVENT_END_FILE => "end-file",
        MPV_EVENT_FILE_LOADED => "file-loaded",
        MPV_EVENT_CLIENT_MESSAGE => "client-message",
        MPV_EVENT_VIDEO_RECONFIG => "video-reconfig",
        MPV_EVENT_AUDIO_RECONFIG => "audio-reconfig",
        MPV_EVENT_SEEK => "seek",
        MPV_EVENT_PLAYBACK_RESTART => "playback-restart",
        MPV_EVENT_PROPERTY_CHANGE => "property-change",
        MPV_EVENT_QUEUE_OVERFLOW => "queue-overflow",
        MPV_EVENT_HOOK => "hook",
        _ => return None,
    })
}

/// Message libmpv reports for a status code, mirroring `mpv_error_string`.
#[must_use]
pub const fn error_string(code: c_int) -> &'static str {
    match code {
        0 => "success",
        -1 => "event queue full",
        -2 => "memory allocation failed",
        -3 => "core not uninitialized",
        -4 => "invalid parameter",
        -5 => "option not found",
        -6 => "unsupported format for accessing option",
        -7 => "error setting option",
        -8 => "property not found",
        -9 => "unsupported format for accessing property",
        -10 => "property unavailable",
        -11 => "error accessing property",
        -12 => "error running command",
        -13 => "loading failed",
        -14 => "audio output initialization failed",
        -15 => "video output initialization failed",
        -16 => "no audio or video data played",
        -17 => "unrecognized file format",
        -18 => "not supported",
        -19 => "operation not implemented",
        -20 => "something happened",
        _ => "unknown error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn node_layout_matches_client_h() {
        assert_eq!(core::mem::size_of::<mpv_node>(), 16);
        assert_eq!(core::mem::offset_of!(mpv_node, format), 8);
        assert_eq!(core::mem::offset_of!(mpv_event, reply_userdata), 8);
    }

    #[test]
    fn known_names_and_errors() {
        assert_eq!(event_name(MPV_EVENT_END_FILE), Some("end-file"));
        assert_eq!(event_name(9), None);
        assert_eq!(error_string(-13), "loading failed");
        assert_eq!(error_string(-99), "unknown error");
    }
}
