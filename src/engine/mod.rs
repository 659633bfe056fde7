//! The libmpv operations the bridge drives.
//!
//! [`Engine`] abstracts one `mpv_handle` and [`RenderContext`] one
//! `mpv_render_context`. The production implementation lives in [`libmpv`];
//! tests substitute recording mocks.

use core::ptr::NonNull;

use mpvjs_core::sys::{
    self, MPV_FORMAT_DOUBLE, MPV_FORMAT_FLAG, MPV_FORMAT_INT64, MPV_FORMAT_STRING, mpv_event,
    mpv_event_id, mpv_format,
};
use mpvjs_core::{HostValue, OwnedNode};

use crate::error::ErrorCode;
use crate::gl::ProcResolver;

pub mod libmpv;

/// Notification invoked by libmpv on one of its own threads.
pub type Callback = Box<dyn Fn() + Send + Sync>;

/// A scalar property value, tagged with the libmpv format it is sent as.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropertyValue<'a> {
    /// Sent as `MPV_FORMAT_STRING`.
    String(&'a str),
    /// Sent as `MPV_FORMAT_FLAG`.
    Flag(bool),
    /// Sent as `MPV_FORMAT_INT64`.
    Int64(i64),
    /// Sent as `MPV_FORMAT_DOUBLE`.
    Double(f64),
}

impl<'a> PropertyValue<'a> {
    /// The scalar form of a host value. Containers, byte buffers and null have
    /// no scalar form.
    #[must_use]
    pub fn from_host(value: &'a HostValue) -> Option<Self> {
        match value {
            HostValue::String(text) => Some(Self::String(text)),
            HostValue::Bool(flag) => Some(Self::Flag(*flag)),
            HostValue::Int(int) => Some(Self::Int64(*int)),
            HostValue::Double(double) => Some(Self::Double(*double)),
            HostValue::Null
            | HostValue::Array(_)
            | HostValue::Map(_)
            | HostValue::ByteBuffer(_) => None,
        }
    }

    /// The libmpv format code this value is passed with.
    #[must_use]
    pub const fn format(&self) -> mpv_format {
        match self {
            Self::String(_) => MPV_FORMAT_STRING,
            Self::Flag(_) => MPV_FORMAT_FLAG,
            Self::Int64(_) => MPV_FORMAT_INT64,
            Self::Double(_) => MPV_FORMAT_DOUBLE,
        }
    }
}

/// Framebuffer a render pass draws into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Fbo {
    /// GL framebuffer object; 0 is the default framebuffer.
    pub id: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

/// An OpenGL render context attached to an engine. Dropping it frees the
/// context, which must happen while the GL context is current and before the
/// engine that created it is destroyed.
pub trait RenderContext {
    /// Draw the current video frame into `fbo`.
    ///
    /// # Errors
    ///
    /// Returns the libmpv status when rendering fails.
    fn render(&self, fbo: Fbo, flip_y: bool) -> Result<(), ErrorCode>;

    /// Install or clear the callback announcing a new frame.
    fn set_update_callback(&self, callback: Option<Callback>);
}

/// One libmpv client handle.
///
/// Every asynchronous call takes a `reply` id that libmpv echoes in the
/// matching reply event. All methods are called on the dispatch thread.
#[allow(clippy::missing_errors_doc)]
pub trait Engine {
    /// Render context type created by this engine.
    type Render: RenderContext;

    /// `mpv_set_option_string`.
    fn set_option_string(&self, name: &str, value: &str) -> Result<(), ErrorCode>;

    /// `mpv_initialize`.
    fn initialize(&self) -> Result<(), ErrorCode>;

    /// `mpv_command_node_async`. libmpv copies the tree before returning.
    fn command_async(&self, reply: u64, args: &mut OwnedNode) -> Result<(), ErrorCode>;

    /// `mpv_set_property_async` with the format of `value`.
    fn set_property_async(
        &self,
        reply: u64,
        name: &str,
        value: PropertyValue<'_>,
    ) -> Result<(), ErrorCode>;

    /// `mpv_get_property_async` requesting `MPV_FORMAT_NODE`.
    fn get_property_async(&self, reply: u64, name: &str) -> Result<(), ErrorCode>;

    /// `mpv_observe_property` requesting `MPV_FORMAT_NODE`.
    fn observe_property(&self, reply: u64, name: &str) -> Result<(), ErrorCode>;

    /// `mpv_unobserve_property`; returns how many observations were removed.
    fn unobserve_property(&self, reply: u64) -> Result<i32, ErrorCode>;

    /// `mpv_hook_add`.
    fn hook_add(&self, reply: u64, name: &str, priority: i32) -> Result<(), ErrorCode>;

    /// `mpv_hook_continue`.
    fn hook_continue(&self, id: u64) -> Result<(), ErrorCode>;

    /// `mpv_wait_event`. The event stays valid until the next call; an event
    /// with id `MPV_EVENT_NONE` means the queue is empty.
    fn wait_event(&self, timeout: f64) -> Option<NonNull<mpv_event>>;

    /// `mpv_set_wakeup_callback`.
    fn set_wakeup_callback(&self, callback: Option<Callback>);

    /// `mpv_render_context_create` for the OpenGL backend.
    fn create_render_context(&self, resolver: &ProcResolver<'_>)
    -> Result<Self::Render, ErrorCode>;

    /// `mpv_error_string`.
    fn error_string(&self, code: i32) -> String {
        sys::error_string(code).to_owned()
    }

    /// `mpv_event_name`.
    fn event_name(&self, event_id: mpv_event_id) -> Option<String> {
        sys::event_name(event_id).map(str::to_owned)
    }
}
