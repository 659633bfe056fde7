//! What the embedding host provides.

use core::ffi::{CStr, c_void};

use mpvjs_core::HostValue;

use crate::dispatch::PresentDone;
use crate::error::GraphicsError;

/// The GPU surface video is presented on.
pub trait Surface {
    /// Create and bind the GL context.
    ///
    /// # Errors
    ///
    /// Returns why no usable context could be set up.
    fn init(&mut self) -> Result<(), GraphicsError>;

    /// Make the GL context current on the calling thread.
    fn make_current(&mut self);

    /// Resize the backbuffer to `width` x `height` device pixels.
    fn resize_buffers(&mut self, width: i32, height: i32);

    /// Present the backbuffer, completing `done` once the swap has finished.
    fn swap_buffers(&mut self, done: PresentDone);

    /// Address of a GL function, or null when the host has none.
    fn proc_address(&self, name: &CStr) -> *mut c_void;
}

/// Receives outbound messages.
pub trait Host {
    /// Deliver one message to the host's message channel.
    fn post_message(&mut self, message: HostValue);
}

/// Size and scale of the view, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewGeometry {
    /// Width in logical pixels.
    pub width: f64,
    /// Height in logical pixels.
    pub height: f64,
    /// Device pixels per logical pixel.
    pub device_scale: f64,
}

impl ViewGeometry {
    /// Backbuffer size in device pixels, truncated.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn device_size(&self) -> (i32, i32) {
        (
            (self.width * self.device_scale) as i32,
            (self.height * self.device_scale) as i32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_size_scales_and_truncates() {
        let view = ViewGeometry {
            width: 640.5,
            height: 360.0,
            device_scale: 2.0,
        };
        assert_eq!(view.device_size(), (1281, 720));

        let view = ViewGeometry {
            width: 100.0,
            height: 50.0,
            device_scale: 1.25,
        };
        assert_eq!(view.device_size(), (125, 62));
    }
}
