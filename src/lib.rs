//! # mpvjs
//!
//! A message bridge between an embedding host and libmpv.
//!
//! The host talks in dynamic values: it posts requests such as
//! `{type: "command", data: ["loadfile", path], id: 1}` and receives every
//! libmpv event back as a map like `{event: "end-file", reason: "eof", ...}`.
//! The bridge converts between those values and libmpv's node trees, drives an
//! OpenGL render context, and coalesces frame notifications so that at most
//! one buffer swap is in flight.
//!
//! libmpv calls back on its own threads. Those callbacks only queue a signal
//! and ask the host to schedule [`Instance::pump`]; everything else runs on the
//! host's dispatch thread.
//!
//! ```ignore
//! let config = mpvjs::Config::from_env();
//! mpvjs::logging::init(&config);
//! let library = mpvjs::LibMpv::open_default()?;
//! let instance = mpvjs::Instance::launch(&config, surface, host, schedule, || library.create());
//! ```

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod event;
pub mod gl;
pub mod host;
pub mod instance;
pub mod logging;
pub mod message;
pub mod present;
pub mod protocol;

#[cfg(test)]
mod testing;

pub use config::{Config, EngineOption};
pub use dispatch::{PresentDone, Scheduler, Signal};
pub use engine::libmpv::{LibMpv, Mpv, MpvRenderContext};
pub use engine::{Engine, Fbo, PropertyValue, RenderContext};
pub use error::{ErrorCode, GraphicsError, InitError};
pub use host::{Host, Surface, ViewGeometry};
pub use instance::Instance;
pub use message::Request;
pub use mpvjs_core::{HostValue, Map, OwnedNode};
pub use present::Presentation;
