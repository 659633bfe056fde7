//! One embedded player: engine, render context, surface and host channel.
//!
//! # Lifecycle
//!
//! Start-up runs in a fixed order and stops at the first fatal failure:
//!
//! 1. bind the GPU surface,
//! 2. create the engine,
//! 3. apply options libmpv only accepts before initialization,
//! 4. initialize the engine,
//! 5. make the GL context current,
//! 6. create the render context through the GL resolver,
//! 7. apply runtime options (failures are logged and skipped),
//! 8. install the wakeup and render-update callbacks.
//!
//! Teardown is the reverse: the render context is freed with the GL context
//! current, then the engine is destroyed.

use core::ffi::CStr;

use mpvjs_core::HostValue;
use mpvjs_core::Map;
use mpvjs_core::sys::MPV_EVENT_NONE;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::dispatch::{self, Dispatcher, Scheduler, Signal};
use crate::engine::{Engine, Fbo, RenderContext};
use crate::error::InitError;
use crate::event::encode_event;
use crate::gl::ProcResolver;
use crate::host::{Host, Surface, ViewGeometry};
use crate::message::Request;
use crate::present::Presentation;
use crate::protocol;

/// The `ready` message posted once start-up has finished.
#[must_use]
pub fn ready_message(ready: bool) -> HostValue {
    let mut message = Map::with_capacity(2);
    message.insert("type", "ready");
    message.insert("data", ready);
    HostValue::Map(message)
}

/// A running player instance.
///
/// All methods must be called on the host's dispatch thread. Work raised on
/// other threads arrives through the schedule hook passed at start-up, which
/// should arrange for [`pump`](Self::pump) to run.
pub struct Instance<E: Engine, S: Surface, H: Host> {
    // Freed explicitly in `Drop`, before `engine`.
    render: Option<E::Render>,
    engine: E,
    surface: S,
    host: H,
    scheduler: Scheduler,
    dispatcher: Dispatcher,
    presentation: Presentation,
    size: (i32, i32),
}

impl<E: Engine, S: Surface, H: Host> core::fmt::Debug for Instance<E, S, H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Instance")
            .field("presentation", &self.presentation)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl<E: Engine, S: Surface, H: Host> Instance<E, S, H> {
    /// Start an instance and post `{type: "ready", data}` to `host`.
    ///
    /// Returns `None` when start-up failed; everything built so far has been
    /// torn down by then.
    pub fn launch(
        config: &Config,
        mut surface: S,
        mut host: H,
        schedule: impl Fn() + Send + Sync + 'static,
        create_engine: impl FnOnce() -> Result<E, InitError>,
    ) -> Option<Self> {
        let (scheduler, dispatcher) = dispatch::channel(schedule);
        let started = boot(config, &mut surface, &scheduler, create_engine);
        host.post_message(ready_message(started.is_ok()));

        match started {
            Ok((engine, render)) => {
                info!("mpv instance ready");
                Some(Self::assemble(engine, render, surface, host, scheduler, dispatcher))
            }
            Err(err) => {
                error!(%err, "mpv instance failed to start");
                None
            }
        }
    }

    /// Start an instance without announcing it to the host.
    ///
    /// # Errors
    ///
    /// Returns the first fatal start-up failure.
    pub fn start(
        config: &Config,
        mut surface: S,
        host: H,
        schedule: impl Fn() + Send + Sync + 'static,
        create_engine: impl FnOnce() -> Result<E, InitError>,
    ) -> Result<Self, InitError> {
        let (scheduler, dispatcher) = dispatch::channel(schedule);
        let (engine, render) = boot(config, &mut surface, &scheduler, create_engine)?;
        Ok(Self::assemble(engine, render, surface, host, scheduler, dispatcher))
    }

    fn assemble(
        engine: E,
        render: E::Render,
        surface: S,
        host: H,
        scheduler: Scheduler,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            render: Some(render),
            engine,
            surface,
            host,
            scheduler,
            dispatcher,
            presentation: Presentation::new(),
            size: (0, 0),
        }
    }

    /// Act on one inbound host message.
    pub fn handle_message(&mut self, message: &HostValue) {
        match Request::decode(message) {
            Ok(request) => {
                if let Some(reply) = protocol::dispatch(&self.engine, request) {
                    self.host.post_message(reply);
                }
            }
            Err(rejected) => debug!(%rejected, "dropping host message"),
        }
    }

    /// Run all work queued from other threads. Never blocks.
    pub fn pump(&mut self) {
        while let Some(signal) = self.dispatcher.try_next() {
            match signal {
                Signal::Wakeup => self.drain_events(),
                Signal::Update => self.notify(),
                Signal::PresentDone => {
                    if self.presentation.present_done() {
                        self.render_pass();
                    }
                }
            }
        }
    }

    /// The view was resized or rescaled; always repaints.
    pub fn did_change_view(&mut self, view: ViewGeometry) {
        let (width, height) = view.device_size();
        self.surface.resize_buffers(width, height);
        self.size = (width, height);
        self.notify();
    }

    /// Current coalescing state.
    #[must_use]
    pub const fn presentation(&self) -> &Presentation {
        &self.presentation
    }

    /// Backbuffer size in device pixels.
    #[must_use]
    pub const fn size(&self) -> (i32, i32) {
        self.size
    }

    /// The engine driven by this instance.
    #[must_use]
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    fn notify(&mut self) {
        if self.presentation.notify() {
            self.render_pass();
        }
    }

    fn render_pass(&mut self) {
        self.surface.make_current();
        if let Some(render) = &self.render {
            let (width, height) = self.size;
            let fbo = Fbo {
                id: 0,
                width,
                height,
            };
            if let Err(code) = render.render(fbo, true) {
                warn!(%code, "mpv render failed");
            }
        }
        self.surface.swap_buffers(self.scheduler.present_done());
    }

    fn drain_events(&mut self) {
        while let Some(event) = self.engine.wait_event(0.0) {
            // SAFETY: libmpv keeps the event alive until the next wait_event.
            let event = unsafe { event.as_ref() };
            if event.event_id == MPV_EVENT_NONE {
                break;
            }
            let Some(name) = self.engine.event_name(event.event_id) else {
                debug!(id = event.event_id, "skipping unnamed event");
                continue;
            };
            // SAFETY: the payload comes from libmpv and matches the event id.
            let message = unsafe { encode_event(&self.engine, event, &name) };
            self.host.post_message(message);
        }
    }
}

impl<E: Engine, S: Surface, H: Host> Drop for Instance<E, S, H> {
    fn drop(&mut self) {
        if let Some(render) = self.render.take() {
            self.surface.make_current();
            drop(render);
        }
        debug!("mpv instance shutting down");
    }
}

fn boot<E: Engine, S: Surface>(
    config: &Config,
    surface: &mut S,
    scheduler: &Scheduler,
    create_engine: impl FnOnce() -> Result<E, InitError>,
) -> Result<(E, E::Render), InitError> {
    surface.init()?;
    let engine = create_engine()?;

    for option in config.pre_init_options() {
        if let Err(code) = engine.set_option_string(&option.name, &option.value) {
            warn!(option = %option.name, %code, "pre-init option rejected");
        }
    }
    engine.initialize().map_err(InitError::EngineInitialize)?;

    surface.make_current();
    let render = {
        let lookup = |name: &CStr| surface.proc_address(name);
        let resolver = ProcResolver::new(&lookup);
        engine
            .create_render_context(&resolver)
            .map_err(InitError::RenderContext)?
    };

    for option in &config.runtime_options {
        if let Err(code) = engine.set_option_string(&option.name, &option.value) {
            warn!(option = %option.name, %code, "runtime option rejected");
        }
    }

    engine.set_wakeup_callback(Some(Box::new(scheduler.signal_fn(Signal::Wakeup))));
    render.set_update_callback(Some(Box::new(scheduler.signal_fn(Signal::Update))));
    Ok((engine, render))
}
