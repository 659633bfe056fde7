//! Recording doubles for the engine, render context, surface and host.

use core::ffi::{CStr, c_void};
use core::ptr::{self, NonNull};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use mpvjs_core::sys::{MPV_EVENT_NONE, mpv_event, mpv_format};
use mpvjs_core::{HostValue, OwnedNode};

use crate::dispatch::PresentDone;
use crate::engine::{Callback, Engine, Fbo, PropertyValue, RenderContext};
use crate::error::{ErrorCode, GraphicsError};
use crate::gl::ProcResolver;
use crate::host::{Host, Surface};

/// Ordered record of lifecycle steps shared by all doubles.
pub type Log = Rc<RefCell<Vec<String>>>;

fn note(log: &Log, entry: impl Into<String>) {
    log.borrow_mut().push(entry.into());
}

/// Calls the protocol makes against an engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Command {
        reply: u64,
        args: HostValue,
    },
    SetProperty {
        reply: u64,
        name: String,
        format: mpv_format,
        value: HostValue,
    },
    GetProperty {
        reply: u64,
        name: String,
    },
    ObserveProperty {
        reply: u64,
        name: String,
    },
    UnobserveProperty {
        reply: u64,
    },
    HookAdd {
        reply: u64,
        name: String,
        priority: i32,
    },
    HookContinue {
        id: u64,
    },
    SetOption {
        name: String,
        value: String,
    },
}

// ============================================================================
// Engine
// ============================================================================

#[derive(Default)]
pub struct RenderState {
    update: RefCell<Option<Callback>>,
    frames: RefCell<Vec<(Fbo, bool)>>,
}

impl RenderState {
    /// Frames rendered so far.
    pub fn frames(&self) -> Vec<(Fbo, bool)> {
        self.frames.borrow().clone()
    }

    /// Invoke the update callback as libmpv would from its render thread.
    pub fn fire_update(&self) {
        if let Some(callback) = self.update.borrow().as_ref() {
            callback();
        }
    }
}

pub struct MockEngine {
    log: Log,
    calls: RefCell<Vec<Call>>,
    fail_all: Cell<Option<ErrorCode>>,
    failing: RefCell<Vec<(&'static str, ErrorCode)>>,
    events: RefCell<VecDeque<mpv_event>>,
    current: RefCell<Box<mpv_event>>,
    wakeup: RefCell<Option<Callback>>,
    render: Rc<RenderState>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::with_log(Log::default())
    }

    pub fn with_log(log: Log) -> Self {
        note(&log, "engine.create");
        Self {
            log,
            calls: RefCell::default(),
            fail_all: Cell::new(None),
            failing: RefCell::default(),
            events: RefCell::default(),
            current: RefCell::new(Box::new(mpv_event::empty(MPV_EVENT_NONE))),
            wakeup: RefCell::default(),
            render: Rc::default(),
        }
    }

    /// Make every following call fail with `code`.
    pub fn fail_with(&self, code: ErrorCode) {
        self.fail_all.set(Some(code));
    }

    /// Make calls of one kind fail with `code`.
    pub fn fail(&self, call: &'static str, code: ErrorCode) {
        self.failing.borrow_mut().push((call, code));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Queue an event for `wait_event`. Its payload must outlive the drain.
    pub fn push_event(&self, event: mpv_event) {
        self.events.borrow_mut().push_back(event);
    }

    /// Invoke the wakeup callback as libmpv would from its own thread.
    pub fn fire_wakeup(&self) {
        if let Some(callback) = self.wakeup.borrow().as_ref() {
            callback();
        }
    }

    pub fn render_state(&self) -> Rc<RenderState> {
        Rc::clone(&self.render)
    }

    fn status(&self, call: &'static str) -> Result<(), ErrorCode> {
        if let Some(code) = self.fail_all.get() {
            return Err(code);
        }
        self.failing
            .borrow()
            .iter()
            .find(|(name, _)| *name == call)
            .map_or(Ok(()), |(_, code)| Err(*code))
    }

    fn record(&self, call: Call) -> Result<(), ErrorCode> {
        let name = match &call {
            Call::Command { .. } => "command",
            Call::SetProperty { .. } => "set_property",
            Call::GetProperty { .. } => "get_property",
            Call::ObserveProperty { .. } => "observe_property",
            Call::UnobserveProperty { .. } => "unobserve_property",
            Call::HookAdd { .. } => "hook_add",
            Call::HookContinue { .. } => "hook_continue",
            Call::SetOption { .. } => "set_option",
        };
        self.calls.borrow_mut().push(call);
        self.status(name)
    }
}

impl Drop for MockEngine {
    fn drop(&mut self) {
        note(&self.log, "engine.destroy");
    }
}

impl Engine for MockEngine {
    type Render = MockRender;

    fn set_option_string(&self, name: &str, value: &str) -> Result<(), ErrorCode> {
        note(&self.log, format!("option:{name}={value}"));
        self.record(Call::SetOption {
            name: name.into(),
            value: value.into(),
        })
    }

    fn initialize(&self) -> Result<(), ErrorCode> {
        note(&self.log, "initialize");
        self.status("initialize")
    }

    fn command_async(&self, reply: u64, args: &mut OwnedNode) -> Result<(), ErrorCode> {
        self.record(Call::Command {
            reply,
            args: args.to_host(),
        })
    }

    fn set_property_async(
        &self,
        reply: u64,
        name: &str,
        value: PropertyValue<'_>,
    ) -> Result<(), ErrorCode> {
        let host = match value {
            PropertyValue::String(text) => HostValue::from(text),
            PropertyValue::Flag(flag) => HostValue::Bool(flag),
            PropertyValue::Int64(int) => HostValue::Int(int),
            PropertyValue::Double(double) => HostValue::Double(double),
        };
        self.record(Call::SetProperty {
            reply,
            name: name.into(),
            format: value.format(),
            value: host,
        })
    }

    fn get_property_async(&self, reply: u64, name: &str) -> Result<(), ErrorCode> {
        self.record(Call::GetProperty {
            reply,
            name: name.into(),
        })
    }

    fn observe_property(&self, reply: u64, name: &str) -> Result<(), ErrorCode> {
        self.record(Call::ObserveProperty {
            reply,
            name: name.into(),
        })
    }

    fn unobserve_property(&self, reply: u64) -> Result<i32, ErrorCode> {
        self.record(Call::UnobserveProperty { reply }).map(|()| 1)
    }

    fn hook_add(&self, reply: u64, name: &str, priority: i32) -> Result<(), ErrorCode> {
        self.record(Call::HookAdd {
            reply,
            name: name.into(),
            priority,
        })
    }

    fn hook_continue(&self, id: u64) -> Result<(), ErrorCode> {
        self.record(Call::HookContinue { id })
    }

    fn wait_event(&self, _timeout: f64) -> Option<NonNull<mpv_event>> {
        let next = self
            .events
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| mpv_event::empty(MPV_EVENT_NONE));
        let mut current = self.current.borrow_mut();
        **current = next;
        Some(NonNull::from(&mut **current))
    }

    fn set_wakeup_callback(&self, callback: Option<Callback>) {
        note(&self.log, "wakeup.set");
        *self.wakeup.borrow_mut() = callback;
    }

    fn create_render_context(
        &self,
        resolver: &ProcResolver<'_>,
    ) -> Result<Self::Render, ErrorCode> {
        let _ = resolver.resolve(c"glClear");
        note(&self.log, "render.create");
        self.status("render_context")?;
        Ok(MockRender {
            log: Rc::clone(&self.log),
            state: Rc::clone(&self.render),
        })
    }
}

pub struct MockRender {
    log: Log,
    state: Rc<RenderState>,
}

impl RenderContext for MockRender {
    fn render(&self, fbo: Fbo, flip_y: bool) -> Result<(), ErrorCode> {
        self.state.frames.borrow_mut().push((fbo, flip_y));
        Ok(())
    }

    fn set_update_callback(&self, callback: Option<Callback>) {
        note(&self.log, "update.set");
        *self.state.update.borrow_mut() = callback;
    }
}

impl Drop for MockRender {
    fn drop(&mut self) {
        note(&self.log, "render.free");
    }
}

// ============================================================================
// Surface and host
// ============================================================================

#[derive(Default)]
pub struct SurfaceState {
    fail_init: Cell<bool>,
    sizes: RefCell<Vec<(i32, i32)>>,
    swaps: RefCell<Vec<PresentDone>>,
}

impl SurfaceState {
    pub fn fail_init(&self) {
        self.fail_init.set(true);
    }

    pub fn sizes(&self) -> Vec<(i32, i32)> {
        self.sizes.borrow().clone()
    }

    /// Swaps issued and not yet completed.
    pub fn pending_swaps(&self) -> usize {
        self.swaps.borrow().len()
    }

    /// Complete every outstanding swap.
    pub fn finish_swaps(&self) {
        for done in self.swaps.borrow_mut().drain(..) {
            done.complete();
        }
    }
}

#[derive(Clone)]
pub struct MockSurface {
    log: Log,
    state: Rc<SurfaceState>,
}

impl MockSurface {
    pub fn new(log: &Log) -> Self {
        Self {
            log: Rc::clone(log),
            state: Rc::default(),
        }
    }

    pub fn state(&self) -> Rc<SurfaceState> {
        Rc::clone(&self.state)
    }
}

extern "C" fn gl_clear(_mask: u32) {}

impl Surface for MockSurface {
    fn init(&mut self) -> Result<(), GraphicsError> {
        note(&self.log, "surface.init");
        if self.state.fail_init.get() {
            return Err(GraphicsError("unable to bind 3d context".into()));
        }
        Ok(())
    }

    fn make_current(&mut self) {
        note(&self.log, "surface.make_current");
    }

    fn resize_buffers(&mut self, width: i32, height: i32) {
        self.state.sizes.borrow_mut().push((width, height));
    }

    fn swap_buffers(&mut self, done: PresentDone) {
        self.state.swaps.borrow_mut().push(done);
    }

    fn proc_address(&self, name: &CStr) -> *mut c_void {
        note(&self.log, format!("proc:{}", name.to_string_lossy()));
        if name == c"glClear" {
            gl_clear as extern "C" fn(u32) as *mut c_void
        } else {
            ptr::null_mut()
        }
    }
}

/// Host that keeps every posted message.
#[derive(Clone, Default)]
pub struct Recorder {
    messages: Rc<RefCell<Vec<HostValue>>>,
}

impl Recorder {
    pub fn messages(&self) -> Vec<HostValue> {
        self.messages.borrow().clone()
    }

    pub fn take(&self) -> Vec<HostValue> {
        self.messages.borrow_mut().drain(..).collect()
    }
}

impl Host for Recorder {
    fn post_message(&mut self, message: HostValue) {
        self.messages.borrow_mut().push(message);
    }
}
