//! # mpvjs FFI
//!
//! C ABI for embedding the mpvjs bridge in a host runtime.
//!
//! The host fills an [`MpvjsHostCallbacks`] table and creates an instance with
//! [`mpvjs_instance_new`]. Messages travel as JSON text in both directions.
//! Whenever the bridge needs attention it calls `schedule`, possibly from a
//! libmpv thread; the host must then call [`mpvjs_instance_pump`] on the
//! thread that owns the instance. Every other entry point must be called on
//! that same thread.
//!
//! Buffer swaps are asynchronous: `swap_buffers` receives a
//! [`MpvjsPresentDone`] handle which the host passes to
//! [`mpvjs_present_done`] once the frame is on screen.

#[macro_use]
mod macros;

use core::ffi::{CStr, c_char, c_void};
use std::ffi::CString;
use std::path::Path;

use mpvjs::{
    Config, GraphicsError, Host, HostValue, Instance, LibMpv, Mpv, PresentDone, Surface,
    ViewGeometry,
};
use tracing::{debug, error, warn};

/// Defines a trait for converting Rust types to FFI-compatible representations.
pub trait IntoFFI: 'static {
    /// The FFI-compatible type that this Rust type converts to.
    type FFI: 'static;

    /// Converts this Rust type into its FFI-compatible representation.
    fn into_ffi(self) -> Self::FFI;
}

/// Defines a trait for converting FFI-compatible types back to Rust types.
pub trait IntoRust {
    /// The Rust type that this FFI type converts to.
    type Rust;

    /// Converts this FFI type into its Rust representation.
    ///
    /// # Safety
    ///
    /// The value must have been produced by the matching `IntoFFI`
    /// conversion, or otherwise satisfy its invariants.
    unsafe fn into_rust(self) -> Self::Rust;
}

type FfiInstance = Instance<Mpv, FfiSurface, FfiHost>;

opaque!(MpvjsInstance, FfiInstance, mpvjs_instance_drop);
opaque!(MpvjsPresentDone, PresentDone, mpvjs_present_drop);

/// View size reported by the host.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MpvjsViewGeometry {
    /// Width in logical pixels.
    pub width: f64,
    /// Height in logical pixels.
    pub height: f64,
    /// Device pixels per logical pixel.
    pub device_scale: f64,
}

impl IntoRust for MpvjsViewGeometry {
    type Rust = ViewGeometry;
    unsafe fn into_rust(self) -> Self::Rust {
        ViewGeometry {
            width: self.width,
            height: self.height,
            device_scale: self.device_scale,
        }
    }
}

/// Callbacks the host provides. Every field is required.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MpvjsHostCallbacks {
    /// Passed back as the first argument of every callback.
    pub context: *mut c_void,
    /// Receive one outbound message as NUL-terminated JSON, valid only for the
    /// duration of the call.
    pub post_message: Option<unsafe extern "C" fn(*mut c_void, *const c_char)>,
    /// Arrange for `mpvjs_instance_pump` to run on the instance thread. Called
    /// from arbitrary threads.
    pub schedule: Option<unsafe extern "C" fn(*mut c_void)>,
    /// Create and bind the GL context; return false on failure.
    pub init_graphics: Option<unsafe extern "C" fn(*mut c_void) -> bool>,
    /// Make the GL context current.
    pub make_current: Option<unsafe extern "C" fn(*mut c_void)>,
    /// Resize the backbuffer in device pixels.
    pub resize_buffers: Option<unsafe extern "C" fn(*mut c_void, i32, i32)>,
    /// Present the backbuffer and later pass the handle to `mpvjs_present_done`.
    pub swap_buffers: Option<unsafe extern "C" fn(*mut c_void, *mut MpvjsPresentDone)>,
    /// Look up a GL function by name, or return null.
    pub get_proc_address: Option<unsafe extern "C" fn(*mut c_void, *const c_char) -> *mut c_void>,
}

/// The host context pointer.
#[derive(Debug, Clone, Copy)]
struct HostContext(*mut c_void);

// SAFETY: the host contract makes `schedule` callable from any thread with this
// context; every other callback is only invoked on the instance thread.
unsafe impl Send for HostContext {}
// SAFETY: as above.
unsafe impl Sync for HostContext {}

impl HostContext {
    const fn as_ptr(self) -> *mut c_void {
        self.0
    }
}

/// [`MpvjsHostCallbacks`] with every entry present.
#[derive(Debug, Clone, Copy)]
struct Callbacks {
    context: HostContext,
    post_message: unsafe extern "C" fn(*mut c_void, *const c_char),
    schedule: unsafe extern "C" fn(*mut c_void),
    init_graphics: unsafe extern "C" fn(*mut c_void) -> bool,
    make_current: unsafe extern "C" fn(*mut c_void),
    resize_buffers: unsafe extern "C" fn(*mut c_void, i32, i32),
    swap_buffers: unsafe extern "C" fn(*mut c_void, *mut MpvjsPresentDone),
    get_proc_address: unsafe extern "C" fn(*mut c_void, *const c_char) -> *mut c_void,
}

impl Callbacks {
    fn from_ffi(table: &MpvjsHostCallbacks) -> Option<Self> {
        Some(Self {
            context: HostContext(table.context),
            post_message: table.post_message?,
            schedule: table.schedule?,
            init_graphics: table.init_graphics?,
            make_current: table.make_current?,
            resize_buffers: table.resize_buffers?,
            swap_buffers: table.swap_buffers?,
            get_proc_address: table.get_proc_address?,
        })
    }

    fn schedule_fn(self) -> impl Fn() + Send + Sync + 'static {
        let schedule = self.schedule;
        let context = self.context;
        // SAFETY: the host allows `schedule` from any thread.
        move || unsafe { schedule(context.as_ptr()) }
    }
}

/// Delivers outbound messages as JSON text.
#[derive(Debug)]
pub struct FfiHost {
    callbacks: Callbacks,
}

impl Host for FfiHost {
    fn post_message(&mut self, message: HostValue) {
        let json = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(err) => {
                error!(%err, "failed to encode outbound message");
                return;
            }
        };
        // Escaped JSON never contains a raw NUL.
        let Ok(text) = CString::new(json) else {
            error!("outbound message contains a NUL byte");
            return;
        };
        // SAFETY: host callback invoked on the instance thread.
        unsafe { (self.callbacks.post_message)(self.callbacks.context.as_ptr(), text.as_ptr()) };
    }
}

/// GPU surface backed by host callbacks.
#[derive(Debug)]
pub struct FfiSurface {
    callbacks: Callbacks,
}

impl Surface for FfiSurface {
    fn init(&mut self) -> Result<(), GraphicsError> {
        // SAFETY: host callback invoked on the instance thread.
        if unsafe { (self.callbacks.init_graphics)(self.callbacks.context.as_ptr()) } {
            Ok(())
        } else {
            Err(GraphicsError("host could not create a GL context".into()))
        }
    }

    fn make_current(&mut self) {
        // SAFETY: host callback invoked on the instance thread.
        unsafe { (self.callbacks.make_current)(self.callbacks.context.as_ptr()) };
    }

    fn resize_buffers(&mut self, width: i32, height: i32) {
        // SAFETY: host callback invoked on the instance thread.
        unsafe { (self.callbacks.resize_buffers)(self.callbacks.context.as_ptr(), width, height) };
    }

    fn swap_buffers(&mut self, done: PresentDone) {
        let done = done.into_ffi();
        // SAFETY: host callback invoked on the instance thread; the host owns
        // `done` from here on.
        unsafe { (self.callbacks.swap_buffers)(self.callbacks.context.as_ptr(), done) };
    }

    fn proc_address(&self, name: &CStr) -> *mut c_void {
        // SAFETY: host callback invoked on the instance thread.
        unsafe { (self.callbacks.get_proc_address)(self.callbacks.context.as_ptr(), name.as_ptr()) }
    }
}

/// Borrow a C string as UTF-8.
unsafe fn utf8<'a>(text: *const c_char) -> Option<&'a str> {
    if text.is_null() {
        return None;
    }
    // SAFETY: non-null C strings from the host are NUL-terminated.
    unsafe { CStr::from_ptr(text) }.to_str().ok()
}

unsafe fn instance<'a>(instance: *mut MpvjsInstance) -> Option<&'a mut FfiInstance> {
    // SAFETY: non-null instance pointers come from `mpvjs_instance_new`.
    unsafe { instance.as_mut() }.map(|instance| &mut **instance)
}

fn load_engine(library_path: Option<&str>) -> Result<Mpv, mpvjs::InitError> {
    let library = match library_path {
        Some(path) => LibMpv::load(Path::new(path))?,
        None => LibMpv::open_default()?,
    };
    library.create()
}

/// Create an instance and post `{"type":"ready","data":bool}` through the
/// callbacks. Returns null when start-up fails or the callback table is
/// incomplete.
///
/// `library_path` may be null to search the usual libmpv names.
/// `config_json` may be null; otherwise it is an overlay such as
/// `{"verbose":true,"extra_options":[{"name":"hwdec","value":"auto"}]}`.
///
/// # Safety
///
/// `callbacks` must point to a valid table, and the string arguments must be
/// null or NUL-terminated. Must be called on the thread that will own the
/// instance.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mpvjs_instance_new(
    library_path: *const c_char,
    config_json: *const c_char,
    callbacks: *const MpvjsHostCallbacks,
) -> *mut MpvjsInstance {
    let mut config = Config::from_env();
    // SAFETY: per the caller's contract.
    let overlay = unsafe { utf8(config_json) };
    let overlay_result = overlay.map(|json| config.apply_json(json));
    mpvjs::logging::init(&config);
    if let Some(Err(err)) = overlay_result {
        warn!(%err, "ignoring invalid configuration overlay");
    }

    // SAFETY: per the caller's contract.
    let Some(callbacks) = (unsafe { callbacks.as_ref() }).and_then(Callbacks::from_ffi) else {
        error!("host callback table is missing or incomplete");
        return core::ptr::null_mut();
    };
    // SAFETY: per the caller's contract.
    let library_path = unsafe { utf8(library_path) };

    let instance: Option<FfiInstance> = Instance::launch(
        &config,
        FfiSurface { callbacks },
        FfiHost { callbacks },
        callbacks.schedule_fn(),
        || load_engine(library_path),
    );
    instance.into_ffi()
}

/// Handle one inbound JSON message such as
/// `{"type":"command","data":["loadfile","a.mkv"],"id":1}`.
///
/// # Safety
///
/// `instance` must be null or live, `json` null or NUL-terminated. Must be
/// called on the instance thread.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mpvjs_instance_handle_message(
    instance: *mut MpvjsInstance,
    json: *const c_char,
) {
    // SAFETY: per the caller's contract.
    let (Some(instance), Some(json)) = (unsafe { self::instance(instance) }, unsafe { utf8(json) })
    else {
        return;
    };
    match serde_json::from_str::<HostValue>(json) {
        Ok(message) => instance.handle_message(&message),
        Err(err) => debug!(%err, "dropping unparsable host message"),
    }
}

/// Run the work requested through `schedule`.
///
/// # Safety
///
/// `instance` must be null or live. Must be called on the instance thread.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mpvjs_instance_pump(instance: *mut MpvjsInstance) {
    // SAFETY: per the caller's contract.
    if let Some(instance) = unsafe { self::instance(instance) } {
        instance.pump();
    }
}

/// Report a new view size; always triggers a repaint.
///
/// # Safety
///
/// `instance` must be null or live. Must be called on the instance thread.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mpvjs_instance_did_change_view(
    instance: *mut MpvjsInstance,
    view: MpvjsViewGeometry,
) {
    // SAFETY: per the caller's contract.
    if let Some(instance) = unsafe { self::instance(instance) } {
        // SAFETY: plain data.
        instance.did_change_view(unsafe { view.into_rust() });
    }
}

/// Report that the swap which produced `done` has finished. Consumes `done`;
/// callable from any thread.
///
/// # Safety
///
/// `done` must be null or a handle passed to `swap_buffers` that has not been
/// consumed yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mpvjs_present_done(done: *mut MpvjsPresentDone) {
    // SAFETY: per the caller's contract.
    if let Some(done) = unsafe { done.into_rust() } {
        done.complete();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe extern "C" fn record_message(context: *mut c_void, json: *const c_char) {
        let messages = unsafe { &mut *context.cast::<Vec<String>>() };
        messages.push(unsafe { CStr::from_ptr(json) }.to_string_lossy().into_owned());
    }

    unsafe extern "C" fn noop(_context: *mut c_void) {}

    unsafe extern "C" fn graphics_ok(_context: *mut c_void) -> bool {
        true
    }

    unsafe extern "C" fn resize(_context: *mut c_void, _width: i32, _height: i32) {}

    unsafe extern "C" fn swap(_context: *mut c_void, done: *mut MpvjsPresentDone) {
        unsafe { mpvjs_present_drop(done) };
    }

    unsafe extern "C" fn no_proc(_context: *mut c_void, _name: *const c_char) -> *mut c_void {
        core::ptr::null_mut()
    }

    fn callback_table(messages: &mut Vec<String>) -> MpvjsHostCallbacks {
        MpvjsHostCallbacks {
            context: core::ptr::from_mut(messages).cast(),
            post_message: Some(record_message),
            schedule: Some(noop),
            init_graphics: Some(graphics_ok),
            make_current: Some(noop),
            resize_buffers: Some(resize),
            swap_buffers: Some(swap),
            get_proc_address: Some(no_proc),
        }
    }

    #[test]
    fn incomplete_tables_are_rejected() {
        let mut messages = Vec::new();
        let mut table = callback_table(&mut messages);
        assert!(Callbacks::from_ffi(&table).is_some());
        table.swap_buffers = None;
        assert!(Callbacks::from_ffi(&table).is_none());

        let instance = unsafe { mpvjs_instance_new(core::ptr::null(), core::ptr::null(), &table) };
        assert!(instance.is_null());
        assert!(messages.is_empty());
    }

    #[test]
    fn host_receives_json_text() {
        let mut messages = Vec::new();
        let table = callback_table(&mut messages);
        let mut host = FfiHost {
            callbacks: Callbacks::from_ffi(&table).unwrap(),
        };
        host.post_message(mpvjs::instance::ready_message(true));
        assert_eq!(messages, [r#"{"type":"ready","data":true}"#]);
    }

    #[test]
    fn missing_library_reports_not_ready() {
        let mut messages = Vec::new();
        let table = callback_table(&mut messages);
        let instance = unsafe {
            mpvjs_instance_new(c"/nonexistent/libmpv.so".as_ptr(), core::ptr::null(), &table)
        };
        assert!(instance.is_null());
        assert_eq!(messages, [r#"{"type":"ready","data":false}"#]);
    }

    #[test]
    fn null_handles_are_ignored() {
        unsafe {
            mpvjs_instance_pump(core::ptr::null_mut());
            mpvjs_instance_handle_message(core::ptr::null_mut(), c"{}".as_ptr());
            mpvjs_present_done(core::ptr::null_mut());
            mpvjs_present_drop(core::ptr::null_mut());
            mpvjs_instance_drop(core::ptr::null_mut());
        }
    }

    #[test]
    fn view_geometry_converts() {
        let view = MpvjsViewGeometry {
            width: 10.0,
            height: 20.0,
            device_scale: 2.0,
        };
        assert_eq!(unsafe { view.into_rust() }.device_size(), (20, 40));
    }
}
