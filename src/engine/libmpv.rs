//! libmpv resolved at runtime with `libloading`.
//!
//! The shared library is opened once and shared between every handle and
//! render context created from it, so it stays mapped until the last of them
//! is dropped.

use core::ffi::{c_char, c_int, c_void};
use core::ptr::{self, NonNull};
use std::cell::RefCell;
use std::ffi::CString;
use std::path::Path;
use std::sync::Arc;

use libloading::Library;
use mpvjs_core::sys::{
    MPV_FORMAT_NODE, MPV_RENDER_API_TYPE_OPENGL, MPV_RENDER_PARAM_API_TYPE,
    MPV_RENDER_PARAM_FLIP_Y, MPV_RENDER_PARAM_INVALID, MPV_RENDER_PARAM_OPENGL_FBO,
    MPV_RENDER_PARAM_OPENGL_INIT_PARAMS, mpv_callback, mpv_event, mpv_event_id, mpv_format,
    mpv_handle, mpv_node, mpv_opengl_fbo, mpv_render_context, mpv_render_param,
};
use mpvjs_core::{OwnedNode, read_c_str};
use tracing::{debug, info, warn};

use super::{Callback, Engine, Fbo, PropertyValue, RenderContext};
use crate::error::{ErrorCode, InitError};
use crate::gl::ProcResolver;

const MPV_ERROR_INVALID_PARAMETER: c_int = -4;
const MPV_ERROR_GENERIC: c_int = -20;

/// Names tried by [`LibMpv::open_default`], newest ABI first.
#[cfg(target_os = "windows")]
const DEFAULT_NAMES: &[&str] = &["libmpv-2.dll", "mpv-2.dll", "mpv-1.dll"];
#[cfg(target_vendor = "apple")]
const DEFAULT_NAMES: &[&str] = &["libmpv.2.dylib", "libmpv.dylib"];
#[cfg(not(any(target_os = "windows", target_vendor = "apple")))]
const DEFAULT_NAMES: &[&str] = &["libmpv.so.2", "libmpv.so.1", "libmpv.so"];

/// Entry points copied out of the library.
struct Api {
    create: unsafe extern "C" fn() -> *mut mpv_handle,
    initialize: unsafe extern "C" fn(*mut mpv_handle) -> c_int,
    terminate_destroy: unsafe extern "C" fn(*mut mpv_handle),
    set_option_string: unsafe extern "C" fn(*mut mpv_handle, *const c_char, *const c_char) -> c_int,
    command_node_async: unsafe extern "C" fn(*mut mpv_handle, u64, *mut mpv_node) -> c_int,
    set_property_async:
        unsafe extern "C" fn(*mut mpv_handle, u64, *const c_char, mpv_format, *mut c_void) -> c_int,
    get_property_async: unsafe extern "C" fn(*mut mpv_handle, u64, *const c_char, mpv_format) -> c_int,
    observe_property: unsafe extern "C" fn(*mut mpv_handle, u64, *const c_char, mpv_format) -> c_int,
    unobserve_property: unsafe extern "C" fn(*mut mpv_handle, u64) -> c_int,
    hook_add: unsafe extern "C" fn(*mut mpv_handle, u64, *const c_char, c_int) -> c_int,
    hook_continue: unsafe extern "C" fn(*mut mpv_handle, u64) -> c_int,
    wait_event: unsafe extern "C" fn(*mut mpv_handle, f64) -> *mut mpv_event,
    set_wakeup_callback: unsafe extern "C" fn(*mut mpv_handle, Option<mpv_callback>, *mut c_void),
    error_string: unsafe extern "C" fn(c_int) -> *const c_char,
    event_name: unsafe extern "C" fn(mpv_event_id) -> *const c_char,
    render_context_create:
        unsafe extern "C" fn(*mut *mut mpv_render_context, *mut mpv_handle, *mut mpv_render_param) -> c_int,
    render_context_free: unsafe extern "C" fn(*mut mpv_render_context),
    render_context_render: unsafe extern "C" fn(*mut mpv_render_context, *mut mpv_render_param) -> c_int,
    render_context_set_update_callback:
        unsafe extern "C" fn(*mut mpv_render_context, Option<mpv_callback>, *mut c_void),
}

/// Copy one function pointer out of `library`.
///
/// # Safety
///
/// `T` must be the exact signature of the exported symbol.
unsafe fn symbol<T: Copy>(library: &Library, name: &'static str) -> Result<T, InitError> {
    unsafe { library.get::<T>(name.as_bytes()) }
        .map(|symbol| *symbol)
        .map_err(|source| InitError::MissingSymbol {
            symbol: name,
            source,
        })
}

macro_rules! load_api {
    ($library:expr, { $($field:ident => $name:literal),* $(,)? }) => {
        // SAFETY: every field type mirrors the prototype in mpv/client.h or
        // mpv/render.h.
        Api { $($field: unsafe { symbol($library, $name)? },)* }
    };
}

/// An opened libmpv shared library.
pub struct LibMpv {
    api: Api,
    // Keeps every pointer in `api` mapped.
    _library: Library,
}

impl core::fmt::Debug for LibMpv {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LibMpv").finish_non_exhaustive()
    }
}

impl LibMpv {
    /// Open libmpv from `path` and resolve every function the bridge calls.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::LibraryLoad`] when the library cannot be opened
    /// and [`InitError::MissingSymbol`] when it lacks a required function.
    pub fn load(path: impl AsRef<Path>) -> Result<Arc<Self>, InitError> {
        let path = path.as_ref();
        // SAFETY: libmpv runs no initialization code with preconditions.
        let library = unsafe { Library::new(path) }.map_err(|source| InitError::LibraryLoad {
            path: path.to_path_buf(),
            source,
        })?;

        let api = load_api!(&library, {
            create => "mpv_create",
            initialize => "mpv_initialize",
            terminate_destroy => "mpv_terminate_destroy",
            set_option_string => "mpv_set_option_string",
            command_node_async => "mpv_command_node_async",
            set_property_async => "mpv_set_property_async",
            get_property_async => "mpv_get_property_async",
            observe_property => "mpv_observe_property",
            unobserve_property => "mpv_unobserve_property",
            hook_add => "mpv_hook_add",
            hook_continue => "mpv_hook_continue",
            wait_event => "mpv_wait_event",
            set_wakeup_callback => "mpv_set_wakeup_callback",
            error_string => "mpv_error_string",
            event_name => "mpv_event_name",
            render_context_create => "mpv_render_context_create",
            render_context_free => "mpv_render_context_free",
            render_context_render => "mpv_render_context_render",
            render_context_set_update_callback => "mpv_render_context_set_update_callback",
        });

        info!(path = %path.display(), "loaded libmpv");
        Ok(Arc::new(Self {
            api,
            _library: library,
        }))
    }

    /// Open libmpv by its usual file names on this platform.
    ///
    /// # Errors
    ///
    /// Returns the error for the last name tried when none can be loaded.
    pub fn open_default() -> Result<Arc<Self>, InitError> {
        let mut last = None;
        for name in DEFAULT_NAMES {
            match Self::load(name) {
                Ok(library) => return Ok(library),
                Err(err) => {
                    debug!(name, %err, "libmpv candidate rejected");
                    last = Some(err);
                }
            }
        }
        Err(last.unwrap_or(InitError::EngineCreate))
    }

    /// Create a fresh, uninitialized client handle.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::EngineCreate`] when `mpv_create` fails.
    ///
    /// Switches the process to the C numeric locale first, which libmpv
    /// requires.
    pub fn create(self: &Arc<Self>) -> Result<Mpv, InitError> {
        use_c_numeric_locale();
        // SAFETY: no preconditions.
        let handle = NonNull::new(unsafe { (self.api.create)() }).ok_or(InitError::EngineCreate)?;
        Ok(Mpv {
            lib: Arc::clone(self),
            handle,
            wakeup: RefCell::new(None),
        })
    }
}

/// Set `LC_NUMERIC` to "C" unless it already is.
fn use_c_numeric_locale() {
    // SAFETY: a null locale only queries the current setting.
    let current = unsafe { read_c_str(libc::setlocale(libc::LC_NUMERIC, ptr::null())) };
    if current.as_deref() == Some("C") {
        return;
    }
    // SAFETY: start-up runs on the host thread, which owns the locale.
    let applied = unsafe { libc::setlocale(libc::LC_NUMERIC, c"C".as_ptr()) };
    if applied.is_null() {
        warn!("could not switch LC_NUMERIC to C");
    } else {
        info!(previous = current.as_deref().unwrap_or("unknown"), "switched LC_NUMERIC to C");
    }
}

fn c_string(text: &str) -> Result<CString, ErrorCode> {
    CString::new(text).map_err(|_| ErrorCode(MPV_ERROR_INVALID_PARAMETER))
}

/// Pair a boxed callback with the trampoline libmpv invokes it through.
fn callback_parts(callback: Option<&Box<Callback>>) -> (Option<mpv_callback>, *mut c_void) {
    callback.map_or((None, ptr::null_mut()), |callback| {
        (
            Some(invoke_callback as mpv_callback),
            ptr::from_ref::<Callback>(callback).cast_mut().cast(),
        )
    })
}

unsafe extern "C" fn invoke_callback(ctx: *mut c_void) {
    // SAFETY: ctx points at the boxed callback owned by the handle or render
    // context that registered it, which unregisters before freeing it.
    let callback = unsafe { &*ctx.cast::<Callback>() };
    callback();
}

/// An owned `mpv_handle`, destroyed with `mpv_terminate_destroy` on drop.
pub struct Mpv {
    lib: Arc<LibMpv>,
    handle: NonNull<mpv_handle>,
    wakeup: RefCell<Option<Box<Callback>>>,
}

impl core::fmt::Debug for Mpv {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Mpv")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl Mpv {
    const fn raw(&self) -> *mut mpv_handle {
        self.handle.as_ptr()
    }

    fn api(&self) -> &Api {
        &self.lib.api
    }
}

impl Engine for Mpv {
    type Render = MpvRenderContext;

    fn set_option_string(&self, name: &str, value: &str) -> Result<(), ErrorCode> {
        let name = c_string(name)?;
        let value = c_string(value)?;
        // SAFETY: live handle, NUL-terminated strings.
        let code = unsafe { (self.api().set_option_string)(self.raw(), name.as_ptr(), value.as_ptr()) };
        ErrorCode::check(code).map(drop)
    }

    fn initialize(&self) -> Result<(), ErrorCode> {
        // SAFETY: live handle.
        ErrorCode::check(unsafe { (self.api().initialize)(self.raw()) }).map(drop)
    }

    fn command_async(&self, reply: u64, args: &mut OwnedNode) -> Result<(), ErrorCode> {
        // SAFETY: the tree is owned by `args` and libmpv copies it before returning.
        let code = unsafe { (self.api().command_node_async)(self.raw(), reply, args.as_mut_ptr()) };
        ErrorCode::check(code).map(drop)
    }

    fn set_property_async(
        &self,
        reply: u64,
        name: &str,
        value: PropertyValue<'_>,
    ) -> Result<(), ErrorCode> {
        let name = c_string(name)?;
        let format = value.format();
        let set = |data: *mut c_void| {
            // SAFETY: `data` points at a value of `format` that lives across
            // the call; libmpv copies it.
            let code = unsafe {
                (self.api().set_property_async)(self.raw(), reply, name.as_ptr(), format, data)
            };
            ErrorCode::check(code).map(drop)
        };

        match value {
            PropertyValue::String(text) => {
                let text = c_string(text)?;
                let mut string: *const c_char = text.as_ptr();
                set(ptr::addr_of_mut!(string).cast())
            }
            PropertyValue::Flag(flag) => {
                let mut flag = c_int::from(flag);
                set(ptr::addr_of_mut!(flag).cast())
            }
            PropertyValue::Int64(mut int) => set(ptr::addr_of_mut!(int).cast()),
            PropertyValue::Double(mut double) => set(ptr::addr_of_mut!(double).cast()),
        }
    }

    fn get_property_async(&self, reply: u64, name: &str) -> Result<(), ErrorCode> {
        let name = c_string(name)?;
        // SAFETY: live handle, NUL-terminated name.
        let code = unsafe {
            (self.api().get_property_async)(self.raw(), reply, name.as_ptr(), MPV_FORMAT_NODE)
        };
        ErrorCode::check(code).map(drop)
    }

    fn observe_property(&self, reply: u64, name: &str) -> Result<(), ErrorCode> {
        let name = c_string(name)?;
        // SAFETY: live handle, NUL-terminated name.
        let code = unsafe {
            (self.api().observe_property)(self.raw(), reply, name.as_ptr(), MPV_FORMAT_NODE)
        };
        ErrorCode::check(code).map(drop)
    }

    fn unobserve_property(&self, reply: u64) -> Result<i32, ErrorCode> {
        // SAFETY: live handle.
        ErrorCode::check(unsafe { (self.api().unobserve_property)(self.raw(), reply) })
    }

    fn hook_add(&self, reply: u64, name: &str, priority: i32) -> Result<(), ErrorCode> {
        let name = c_string(name)?;
        // SAFETY: live handle, NUL-terminated name.
        let code = unsafe { (self.api().hook_add)(self.raw(), reply, name.as_ptr(), priority) };
        ErrorCode::check(code).map(drop)
    }

    fn hook_continue(&self, id: u64) -> Result<(), ErrorCode> {
        // SAFETY: live handle.
        ErrorCode::check(unsafe { (self.api().hook_continue)(self.raw(), id) }).map(drop)
    }

    fn wait_event(&self, timeout: f64) -> Option<NonNull<mpv_event>> {
        // SAFETY: live handle; the event is owned by libmpv.
        NonNull::new(unsafe { (self.api().wait_event)(self.raw(), timeout) })
    }

    fn set_wakeup_callback(&self, callback: Option<Callback>) {
        let callback = callback.map(Box::new);
        let (trampoline, ctx) = callback_parts(callback.as_ref());
        // SAFETY: ctx stays alive in `self.wakeup` until replaced, and libmpv
        // no longer calls the previous callback once this returns.
        unsafe { (self.api().set_wakeup_callback)(self.raw(), trampoline, ctx) };
        drop(self.wakeup.replace(callback));
    }

    fn create_render_context(
        &self,
        resolver: &ProcResolver<'_>,
    ) -> Result<Self::Render, ErrorCode> {
        let mut init = resolver.init_params();
        let mut params = [
            mpv_render_param {
                type_: MPV_RENDER_PARAM_API_TYPE,
                data: MPV_RENDER_API_TYPE_OPENGL.as_ptr().cast_mut().cast(),
            },
            mpv_render_param {
                type_: MPV_RENDER_PARAM_OPENGL_INIT_PARAMS,
                data: ptr::addr_of_mut!(init).cast(),
            },
            mpv_render_param {
                type_: MPV_RENDER_PARAM_INVALID,
                data: ptr::null_mut(),
            },
        ];

        let mut context = ptr::null_mut();
        // SAFETY: params is terminated by INVALID, and both it and the
        // resolver outlive the call.
        let code = unsafe {
            (self.api().render_context_create)(&raw mut context, self.raw(), params.as_mut_ptr())
        };
        ErrorCode::check(code)?;

        let context = NonNull::new(context).ok_or(ErrorCode(MPV_ERROR_GENERIC))?;
        Ok(MpvRenderContext {
            lib: Arc::clone(&self.lib),
            context,
            update: RefCell::new(None),
        })
    }

    fn error_string(&self, code: i32) -> String {
        // SAFETY: mpv_error_string accepts any code and returns a static string.
        unsafe { read_c_str((self.api().error_string)(code)) }.unwrap_or_default()
    }

    fn event_name(&self, event_id: mpv_event_id) -> Option<String> {
        // SAFETY: returns a static string, or null for unknown ids.
        unsafe { read_c_str((self.api().event_name)(event_id)) }
    }
}

impl Drop for Mpv {
    fn drop(&mut self) {
        // SAFETY: the handle is live and never used again.
        unsafe { (self.api().terminate_destroy)(self.raw()) };
        debug!("mpv handle destroyed");
    }
}

/// An owned OpenGL `mpv_render_context`, freed on drop.
pub struct MpvRenderContext {
    lib: Arc<LibMpv>,
    context: NonNull<mpv_render_context>,
    update: RefCell<Option<Box<Callback>>>,
}

impl core::fmt::Debug for MpvRenderContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MpvRenderContext")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl RenderContext for MpvRenderContext {
    fn render(&self, fbo: Fbo, flip_y: bool) -> Result<(), ErrorCode> {
        let mut target = mpv_opengl_fbo {
            fbo: fbo.id,
            w: fbo.width,
            h: fbo.height,
            internal_format: 0,
        };
        let mut flip = c_int::from(flip_y);
        let mut params = [
            mpv_render_param {
                type_: MPV_RENDER_PARAM_OPENGL_FBO,
                data: ptr::addr_of_mut!(target).cast(),
            },
            mpv_render_param {
                type_: MPV_RENDER_PARAM_FLIP_Y,
                data: ptr::addr_of_mut!(flip).cast(),
            },
            mpv_render_param {
                type_: MPV_RENDER_PARAM_INVALID,
                data: ptr::null_mut(),
            },
        ];
        // SAFETY: live context; params terminated by INVALID.
        let code = unsafe {
            (self.lib.api.render_context_render)(self.context.as_ptr(), params.as_mut_ptr())
        };
        ErrorCode::check(code).map(drop)
    }

    fn set_update_callback(&self, callback: Option<Callback>) {
        let callback = callback.map(Box::new);
        let (trampoline, ctx) = callback_parts(callback.as_ref());
        // SAFETY: as for the wakeup callback.
        unsafe {
            (self.lib.api.render_context_set_update_callback)(self.context.as_ptr(), trampoline, ctx);
        };
        drop(self.update.replace(callback));
    }
}

impl Drop for MpvRenderContext {
    fn drop(&mut self) {
        // SAFETY: the context is live and never used again. Freeing it also
        // stops update callbacks before `update` is dropped.
        unsafe { (self.lib.api.render_context_free)(self.context.as_ptr()) };
        debug!("mpv render context freed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric_locale() -> Option<String> {
        unsafe { read_c_str(libc::setlocale(libc::LC_NUMERIC, ptr::null())) }
    }

    #[test]
    fn numeric_locale_is_forced_to_c() {
        // Whatever the environment selects, possibly already "C".
        unsafe { libc::setlocale(libc::LC_NUMERIC, c"".as_ptr()) };
        use_c_numeric_locale();
        assert_eq!(numeric_locale().as_deref(), Some("C"));

        use_c_numeric_locale();
        assert_eq!(numeric_locale().as_deref(), Some("C"));
    }

    #[test]
    fn missing_library_is_a_load_error() {
        let err = LibMpv::load("/nonexistent/libmpv.so").unwrap_err();
        assert!(matches!(err, InitError::LibraryLoad { .. }));
    }
}
