//! OpenGL procedure lookup for the libmpv render context.

use core::ffi::{CStr, c_char, c_void};
use core::fmt;
use core::ptr;

use mpvjs_core::sys::mpv_opengl_init_params;
use tracing::warn;

/// `glReadBuffer` is only reached from libmpv's screenshot path. Hosts running
/// on GLES2 lack it, and a null entry would crash there.
extern "C" fn read_buffer_stub(_mode: u32) {}

/// Timer queries and shader translation lookups that must resolve to null so
/// libmpv skips the features relying on them.
const UNSUPPORTED: [&[u8]; 5] = [
    b"glQueryCounterEXT",
    b"glGetQueryObjectivEXT",
    b"glGetQueryObjecti64vEXT",
    b"glGetQueryObjectui64vEXT",
    b"glGetTranslatedShaderSourceANGLE",
];

/// Resolves GL function names for libmpv, layering fixed overrides over the
/// host's own lookup.
pub struct ProcResolver<'a> {
    lookup: &'a dyn Fn(&CStr) -> *mut c_void,
}

impl fmt::Debug for ProcResolver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcResolver").finish_non_exhaustive()
    }
}

impl<'a> ProcResolver<'a> {
    /// Wrap a host lookup that returns null for names it does not know.
    pub fn new(lookup: &'a dyn Fn(&CStr) -> *mut c_void) -> Self {
        Self { lookup }
    }

    /// Address of the GL function `name`, or null.
    #[must_use]
    pub fn resolve(&self, name: &CStr) -> *mut c_void {
        let bytes = name.to_bytes();
        if bytes == b"glReadBuffer" {
            return read_buffer_stub as extern "C" fn(u32) as *mut c_void;
        }
        if UNSUPPORTED.iter().any(|unsupported| *unsupported == bytes) {
            return ptr::null_mut();
        }

        let address = (self.lookup)(name);
        if address.is_null() {
            warn!(name = %name.to_string_lossy(), "missed GL function");
        }
        address
    }

    /// Init parameters pointing back at this resolver.
    ///
    /// libmpv only calls the lookup while `mpv_render_context_create` runs, so
    /// the resolver must outlive that call and nothing more.
    #[must_use]
    pub fn init_params(&self) -> mpv_opengl_init_params {
        mpv_opengl_init_params {
            get_proc_address: Some(get_proc_address),
            get_proc_address_ctx: ptr::from_ref(self).cast_mut().cast(),
        }
    }
}

/// C entry point handed to libmpv; `ctx` is the resolver from
/// [`ProcResolver::init_params`].
unsafe extern "C" fn get_proc_address(ctx: *mut c_void, name: *const c_char) -> *mut c_void {
    if ctx.is_null() || name.is_null() {
        return ptr::null_mut();
    }
    // SAFETY: ctx was produced by `init_params` and the resolver is alive for
    // the duration of render context creation.
    let resolver = unsafe { &*ctx.cast::<ProcResolver<'_>>() };
    // SAFETY: libmpv passes NUL-terminated names.
    resolver.resolve(unsafe { CStr::from_ptr(name) })
}
