//! Error types for the bridge.

use core::fmt;
use std::path::PathBuf;

use mpvjs_core::sys;
use thiserror::Error;

/// A negative status code returned by libmpv.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    /// Turn a libmpv status into a `Result`, keeping non-negative values.
    ///
    /// # Errors
    ///
    /// Returns the code itself when it is negative.
    pub const fn check(code: i32) -> Result<i32, Self> {
        if code < 0 { Err(Self(code)) } else { Ok(code) }
    }

    /// The raw status code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self.0
    }

    /// The message libmpv uses for this code.
    #[must_use]
    pub const fn message(self) -> &'static str {
        sys::error_string(self.0)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.0)
    }
}

impl std::error::Error for ErrorCode {}

/// The graphics surface could not be set up.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct GraphicsError(pub String);

/// Reasons an instance fails to come up.
///
/// Any of these is reported to the host as `ready: false` and is fatal to the
/// instance.
#[derive(Debug, Error)]
pub enum InitError {
    /// The GPU context could not be created or bound.
    #[error("unable to initialize graphics: {0}")]
    Graphics(#[from] GraphicsError),
    /// The libmpv shared library could not be opened.
    #[error("failed to load libmpv from {}: {source}", path.display())]
    LibraryLoad {
        /// Library that was tried.
        path: PathBuf,
        /// Loader error.
        #[source]
        source: libloading::Error,
    },
    /// libmpv was opened but lacks a function the bridge calls.
    #[error("libmpv is missing symbol '{symbol}': {source}")]
    MissingSymbol {
        /// The symbol name that was expected.
        symbol: &'static str,
        /// Loader error.
        #[source]
        source: libloading::Error,
    },
    /// `mpv_create` returned null.
    #[error("mpv context creation failed")]
    EngineCreate,
    /// `mpv_initialize` failed.
    #[error("mpv initialization failed: {0}")]
    EngineInitialize(ErrorCode),
    /// `mpv_render_context_create` failed.
    #[error("failed to initialize mpv GL context: {0}")]
    RenderContext(ErrorCode),
}
