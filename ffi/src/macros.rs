/// Declares an opaque handle type wrapping `$ty`, with `IntoFFI`/`IntoRust`
/// conversions through a boxed pointer and an exported drop function.
///
/// # Example
///
/// ```ignore
/// opaque!(MpvjsInstance, FfiInstance, mpvjs_instance_drop);
/// ```
macro_rules! opaque {
    ($name:ident, $ty:ty, $drop:ident) => {
        #[doc = concat!("Opaque handle owning a `", stringify!($ty), "`.")]
        #[allow(missing_debug_implementations)]
        pub struct $name(pub(crate) $ty);

        $crate::impl_deref!($name, $ty);

        impl $crate::IntoFFI for $ty {
            type FFI = *mut $name;
            fn into_ffi(self) -> Self::FFI {
                Box::into_raw(Box::new($name(self)))
            }
        }

        impl $crate::IntoFFI for Option<$ty> {
            type FFI = *mut $name;
            fn into_ffi(self) -> Self::FFI {
                self.map_or(core::ptr::null_mut(), $crate::IntoFFI::into_ffi)
            }
        }

        impl $crate::IntoRust for *mut $name {
            type Rust = Option<$ty>;
            unsafe fn into_rust(self) -> Self::Rust {
                if self.is_null() {
                    None
                } else {
                    // SAFETY: non-null pointers of this type come from `into_ffi`.
                    Some(unsafe { Box::from_raw(self) }.0)
                }
            }
        }

        /// Release a handle. Null is ignored.
        ///
        /// # Safety
        ///
        /// `value` must be null or a pointer obtained from this library that
        /// has not been released yet.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $drop(value: *mut $name) {
            unsafe {
                let _ = $crate::IntoRust::into_rust(value);
            }
        }
    };
}

/// Implements `Deref`/`DerefMut` from a newtype to its inner value.
#[macro_export]
macro_rules! impl_deref {
    ($ty:ty, $target:ty) => {
        impl core::ops::Deref for $ty {
            type Target = $target;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl core::ops::DerefMut for $ty {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }
    };
}
