//! Platform-portable dynamic loading (spec §4.1 "Dynamic linker").

use metacall_value::{ErrorKind, MetaCallResult};
use std::ffi::OsStr;
use std::path::Path;

/// Whether symbol resolution happens eagerly at load time or lazily on
/// first reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    Lazy,
    Now,
}

/// Whether the library's symbols are visible to subsequently loaded
/// libraries (`Global`) or only to the loader's own lookups (`Local`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadScope {
    Local,
    Global,
}

/// The cartesian `{lazy, now} × {local, global}` flag space (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadFlags {
    pub mode: LoadMode,
    pub scope: LoadScope,
}

impl Default for LoadFlags {
    fn default() -> Self {
        LoadFlags {
            mode: LoadMode::Now,
            scope: LoadScope::Local,
        }
    }
}

/// A loaded shared object. Dropping it unloads the library unless the crate
/// is built with the `sanitizer` feature, in which case the handle is
/// leaked so symbolic stack traces from ASan/LSan remain valid (spec §4.1
/// "Unload is a no-op when the build is instrumented for leak/address
/// sanitizers").
pub struct Library {
    inner: Option<libloading::Library>,
    path: std::path::PathBuf,
}

impl Library {
    /// Loads the shared object at `path` with `flags`.
    pub fn load(path: &Path, flags: LoadFlags) -> MetaCallResult<Library> {
        let lib = load_with_flags(path, flags)
            .map_err(|e| ErrorKind::LoadFailed(format!("{}: {e}", path.display())))?;
        Ok(Library {
            inner: Some(lib),
            path: path.to_path_buf(),
        })
    }

    /// Resolves `name` to its address, applying the platform's
    /// [`NameMangler`](crate::mangling::NameMangler). A symbol that fails to
    /// resolve returns `None` rather than propagating a loader error —
    /// callers never crash on a missing symbol (spec §4.1).
    ///
    /// # Safety
    /// The returned pointer is only valid for the lifetime of this
    /// `Library` and must be transmuted to the correct function signature by
    /// the caller before use.
    pub unsafe fn symbol_raw(&self, name: &str) -> Option<*mut std::ffi::c_void> {
        let lib = self.inner.as_ref()?;
        unsafe {
            lib.get::<*mut std::ffi::c_void>(name.as_bytes())
                .ok()
                .map(|sym| *sym)
        }
    }

    /// Path this library was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Explicitly unloads the library ahead of `Drop`, surfacing any error.
    pub fn unload(mut self) -> MetaCallResult<()> {
        if cfg!(feature = "sanitizer") {
            std::mem::forget(self.inner.take());
            return Ok(());
        }
        if let Some(lib) = self.inner.take() {
            lib.close()
                .map_err(|e| ErrorKind::BackEndError(format!("unload: {e}")))?;
        }
        Ok(())
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        if cfg!(feature = "sanitizer") {
            // Leaked intentionally; see `Library` docs.
            self.inner.take().map(std::mem::forget);
        }
    }
}

#[cfg(unix)]
fn load_with_flags(path: &Path, flags: LoadFlags) -> Result<libloading::Library, libloading::Error> {
    use libloading::os::unix::Library as UnixLibrary;
    let mut raw = match flags.mode {
        LoadMode::Lazy => libc::RTLD_LAZY,
        LoadMode::Now => libc::RTLD_NOW,
    };
    raw |= match flags.scope {
        LoadScope::Local => libc::RTLD_LOCAL,
        LoadScope::Global => libc::RTLD_GLOBAL,
    };
    unsafe { UnixLibrary::open(Some(path), raw).map(Into::into) }
}

#[cfg(windows)]
fn load_with_flags(path: &Path, _flags: LoadFlags) -> Result<libloading::Library, libloading::Error> {
    // The Win32 loader has no direct equivalent of RTLD_LOCAL/GLOBAL or
    // lazy binding; flags are accepted for interface symmetry and ignored.
    unsafe { libloading::Library::new(path) }
}

/// Builds the platform-conventional shared-object filename for a bare
/// module name (e.g. `"py"` → `"libpy.so"` on Linux, `"py.dll"` on
/// Windows), writing it into `out` (spec §4.1 `library_path`). Returns the
/// number of bytes written.
pub fn library_path(name: &str, out: &mut [u8]) -> MetaCallResult<usize> {
    let file_name = platform_file_name(name);
    let bytes = file_name.as_encoded_bytes();
    if bytes.len() > out.len() {
        return Err(ErrorKind::BufferTooSmall {
            needed: bytes.len(),
            available: out.len(),
        }
        .into());
    }
    out[..bytes.len()].copy_from_slice(bytes);
    Ok(bytes.len())
}

#[cfg(target_os = "windows")]
fn platform_file_name(name: &str) -> std::ffi::OsString {
    OsStr::new(&format!("{name}.dll")).to_os_string()
}

#[cfg(target_os = "macos")]
fn platform_file_name(name: &str) -> std::ffi::OsString {
    OsStr::new(&format!("lib{name}.dylib")).to_os_string()
}

#[cfg(all(unix, not(target_os = "macos")))]
fn platform_file_name(name: &str) -> std::ffi::OsString {
    OsStr::new(&format!("lib{name}.so")).to_os_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_path_follows_platform_convention() {
        let mut buf = [0u8; 64];
        let n = library_path("py", &mut buf).unwrap();
        let rendered = std::str::from_utf8(&buf[..n]).unwrap();
        #[cfg(all(unix, not(target_os = "macos")))]
        assert_eq!(rendered, "libpy.so");
    }

    #[test]
    fn library_path_reports_undersized_buffer() {
        let mut buf = [0u8; 1];
        let err = library_path("a-fairly-long-module-name", &mut buf).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::BufferTooSmall { .. }));
    }
}
