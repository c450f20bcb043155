//! Platform symbol name-mangling (spec §4.1, §9 "Name-mangled dynamic
//! symbols" — "keep the name-mangling as a platform trait implementation,
//! not as preprocessor macros").

/// Transforms a logical symbol name into the name the platform's dynamic
/// linker actually exports.
pub trait NameMangler: Send + Sync {
    /// Mangles `symbol` for lookup via [`crate::dynlink::Library::symbol_raw`].
    fn mangle(&self, symbol: &str) -> String;
}

/// No-op mangling, correct for ELF (Linux, BSD) and Mach-O (macOS): both
/// export C symbols undecorated.
#[derive(Debug, Default, Clone, Copy)]
pub struct ElfMangler;

impl NameMangler for ElfMangler {
    fn mangle(&self, symbol: &str) -> String {
        symbol.to_string()
    }
}

/// Win32 cdecl mangling: 32-bit MSVC/MinGW targets prefix every exported C
/// symbol with an underscore; 64-bit targets export undecorated.
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Mangler;

impl NameMangler for Win32Mangler {
    fn mangle(&self, symbol: &str) -> String {
        if cfg!(target_pointer_width = "32") {
            format!("_{symbol}")
        } else {
            symbol.to_string()
        }
    }
}

/// The mangler appropriate for the platform this crate was built for.
pub fn platform_mangler() -> Box<dyn NameMangler> {
    if cfg!(target_os = "windows") {
        Box::new(Win32Mangler)
    } else {
        Box::new(ElfMangler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elf_mangling_is_identity() {
        assert_eq!(ElfMangler.mangle("py_loader_impl_interface_singleton"), "py_loader_impl_interface_singleton");
    }
}
