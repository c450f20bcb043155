//! Platform-facing primitives for the MetaCall polyglot core: dynamic
//! linking (§4.1), symbol name-mangling (§4.1, §9), function-hooking
//! (§4.7), and fork safety (§4.8).

pub mod detour;
pub mod dynlink;
pub mod fork;
pub mod mangling;

pub use detour::Detour;
pub use dynlink::{LoadFlags, LoadMode, LoadScope, Library};
pub use fork::{ForkGuard, ForkSurvivor};
pub use mangling::{platform_mangler, ElfMangler, NameMangler, Win32Mangler};
