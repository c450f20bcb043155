//! Pluggable value ↔ wire codecs (spec §4.3 "Serial").

pub mod codec;
pub mod json;
pub mod native;

pub use codec::Serial;
pub use json::JsonSerial;
pub use native::NativeSerial;
