//! The `kind` argument to [`crate::log`] (spec §6 `log(kind, ctx)`).

/// Severity of a `metacall::log` event, mapped onto a `tracing` level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogKind {
    pub(crate) fn emit(self, context: &str) {
        match self {
            LogKind::Trace => tracing::trace!(ctx = context, "metacall"),
            LogKind::Debug => tracing::debug!(ctx = context, "metacall"),
            LogKind::Info => tracing::info!(ctx = context, "metacall"),
            LogKind::Warn => tracing::warn!(ctx = context, "metacall"),
            LogKind::Error => tracing::error!(ctx = context, "metacall"),
        }
    }
}
