//! Logging bootstrap built on `tracing`/`tracing-subscriber`, mirroring the
//! teacher framework's `LoggingBuilder`/`SpanEvents`, adapted for a single
//! embeddable library rather than a standalone bot process.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Controls which span lifecycle events are emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpanEvents {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

impl SpanEvents {
    pub const NONE: Self = Self {
        new: false,
        enter: false,
        exit: false,
        close: false,
    };

    pub const LIFECYCLE: Self = Self {
        new: true,
        enter: false,
        exit: false,
        close: true,
    };

    pub const FULL: Self = Self {
        new: true,
        enter: true,
        exit: true,
        close: true,
    };

    fn to_fmt_span(self) -> fmt::format::FmtSpan {
        let mut span = fmt::format::FmtSpan::NONE;
        if self.new {
            span |= fmt::format::FmtSpan::NEW;
        }
        if self.enter {
            span |= fmt::format::FmtSpan::ENTER;
        }
        if self.exit {
            span |= fmt::format::FmtSpan::EXIT;
        }
        if self.close {
            span |= fmt::format::FmtSpan::CLOSE;
        }
        span
    }
}

/// Builds and installs a global `tracing` subscriber for the core's own
/// diagnostic output (loader lifecycle, discovery, invoke dispatch).
#[derive(Default)]
pub struct LoggingBuilder {
    directives: Vec<String>,
    level: Option<tracing::Level>,
    span_events: SpanEvents,
    with_target: bool,
    with_thread_ids: bool,
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default level used when `RUST_LOG` is unset.
    pub fn with_level(mut self, level: tracing::Level) -> Self {
        self.level = Some(level);
        self
    }

    /// Adds a filter directive (e.g. `"metacall_framework=debug"`).
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Configures span lifecycle logging, useful for tracing loader
    /// initialisation and invoke dispatch.
    pub fn with_span_events(mut self, events: SpanEvents) -> Self {
        self.span_events = events;
        self
    }

    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    pub fn with_thread_ids(mut self, enabled: bool) -> Self {
        self.with_thread_ids = enabled;
        self
    }

    fn build_filter(&self) -> EnvFilter {
        let base = self.level.map(level_str).unwrap_or("info");
        let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(base));
        for directive in &self.directives {
            if let Ok(d) = directive.parse() {
                filter = filter.add_directive(d);
            }
        }
        filter
    }

    /// Installs the subscriber globally. Panics if one is already set.
    pub fn init(self) {
        let filter = self.build_filter();
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_span_events(self.span_events.to_fmt_span())
                    .with_target(self.with_target)
                    .with_thread_ids(self.with_thread_ids),
            )
            .with(filter)
            .init();
    }

    /// Installs the subscriber globally, returning an error instead of
    /// panicking if one is already set.
    pub fn try_init(self) -> Result<(), tracing_subscriber::util::TryInitError> {
        let filter = self.build_filter();
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_span_events(self.span_events.to_fmt_span())
                    .with_target(self.with_target)
                    .with_thread_ids(self.with_thread_ids),
            )
            .with(filter)
            .try_init()
    }
}

fn level_str(level: tracing::Level) -> &'static str {
    match level {
        tracing::Level::TRACE => "trace",
        tracing::Level::DEBUG => "debug",
        tracing::Level::INFO => "info",
        tracing::Level::WARN => "warn",
        tracing::Level::ERROR => "error",
    }
}
