//! Operator-facing log sink.
//!
//! Everything is logged through `tracing`. Front ends that want the same
//! messages as plain lines (a GUI log pane, for instance) register a
//! [`LogSink`]; each message is forwarded as `[HH:MM:SS] message`.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use chrono::Local;
use tracing::{info, warn};

/// Callback receiving formatted log lines.
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Fans messages out to `tracing` and the optional sink.
#[derive(Clone, Default)]
pub struct Notifier {
    sink: Option<LogSink>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(sink: LogSink) -> Self {
        Self { sink: Some(sink) }
    }

    pub fn info(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        info!("{}", message);
        self.forward(message);
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        warn!("{}", message);
        self.forward(message);
    }

    fn forward(&self, message: &str) {
        let Some(sink) = &self.sink else {
            return;
        };
        let line = format!("[{}] {}", Local::now().format("%H:%M:%S"), message);
        if catch_unwind(AssertUnwindSafe(|| sink(&line))).is_err() {
            warn!("Log sink panicked; message kept in tracing output only");
        }
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("sink", &self.sink.as_ref().map(|_| "<callback>"))
            .finish()
    }
}
