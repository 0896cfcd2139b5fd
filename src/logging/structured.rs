//! Component-scoped loggers
//!
//! Every event carries the component name and, when known, the charger
//! address as tracing fields, so JSON output can be filtered per device.

use tracing::Level;

/// Context attached to every event of a [`StructuredLogger`]
#[derive(Debug, Clone)]
pub struct LogContext {
    /// Component name (e.g., "poller", "session", "web")
    pub component: String,
    /// Charger address the component talks to
    pub device: Option<String>,
}

impl LogContext {
    pub fn new(component: &str) -> Self {
        Self {
            component: component.to_string(),
            device: None,
        }
    }

    pub fn with_device(mut self, device: &str) -> Self {
        self.device = Some(device.to_string());
        self
    }
}

#[derive(Debug, Clone)]
pub struct StructuredLogger {
    context: LogContext,
}

impl StructuredLogger {
    pub fn new(context: LogContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &LogContext {
        &self.context
    }

    pub fn info(&self, message: &str) {
        self.emit(Level::INFO, message);
    }

    pub fn warn(&self, message: &str) {
        self.emit(Level::WARN, message);
    }

    pub fn error(&self, message: &str) {
        self.emit(Level::ERROR, message);
    }

    pub fn debug(&self, message: &str) {
        self.emit(Level::DEBUG, message);
    }

    pub fn trace(&self, message: &str) {
        self.emit(Level::TRACE, message);
    }

    // tracing needs the level at compile time, hence one arm per level
    fn emit(&self, level: Level, message: &str) {
        let component = self.context.component.as_str();
        let device = self.context.device.as_deref().unwrap_or("-");
        match level {
            Level::ERROR => tracing::error!(component, device, "{}", message),
            Level::WARN => tracing::warn!(component, device, "{}", message),
            Level::INFO => tracing::info!(component, device, "{}", message),
            Level::DEBUG => tracing::debug!(component, device, "{}", message),
            _ => tracing::trace!(component, device, "{}", message),
        }
    }
}

/// Create a logger for a specific component
pub fn get_logger(component: &str) -> StructuredLogger {
    StructuredLogger::new(LogContext::new(component))
}

pub fn get_logger_with_context(context: LogContext) -> StructuredLogger {
    StructuredLogger::new(context)
}
