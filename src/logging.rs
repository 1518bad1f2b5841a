//! Log sinks owned by a single reconcile invocation.
//!
//! The batch driver receives a `&mut dyn LogSink` instead of writing to a
//! process-wide logger, so tests can inspect exactly what a run reported.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub level: Level,
    pub stage: &'static str,
    pub key: Option<String>,
    pub detail: String,
}

pub trait LogSink {
    fn emit(&mut self, event: LogEvent);

    fn info(&mut self, stage: &'static str, key: Option<&str>, detail: String) {
        self.emit(LogEvent {
            level: Level::Info,
            stage,
            key: key.map(ToOwned::to_owned),
            detail,
        });
    }

    fn warn(&mut self, stage: &'static str, key: Option<&str>, detail: String) {
        self.emit(LogEvent {
            level: Level::Warn,
            stage,
            key: key.map(ToOwned::to_owned),
            detail,
        });
    }

    fn error(&mut self, stage: &'static str, key: Option<&str>, detail: String) {
        self.emit(LogEvent {
            level: Level::Error,
            stage,
            key: key.map(ToOwned::to_owned),
            detail,
        });
    }
}

fn sanitize_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_sep = false;
    for ch in value.chars() {
        if ch.is_whitespace() {
            if !out.is_empty() && !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else if !ch.is_control() {
            out.push(ch);
            prev_sep = false;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "na".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn format_event(event: &LogEvent) -> String {
    format!(
        "QA_RECONCILE_{} stage={} key={} detail={:?}",
        event.level.as_str(),
        sanitize_value(event.stage),
        sanitize_value(event.key.as_deref().unwrap_or("")),
        event.detail,
    )
}

/// Writes one line per event to stderr, dropping events below `min_level`.
#[derive(Debug, Clone)]
pub struct StderrSink {
    min_level: Level,
}

impl StderrSink {
    pub fn new(quiet: bool) -> Self {
        Self {
            min_level: if quiet { Level::Warn } else { Level::Info },
        }
    }
}

impl LogSink for StderrSink {
    fn emit(&mut self, event: LogEvent) {
        if event.level < self.min_level {
            return;
        }
        eprintln!("{}", format_event(&event));
    }
}

#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub events: Vec<LogEvent>,
}

#[cfg(test)]
impl MemorySink {
    pub fn at_level(&self, level: Level) -> impl Iterator<Item = &LogEvent> {
        self.events.iter().filter(move |e| e.level == level)
    }
}

#[cfg(test)]
impl LogSink for MemorySink {
    fn emit(&mut self, event: LogEvent) {
        self.events.push(event);
    }
}
