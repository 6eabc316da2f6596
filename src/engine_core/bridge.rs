// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Logging bridge.
//!
//! Forwards leveled messages to an attached [`LogSink`]. With no sink every
//! call is a silent no-op.

use crate::engine_core::models::LogLevel;
use crate::engine_core::traits::LogSink;
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Default)]
pub struct LogBridge {
    sink: RwLock<Option<Arc<dyn LogSink>>>,
}

impl LogBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, sink: Arc<dyn LogSink>) {
        *self.sink.write() = Some(sink);
    }

    pub fn detach(&self) {
        *self.sink.write() = None;
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        let sink = self.sink.read().clone();
        if let Some(sink) = sink {
            sink.log(level, message);
        }
    }

    pub fn console(&self, message: &str) {
        self.log(LogLevel::Console, message)
    }

    pub fn trace(&self, message: &str) {
        self.log(LogLevel::Trace, message)
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message)
    }

    pub fn notice(&self, message: &str) {
        self.log(LogLevel::Notice, message)
    }

    pub fn warning(&self, message: &str) {
        self.log(LogLevel::Warning, message)
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message)
    }

    /// Records at panic level; never unwinds.
    pub fn panic(&self, message: &str) {
        self.log(LogLevel::Panic, message)
    }

    pub fn fatal(&self, message: &str) {
        self.log(LogLevel::Fatal, message)
    }
}

/// Sink that forwards to `tracing`.
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Trace => tracing::trace!("{}", message),
            LogLevel::Debug => tracing::debug!("{}", message),
            LogLevel::Console | LogLevel::Info | LogLevel::Notice => tracing::info!("{}", message),
            LogLevel::Warning => tracing::warn!("{}", message),
            LogLevel::Error | LogLevel::Panic | LogLevel::Fatal => tracing::error!("{}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        lines: Mutex<Vec<(LogLevel, String)>>,
    }

    impl LogSink for Recorder {
        fn log(&self, level: LogLevel, message: &str) {
            self.lines.lock().push((level, message.to_string()));
        }
    }

    #[test]
    fn test_without_sink_is_noop() {
        let bridge = LogBridge::new();
        bridge.fatal("nobody listens");
        bridge.panic("still fine");
    }

    #[test]
    fn test_levels_reach_sink() {
        let bridge = LogBridge::new();
        let recorder = Arc::new(Recorder::default());
        bridge.attach(recorder.clone());
        bridge.notice("hello");
        bridge.warning("careful");
        bridge.detach();
        bridge.error("dropped");

        let lines = recorder.lines.lock();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], (LogLevel::Notice, "hello".to_string()));
        assert_eq!(lines[1].0, LogLevel::Warning);
    }
}
