// Copyright 2024 FastLabs Developers
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

//! Bridge from the `log` crate facade.

use std::sync::Mutex;
use std::sync::PoisonError;

use log::LevelFilter;

use crate::ElasticLog;
use crate::LogEntry;
use crate::Message;
use crate::SaveOutcome;

// Records of this crate and of the HTTP stack shipping a batch are never buffered, so shipping
// cannot feed itself.
const SHIPPING_TARGETS: &[&str] = &[
    "elasticlog",
    "reqwest",
    "hyper",
    "hyper_util",
    "h2",
    "rustls",
    "native_tls",
    "tokio",
    "want",
    "mio",
];

const DEFAULT_MAX_BUFFERED: usize = 1024;

fn is_shipping_target(target: &str) -> bool {
    SHIPPING_TARGETS.iter().any(|name| {
        target
            .strip_prefix(*name)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
    })
}

#[derive(Debug, Default)]
struct Buffer {
    entries: Vec<LogEntry>,
    records: usize,
}

/// A [`log::Log`] buffering records by channel and shipping them on flush.
///
/// The channel of a record is its lowercase level, or the SQL channel when the record target is
/// that channel. Every call to [`log::Log::flush`] is one save call. Once
/// [`max_buffered`](ElasticLogger::max_buffered) records are waiting, the logging thread ships
/// them itself.
///
/// # Examples
///
/// ```
/// use elasticlog::Config;
/// use elasticlog::ElasticConfig;
/// use elasticlog::ElasticLog;
/// use elasticlog::ElasticLogger;
///
/// let handler = ElasticLog::builder(Config::default(), ElasticConfig::default())
///     .build()
///     .unwrap();
/// ElasticLogger::new(handler).apply().unwrap();
///
/// log::info!("user signed in");
/// log::info!(target: "sql", "SELECT * FROM user : 0.0012");
/// ```
#[derive(Debug)]
pub struct ElasticLogger {
    handler: ElasticLog,
    max_level: LevelFilter,
    max_buffered: usize,
    buffer: Mutex<Buffer>,
}

impl ElasticLogger {
    pub fn new(handler: ElasticLog) -> Self {
        Self {
            handler,
            max_level: LevelFilter::Trace,
            max_buffered: DEFAULT_MAX_BUFFERED,
            buffer: Mutex::new(Buffer::default()),
        }
    }

    /// Set the most verbose level buffered.
    ///
    /// This will be passed to [`log::set_max_level`] on [`ElasticLogger::apply`].
    #[must_use = "call `apply` to set the global logger"]
    pub fn max_level(mut self, max_level: LevelFilter) -> Self {
        self.max_level = max_level;
        self
    }

    /// Set how many records are buffered before they are shipped without a flush.
    ///
    /// Defaults to 1024. A value of `0` is treated as `1`.
    pub fn max_buffered(mut self, max_buffered: usize) -> Self {
        self.max_buffered = max_buffered.max(1);
        self
    }

    /// Set up the global logger with the [`ElasticLogger`] instance.
    ///
    /// # Errors
    ///
    /// An error is returned if the global logger has already been set.
    pub fn apply(self) -> Result<(), log::SetLoggerError> {
        let max_level = self.max_level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(max_level);
        Ok(())
    }

    /// Ship the buffered records as one save call.
    pub fn flush_outcome(&self) -> SaveOutcome {
        let entries = {
            let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *buffer).entries
        };
        self.handler.save_outcome(&entries)
    }

    fn channel(&self, record: &log::Record) -> String {
        let sql_channel = self.handler.sql_channel();
        if record.target() == sql_channel {
            sql_channel.to_owned()
        } else {
            record.level().as_str().to_ascii_lowercase()
        }
    }
}

impl log::Log for ElasticLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.max_level && !is_shipping_target(metadata.target())
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let channel = self.channel(record);
        let message = Message::Text(record.args().to_string());

        let full = {
            let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
            match buffer.entries.iter_mut().find(|entry| entry.channel == channel) {
                Some(entry) => entry.messages.push(message),
                None => buffer.entries.push(LogEntry {
                    channel,
                    messages: vec![message],
                }),
            }
            buffer.records += 1;
            buffer.records >= self.max_buffered
        };

        if full {
            self.flush_outcome();
        }
    }

    fn flush(&self) {
        self.flush_outcome();
    }
}

#[cfg(test)]
mod tests {
    use log::Log;

    use super::*;
    use crate::Config;
    use crate::Document;
    use crate::ElasticConfig;
    use crate::dispatch::testing::RecordingTransport;

    fn logger(transport: &RecordingTransport) -> ElasticLogger {
        let handler = ElasticLog::builder(Config::default(), ElasticConfig::default())
            .transport(transport.clone())
            .build()
            .unwrap();
        ElasticLogger::new(handler).max_level(LevelFilter::Info)
    }

    fn record<'a>(
        level: log::Level,
        target: &'a str,
        args: std::fmt::Arguments<'a>,
    ) -> log::Record<'a> {
        log::Record::builder()
            .level(level)
            .target(target)
            .args(args)
            .build()
    }

    #[test]
    fn test_records_are_grouped_by_channel() {
        let transport = RecordingTransport::default();
        let logger = logger(&transport);

        logger.log(&record(log::Level::Info, "app", format_args!("first")));
        logger.log(&record(log::Level::Error, "app", format_args!("boom")));
        logger.log(&record(log::Level::Info, "app", format_args!("second")));
        logger.log(&record(log::Level::Debug, "app", format_args!("too verbose")));
        logger.log(&record(log::Level::Info, "sql", format_args!("SELECT 1 : 0.5")));
        logger.log(&record(log::Level::Warn, "elasticlog::handler", format_args!("own")));

        {
            let buffer = logger.buffer.lock().unwrap();
            let channels = buffer
                .entries
                .iter().map(|e| e.channel.as_str()).collect::<Vec<_>>();
            assert_eq!(channels, ["info", "error", "sql"]);
            assert_eq!(buffer.entries[0].messages.len(), 2);
            assert_eq!(buffer.records, 4);
        }

        assert!(logger.flush_outcome().is_success());
        assert!(logger.buffer.lock().unwrap().entries.is_empty());

        let bodies = transport.bodies();
        assert_eq!(bodies.len(), 1);
        let document: Document = serde_json::from_str(bodies[0].lines().nth(1).unwrap()).unwrap();
        assert_eq!(document.runtime, 0.5);
        assert!(document.log.contains("[info] second"));
        assert!(!document.log.contains("too verbose"));
        assert!(!document.log.contains("own"));
    }

    #[test]
    fn test_flush_without_records() {
        let transport = RecordingTransport::default();
        let logger = logger(&transport);
        logger.flush();
        assert!(transport.bodies().is_empty());
    }

    #[test]
    fn test_http_stack_records_are_not_shipped() {
        let transport = RecordingTransport::default();
        let logger = logger(&transport);

        logger.log(&record(log::Level::Info, "app", format_args!("hello")));
        assert!(logger.flush_outcome().is_success());

        // emitted while the batch above was on the wire
        for target in [
            "reqwest::connect",
            "hyper_util::client::legacy::pool",
            "h2",
            "rustls::client",
        ] {
            logger.log(&record(log::Level::Info, target, format_args!("connecting")));
        }
        logger.log(&record(log::Level::Info, "hyperion", format_args!("kept")));
        assert_eq!(logger.buffer.lock().unwrap().records, 1);
        assert!(logger.flush_outcome().is_success());
        assert!(matches!(logger.flush_outcome(), SaveOutcome::Idle));
        assert_eq!(transport.bodies().len(), 2);
    }

    #[test]
    fn test_full_buffer_is_shipped_without_flush() {
        let transport = RecordingTransport::default();
        let logger = logger(&transport).max_buffered(3);

        logger.log(&record(log::Level::Info, "app", format_args!("one")));
        logger.log(&record(log::Level::Error, "app", format_args!("two")));
        assert!(transport.bodies().is_empty());

        logger.log(&record(log::Level::Info, "app", format_args!("three")));
        assert_eq!(transport.bodies().len(), 1);
        assert_eq!(logger.buffer.lock().unwrap().records, 0);

        logger.log(&record(log::Level::Info, "app", format_args!("four")));
        assert_eq!(transport.bodies().len(), 1);
        assert_eq!(logger.buffer.lock().unwrap().records, 1);
    }
}
