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

//! The save pipeline: format, route, build, dispatch and notify.

use jiff::tz::TimeZone;

use crate::Config;
use crate::ElasticConfig;
use crate::Error;
use crate::Message;
use crate::dispatch::BulkDispatcher;
use crate::document::BatchBuilder;
use crate::document::ChannelLines;
use crate::document::Document;
use crate::document::FormattedLine;
use crate::layout::Layout;
use crate::notice::Notice;
use crate::notice::notify_isolated;
use crate::route::Router;
use crate::time::Clock;
use crate::time::TimeFormat;
use crate::transport::HttpTransport;
use crate::transport::Transport;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

/// The raw messages of one channel, in logging order.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub channel: String,
    pub messages: Vec<Message>,
}

impl LogEntry {
    /// Create an entry for `channel`.
    ///
    /// ```
    /// use elasticlog::LogEntry;
    /// use elasticlog::Message;
    ///
    /// let entry = LogEntry::new("info", ["user signed in", "user signed out"]);
    /// assert_eq!(entry.messages[0], Message::from("user signed in"));
    /// ```
    pub fn new<M>(channel: impl Into<String>, messages: impl IntoIterator<Item = M>) -> Self
    where
        M: Into<Message>,
    {
        Self {
            channel: channel.into(),
            messages: messages.into_iter().map(Into::into).collect(),
        }
    }
}

/// What a save call did.
#[derive(Debug)]
pub enum SaveOutcome {
    /// There was nothing to ship.
    Idle,
    /// Every group was dropped as an SQL probe.
    Suppressed { dropped: Vec<String> },
    /// The bulk request went through.
    Shipped {
        documents: usize,
        /// Destinations of the groups dropped as SQL probes.
        dropped: Vec<String>,
        /// Documents the cluster refused inside an otherwise successful response.
        rejected: usize,
    },
    /// The bulk request failed; nothing was stored.
    Failed { documents: usize, error: Error },
}

impl SaveOutcome {
    /// Whether the save call counts as successful. Only a failed bulk request is a failure.
    pub fn is_success(&self) -> bool {
        !matches!(self, SaveOutcome::Failed { .. })
    }
}

/// A log handler shipping each save call as documents to Elasticsearch.
///
/// The handler is `Send + Sync`. Concurrent save calls build independent batches and share the
/// pooled HTTP client.
///
/// # Examples
///
/// ```
/// use elasticlog::Config;
/// use elasticlog::ElasticConfig;
/// use elasticlog::ElasticLog;
/// use elasticlog::LogEntry;
///
/// let handler = ElasticLog::builder(Config::default(), ElasticConfig::default())
///     .build()
///     .unwrap();
///
/// // nothing to ship, so no request is made
/// assert!(handler.save(&[LogEntry::new("info", Vec::<String>::new())]));
/// ```
#[derive(Debug)]
pub struct ElasticLog {
    layout: Box<dyn Layout>,
    time_format: TimeFormat,
    router: Router,
    sql_channel: String,
    table: String,
    dispatcher: BulkDispatcher,
    notice: Option<Box<dyn Notice>>,
    trap: Box<dyn Trap>,
    clock: Clock,
}

impl ElasticLog {
    pub fn builder(config: Config, elastic: ElasticConfig) -> ElasticLogBuilder {
        ElasticLogBuilder::new(config, elastic)
    }

    /// The channel carrying SQL statements.
    pub fn sql_channel(&self) -> &str {
        &self.sql_channel
    }

    /// Ship the entries and report whether the bulk request went through.
    ///
    /// Never panics and never returns an error: failures are handed to the trap.
    pub fn save(&self, log: &[LogEntry]) -> bool {
        self.save_outcome(log).is_success()
    }

    /// Ship the entries and report what happened.
    ///
    /// Entries of the same channel are merged in input order, at the position of the first one.
    pub fn save_outcome(&self, log: &[LogEntry]) -> SaveOutcome {
        let now = self.clock.now();
        let time = self.time_format.format(now);
        let date = self.time_format.date(now);

        let mut groups: Vec<ChannelLines> = vec![];
        for entry in log {
            let lines = self.format_lines(&time, entry);
            match groups.iter_mut().find(|group| group.channel == entry.channel) {
                Some(group) => group.lines.extend(lines),
                None => groups.push(ChannelLines {
                    channel: entry.channel.clone(),
                    route: self.router.route(&entry.channel, date),
                    lines,
                }),
            }
        }

        let batch = BatchBuilder::new(self.sql_channel.as_str(), self.time_format.created_at(now))
            .shared_destination(self.router.shared_destination(date))
            .build(groups);

        if batch.is_empty() {
            if batch.dropped.is_empty() {
                return SaveOutcome::Idle;
            }
            log::debug!("suppressed sql probes: {:?}", batch.dropped);
            return SaveOutcome::Suppressed {
                dropped: batch.dropped,
            };
        }

        let documents = batch.documents.len();
        let result = self.dispatcher.try_dispatch(&batch.documents, &self.table);
        self.notify(&batch.documents);

        match result {
            Ok(response) => {
                let rejected = response.rejected();
                if rejected > 0 {
                    log::warn!(
                        "{rejected} of {documents} log documents were rejected: {}",
                        response
                            .first_error()
                            .map(|err| err.to_string())
                            .unwrap_or_default()
                    );
                }
                SaveOutcome::Shipped {
                    documents,
                    dropped: batch.dropped,
                    rejected,
                }
            }
            Err(error) => {
                log::warn!("failed to ship {documents} log documents: {error}");
                self.trap.trap(&error);
                SaveOutcome::Failed { documents, error }
            }
        }
    }

    fn format_lines(&self, time: &str, entry: &LogEntry) -> Vec<FormattedLine> {
        entry
            .messages
            .iter()
            .map(|message| {
                let message = message.to_text();
                let text = self.layout.format(time, &entry.channel, &message);
                FormattedLine {
                    message: message.into_owned(),
                    text,
                }
            })
            .collect()
    }

    fn notify(&self, documents: &[Document]) {
        let Some(notice) = &self.notice else {
            return;
        };
        for document in documents {
            if let Err(err) = notify_isolated(notice.as_ref(), document) {
                self.trap.trap(&err);
            }
        }
    }
}

/// A builder to configure and create an [`ElasticLog`].
#[derive(Debug)]
pub struct ElasticLogBuilder {
    config: Config,
    elastic: ElasticConfig,
    layout: Option<Box<dyn Layout>>,
    transport: Option<Box<dyn Transport>>,
    notice: Option<Box<dyn Notice>>,
    trap: Box<dyn Trap>,
    timezone: Option<TimeZone>,
    clock: Clock,
}

impl ElasticLogBuilder {
    pub fn new(config: Config, elastic: ElasticConfig) -> Self {
        Self {
            config,
            elastic,
            layout: None,
            transport: None,
            notice: None,
            trap: Box::new(DefaultTrap::default()),
            timezone: None,
            clock: Clock::DefaultClock,
        }
    }

    /// Format lines with `layout` instead of the one selected by the config.
    pub fn layout(mut self, layout: impl Into<Box<dyn Layout>>) -> Self {
        self.layout = Some(layout.into());
        self
    }

    /// Send bulk bodies through `transport` instead of over HTTP.
    pub fn transport(mut self, transport: impl Into<Box<dyn Transport>>) -> Self {
        self.transport = Some(transport.into());
        self
    }

    /// Call `notice` with every built document.
    pub fn notice(mut self, notice: impl Into<Box<dyn Notice>>) -> Self {
        self.notice = Some(notice.into());
        self
    }

    /// Set the trap for swallowed errors. Defaults to [`DefaultTrap`].
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    /// Render timestamps in `timezone` instead of the system timezone.
    pub fn timezone(mut self, timezone: TimeZone) -> Self {
        self.timezone = Some(timezone);
        self
    }

    #[cfg(test)]
    pub(crate) fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Build the handler, validating the line template and time format.
    pub fn build(self) -> Result<ElasticLog, Error> {
        let layout = match self.layout {
            Some(layout) => layout,
            None => self.config.layout()?,
        };

        let mut time_format = self.config.time_format()?;
        if let Some(timezone) = self.timezone {
            time_format = time_format.timezone(timezone);
        }

        let transport = match self.transport {
            Some(transport) => transport,
            None => Box::new(HttpTransport::new(&self.elastic)?),
        };

        Ok(ElasticLog {
            layout,
            time_format,
            router: self.config.router(),
            sql_channel: self.config.sql_channel,
            table: self.elastic.table,
            dispatcher: BulkDispatcher::new(transport, self.elastic.prefix),
            notice: self.notice,
            trap: self.trap,
            clock: self.clock,
        })
    }
}
