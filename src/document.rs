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

//! Documents assembled from the routed lines of one save call.

use serde::Deserialize;
use serde::Serialize;

use crate::route::Route;
use crate::sql;

const LINE_SEPARATOR: &str = "\n";

/// One formatted log line and the message text it was made from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedLine {
    pub message: String,
    pub text: String,
}

/// The formatted lines of one channel and where they are routed.
#[derive(Debug, Clone)]
pub struct ChannelLines {
    pub channel: String,
    pub route: Route,
    pub lines: Vec<FormattedLine>,
}

/// A unit of data indexed by Elasticsearch.
///
/// ```json
/// {"type":"error","log":"[2021-11-25T10:30:00+08:00][error] boom\n","created_at":"2021-11-25 10:30:00","runtime":0.0}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// The channel of an apart document; empty for the shared document.
    #[serde(rename = "type")]
    pub kind: String,
    /// The newline-joined log lines, with a trailing newline.
    pub log: String,
    pub created_at: String,
    /// Elapsed query time in seconds, only set for SQL lines.
    pub runtime: f64,
}

/// The documents of one save call, plus the groups that were suppressed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    pub documents: Vec<Document>,
    /// Destination names of the groups dropped as SQL probes.
    pub dropped: Vec<String>,
}

impl Batch {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Assembles a [`Batch`]: one document per apart channel, then one for all shared channels.
#[derive(Debug, Clone)]
pub struct BatchBuilder {
    sql_channel: String,
    created_at: String,
    shared_destination: String,
}

impl BatchBuilder {
    /// Create a builder stamping documents with `created_at`.
    pub fn new(sql_channel: impl Into<String>, created_at: impl Into<String>) -> Self {
        Self {
            sql_channel: sql_channel.into(),
            created_at: created_at.into(),
            shared_destination: String::new(),
        }
    }

    /// Name the shared destination, as reported for dropped groups.
    pub fn shared_destination(mut self, name: impl Into<String>) -> Self {
        self.shared_destination = name.into();
        self
    }

    /// Build the batch. Channels without lines are skipped.
    pub fn build(self, groups: Vec<ChannelLines>) -> Batch {
        let mut batch = Batch::default();
        let mut shared = vec![];

        for group in groups {
            if group.lines.is_empty() {
                continue;
            }
            match group.route {
                Route::Apart(destination) => {
                    log::trace!("channel {} routed to {destination}", group.channel);
                    let channel = group.channel;
                    let lines = group.lines;
                    match self.document(channel.clone(), &[(channel.as_str(), lines.as_slice())]) {
                        Some(document) => batch.documents.push(document),
                        None => batch.dropped.push(destination),
                    }
                }
                Route::Shared => shared.push((group.channel, group.lines)),
            }
        }

        if !shared.is_empty() {
            let groups = shared
                .iter()
                .map(|(channel, lines)| (channel.as_str(), lines.as_slice()))
                .collect::<Vec<_>>();
            match self.document(String::new(), &groups) {
                Some(document) => batch.documents.push(document),
                None => batch.dropped.push(self.shared_destination.clone()),
            }
        }

        batch
    }

    fn document(&self, kind: String, groups: &[(&str, &[FormattedLine])]) -> Option<Document> {
        let sql_messages = groups
            .iter()
            .filter(|(channel, _)| *channel == self.sql_channel)
            .flat_map(|(_, lines)| lines.iter().map(|line| line.message.as_str()))
            .collect::<Vec<_>>();

        let mut runtime = 0.0;
        if !sql_messages.is_empty() {
            let summary = sql::extract(sql_messages);
            if summary.drop {
                return None;
            }
            runtime = summary.runtime;
        }

        let mut log = groups
            .iter()
            .map(|(_, lines)| join_lines(lines))
            .collect::<Vec<_>>()
            .join(LINE_SEPARATOR);
        log.push_str(LINE_SEPARATOR);

        Some(Document {
            kind,
            log,
            created_at: self.created_at.clone(),
            runtime,
        })
    }
}

fn join_lines(lines: &[FormattedLine]) -> String {
    lines
        .iter()
        .map(|line| line.text.as_str())
        .collect::<Vec<_>>()
        .join(LINE_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(channel: &str, route: Route, messages: &[&str]) -> ChannelLines {
        ChannelLines {
            channel: channel.to_owned(),
            route,
            lines: messages
                .iter()
                .map(|msg| FormattedLine {
                    message: msg.to_string(),
                    text: format!("[t][{channel}] {msg}"),
                })
                .collect(),
        }
    }

    fn builder() -> BatchBuilder {
        BatchBuilder::new("sql", "2021-11-25 10:30:00").shared_destination("202111/25")
    }

    #[test]
    fn test_apart_and_shared_documents() {
        let batch = builder().build(vec![
            lines("error", Route::Apart("25_error".into()), &["boom", "bang"]),
            lines("info", Route::Shared, &["hello"]),
            lines("notice", Route::Shared, &["note"]),
        ]);

        assert_eq!(
            batch.documents,
            vec![
                Document {
                    kind: "error".into(),
                    log: "[t][error] boom\n[t][error] bang\n".into(),
                    created_at: "2021-11-25 10:30:00".into(),
                    runtime: 0.0,
                },
                Document {
                    kind: "".into(),
                    log: "[t][info] hello\n[t][notice] note\n".into(),
                    created_at: "2021-11-25 10:30:00".into(),
                    runtime: 0.0,
                },
            ]
        );
        assert!(batch.dropped.is_empty());
    }

    #[test]
    fn test_empty_channels_produce_nothing() {
        let batch = builder().build(vec![
            lines("error", Route::Apart("25_error".into()), &[]),
            lines("info", Route::Shared, &[]),
        ]);
        assert!(batch.is_empty());
        assert!(batch.dropped.is_empty());
    }

    #[test]
    fn test_sql_runtime_in_shared_document() {
        let batch = builder().build(vec![lines(
            "sql",
            Route::Shared,
            &["[ SQL ] SELECT 1 : 0.002"],
        )]);
        assert_eq!(batch.documents.len(), 1);
        assert_eq!(batch.documents[0].kind, "");
        assert_eq!(batch.documents[0].runtime, 0.002);
        assert_eq!(batch.documents[0].log, "[t][sql] [ SQL ] SELECT 1 : 0.002\n");
    }

    #[test]
    fn test_sql_probe_drops_only_its_group() {
        let batch = builder().build(vec![
            lines("sql", Route::Apart("25_sql".into()), &["SHOW FULL COLUMNS FROM `t`"]),
            lines("info", Route::Shared, &["hello"]),
        ]);
        assert_eq!(batch.documents.len(), 1);
        assert_eq!(batch.documents[0].kind, "");
        assert_eq!(batch.dropped, vec!["25_sql".to_owned()]);

        let batch = builder().build(vec![
            lines("info", Route::Shared, &["hello"]),
            lines("sql", Route::Shared, &["CONNECT:[ UseTime:0.001s ]"]),
        ]);
        assert!(batch.is_empty());
        assert_eq!(batch.dropped, vec!["202111/25".to_owned()]);
    }

    #[test]
    fn test_apart_sql_runtime() {
        let batch = builder().build(vec![lines(
            "sql",
            Route::Apart("25_sql".into()),
            &["SELECT 1 : 9.0", "SELECT 2 [ RunTime:0.5s ]"],
        )]);
        assert_eq!(batch.documents[0].kind, "sql");
        assert_eq!(batch.documents[0].runtime, 0.5);
    }
}
