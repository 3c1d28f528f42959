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

//! Elasticlog is a log handler shipping each batch of log messages to Elasticsearch as documents.
//!
//! # Overview
//!
//! A save call takes the buffered messages of one request, grouped by channel. Every message is
//! formatted into a line, as text through a printf-style template or as a JSON object. Channels
//! listed in `apart_level` become documents of their own; all other channels are merged into one
//! shared document. The documents are shipped in a single bulk request.
//!
//! Lines of the SQL channel carry the query runtime, which is stored on the document. Schema
//! probes and connection timings are dropped before they reach the cluster.
//!
//! # Examples
//!
//! ```
//! use elasticlog::Config;
//! use elasticlog::ElasticConfig;
//! use elasticlog::ElasticLog;
//! use elasticlog::LogEntry;
//!
//! let config: Config = serde_json::from_str(r#"{"apart_level": ["error"]}"#).unwrap();
//! let elastic: ElasticConfig = serde_json::from_str(r#"{"hosts": ["localhost:9200"]}"#).unwrap();
//! let handler = ElasticLog::builder(config, elastic).build().unwrap();
//!
//! let log = [
//!     LogEntry::new("error", ["payment declined"]),
//!     LogEntry::new("info", ["order created", "order paid"]),
//! ];
//! if !handler.save(&log) {
//!     // the cluster is unreachable; the error went to the trap
//! }
//! ```
//!
//! Records of the `log` crate can be buffered and shipped on flush with [`ElasticLogger`].

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod bulk;
pub mod dispatch;
pub mod document;
pub mod layout;
pub mod notice;
pub mod route;
pub mod sql;
pub mod time;
pub mod transport;
pub mod trap;

mod bridge;
mod config;
mod error;
mod handler;
mod message;

pub use self::bridge::ElasticLogger;
pub use self::config::Config;
pub use self::config::ElasticConfig;
pub use self::document::Document;
pub use self::error::Error;
pub use self::handler::ElasticLog;
pub use self::handler::ElasticLogBuilder;
pub use self::handler::LogEntry;
pub use self::handler::SaveOutcome;
pub use self::layout::Layout;
pub use self::message::Message;
pub use self::notice::Notice;
pub use self::transport::Transport;
pub use self::trap::Trap;
