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

//! Handler and backend configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::Error;
use crate::layout::JsonLayout;
use crate::layout::JsonOptions;
use crate::layout::Layout;
use crate::layout::Template;
use crate::layout::TextLayout;
use crate::route::ApartLevel;
use crate::route::Naming;
use crate::route::Router;
use crate::route::Single;
use crate::time::DEFAULT_TIME_FORMAT;
use crate::time::TimeFormat;

/// Options of the log handler.
///
/// Every field has a default, so a partial document deserializes:
///
/// ```
/// use elasticlog::Config;
///
/// let config: Config = serde_json::from_str(r#"{"apart_level": ["error", "sql"], "json": true}"#).unwrap();
/// assert!(config.json);
/// assert_eq!(config.format, "[%s][%s] %s");
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// strftime-like layout of line timestamps.
    pub time_format: String,
    /// Use one destination name instead of dated names.
    pub single: Single,
    /// Size threshold in bytes for file-based handlers sharing this configuration.
    pub file_size: u64,
    /// Base directory for file-based handlers sharing this configuration.
    pub path: String,
    /// Channels shipped as documents of their own.
    pub apart_level: ApartLevel,
    /// Number of dated destinations kept by file-based handlers; non-zero switches to daily names.
    pub max_files: usize,
    /// Format lines as JSON objects instead of through `format`.
    pub json: bool,
    pub json_options: JsonOptions,
    /// printf-style line template with time, channel and message slots.
    pub format: String,
    /// The channel carrying SQL statements and their timings.
    pub sql_channel: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_format: DEFAULT_TIME_FORMAT.to_owned(),
            single: Single::Off,
            file_size: 2097152,
            path: String::new(),
            apart_level: ApartLevel::default(),
            max_files: 0,
            json: false,
            json_options: JsonOptions::default(),
            format: "[%s][%s] %s".to_owned(),
            sql_channel: "sql".to_owned(),
        }
    }
}

impl Config {
    /// The line layout selected by `json`, `json_options` and `format`.
    pub fn layout(&self) -> Result<Box<dyn Layout>, Error> {
        if self.json {
            return Ok(JsonLayout::default().options(self.json_options).into());
        }
        let template = self.format.parse::<Template>()?;
        Ok(TextLayout::default().template(template).into())
    }

    pub fn time_format(&self) -> Result<TimeFormat, Error> {
        TimeFormat::new(self.time_format.as_str())
    }

    pub fn router(&self) -> Router {
        let naming = Naming::new(self.single.clone(), self.max_files);
        Router::new(self.apart_level.clone(), naming)
    }
}

/// Connection to the Elasticsearch cluster, fixed for the lifetime of a handler.
///
/// ```
/// use elasticlog::ElasticConfig;
///
/// let config: ElasticConfig = serde_json::from_str(
///     r#"{"hosts": ["https://es1:9200", "es2:9200"], "user": "elastic", "passwd": "secret", "prefix": "prod_", "table": "app_log"}"#,
/// )
/// .unwrap();
/// assert_eq!(config.index_name(), "prod_app_log");
/// ```
#[derive(Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ElasticConfig {
    /// Nodes as `host:port` or full URLs; `http` is assumed without a scheme.
    pub hosts: Vec<String>,
    /// Basic authentication user; empty disables authentication.
    pub user: String,
    pub passwd: String,
    /// The index name, without prefix.
    pub table: String,
    /// Prepended to `table` for every request.
    pub prefix: String,
    /// Timeout of one bulk request, in seconds; `0` disables the timeout.
    pub timeout: u64,
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            hosts: vec!["localhost:9200".to_owned()],
            user: String::new(),
            passwd: String::new(),
            table: "log".to_owned(),
            prefix: String::new(),
            timeout: 30,
        }
    }
}

impl std::fmt::Debug for ElasticConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticConfig")
            .field("hosts", &self.hosts)
            .field("user", &self.user)
            .field("passwd", &"***")
            .field("table", &self.table)
            .field("prefix", &self.prefix)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ElasticConfig {
    /// The full name of the target index.
    pub fn index_name(&self) -> String {
        format!("{}{}", self.prefix, self.table)
    }

    /// The bulk request timeout, `None` if disabled.
    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.time_format, "%Y-%m-%dT%H:%M:%S%:z");
        assert_eq!(config.file_size, 2097152);
        assert!(config.json_options.unescaped_slashes);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = serde_json::from_str::<Config>(r#"{"level": ["error"]}"#).unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn test_layout_selection() {
        let text = Config {
            format: "%2$s> %3$s".to_owned(),
            ..Config::default()
        };
        assert_eq!(text.layout().unwrap().format("t", "info", "hi"), "info> hi");

        let empty_format = Config {
            format: String::new(),
            ..Config::default()
        };
        assert_eq!(
            empty_format.layout().unwrap().format("t", "info", "hi"),
            "[t][info] hi"
        );

        let json = Config {
            json: true,
            ..Config::default()
        };
        assert_eq!(
            json.layout().unwrap().format("t", "info", "hi"),
            r#"{"time":"t","type":"info","msg":"hi"}"#
        );

        let bad = Config {
            format: "%d".to_owned(),
            ..Config::default()
        };
        assert!(bad.layout().is_err());
    }

    #[test]
    fn test_passwd_is_not_printed() {
        let config = ElasticConfig {
            passwd: "secret".to_owned(),
            ..ElasticConfig::default()
        };
        assert!(!format!("{config:?}").contains("secret"));
        assert_eq!(config.index_name(), "log");
    }

    #[test]
    fn test_zero_timeout_disables_timeout() {
        assert_eq!(
            ElasticConfig::default().timeout(),
            Some(Duration::from_secs(30))
        );

        let config: ElasticConfig = serde_json::from_str(r#"{"timeout": 0}"#).unwrap();
        assert_eq!(config.timeout(), None);
    }
}
