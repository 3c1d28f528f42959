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

//! Routing channels to the shared destination or to their own one.

use std::collections::BTreeSet;

use jiff::civil::Date;
use serde::Deserialize;

/// Which channels are written apart from the shared destination.
///
/// Deserializes from `true` (every channel), `false` (none) or a list of channel names.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "ApartLevelRepr")]
pub enum ApartLevel {
    All,
    Channels(BTreeSet<String>),
}

impl Default for ApartLevel {
    fn default() -> Self {
        ApartLevel::Channels(BTreeSet::new())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ApartLevelRepr {
    Flag(bool),
    Channels(Vec<String>),
}

impl From<ApartLevelRepr> for ApartLevel {
    fn from(repr: ApartLevelRepr) -> Self {
        match repr {
            ApartLevelRepr::Flag(true) => ApartLevel::All,
            ApartLevelRepr::Flag(false) => ApartLevel::default(),
            ApartLevelRepr::Channels(channels) => ApartLevel::Channels(channels.into_iter().collect()),
        }
    }
}

impl<S: Into<String>> FromIterator<S> for ApartLevel {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        ApartLevel::Channels(iter.into_iter().map(Into::into).collect())
    }
}

impl ApartLevel {
    /// Whether the channel is written apart.
    pub fn is_apart(&self, channel: &str) -> bool {
        match self {
            ApartLevel::All => true,
            ApartLevel::Channels(channels) => channels.contains(channel),
        }
    }
}

/// A single destination name for every log, instead of dated names.
///
/// Deserializes from `false`, `true` (named `single`) or a name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "SingleRepr")]
pub enum Single {
    #[default]
    Off,
    Named(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SingleRepr {
    Flag(bool),
    Name(String),
}

impl From<SingleRepr> for Single {
    fn from(repr: SingleRepr) -> Self {
        match repr {
            SingleRepr::Flag(false) => Single::Off,
            SingleRepr::Flag(true) => Single::Named("single".to_owned()),
            SingleRepr::Name(name) if name.is_empty() => Single::Off,
            SingleRepr::Name(name) => Single::Named(name),
        }
    }
}

/// Destination naming shared with the file-based handlers.
#[derive(Debug, Clone, Default)]
pub struct Naming {
    single: Single,
    max_files: usize,
}

impl Naming {
    pub fn new(single: Single, max_files: usize) -> Self {
        Self { single, max_files }
    }

    /// The name of the shared destination on `date`.
    pub fn shared(&self, date: Date) -> String {
        match &self.single {
            Single::Named(name) => name.clone(),
            Single::Off if self.max_files > 0 => date.strftime("%Y%m%d").to_string(),
            Single::Off => date.strftime("%Y%m/%d").to_string(),
        }
    }

    /// The name of the destination of an apart `channel` on `date`.
    pub fn apart(&self, date: Date, channel: &str) -> String {
        match &self.single {
            Single::Named(name) => format!("{name}_{channel}"),
            Single::Off if self.max_files > 0 => format!("{}_{channel}", date.strftime("%Y%m%d")),
            Single::Off => format!("{}_{channel}", date.strftime("%d")),
        }
    }
}

/// Where the messages of one channel go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Merged with every other shared channel into one document.
    Shared,
    /// Shipped as a document of its own; carries the destination name.
    Apart(String),
}

/// Decides the [`Route`] of each channel from static configuration.
#[derive(Debug, Clone, Default)]
pub struct Router {
    apart_level: ApartLevel,
    naming: Naming,
}

impl Router {
    pub fn new(apart_level: ApartLevel, naming: Naming) -> Self {
        Self {
            apart_level,
            naming,
        }
    }

    /// Route `channel` for a save call made on `date`.
    ///
    /// # Examples
    ///
    /// ```
    /// use elasticlog::route::ApartLevel;
    /// use elasticlog::route::Naming;
    /// use elasticlog::route::Route;
    /// use elasticlog::route::Router;
    /// use jiff::civil::date;
    ///
    /// let router = Router::new(ApartLevel::from_iter(["error"]), Naming::default());
    /// let today = date(2021, 11, 25);
    /// assert_eq!(router.route("error", today), Route::Apart("25_error".to_owned()));
    /// assert_eq!(router.route("info", today), Route::Shared);
    /// ```
    pub fn route(&self, channel: &str, date: Date) -> Route {
        if self.apart_level.is_apart(channel) {
            Route::Apart(self.naming.apart(date, channel))
        } else {
            Route::Shared
        }
    }

    /// The name of the shared destination on `date`.
    pub fn shared_destination(&self, date: Date) -> String {
        self.naming.shared(date)
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;

    #[test]
    fn test_apart_level_from_config_values() {
        let all: ApartLevel = serde_json::from_str("true").unwrap();
        assert_eq!(all, ApartLevel::All);
        let none: ApartLevel = serde_json::from_str("false").unwrap();
        assert_eq!(none, ApartLevel::default());
        let some: ApartLevel = serde_json::from_str(r#"["error","sql"]"#).unwrap();
        assert!(some.is_apart("sql"));
        assert!(!some.is_apart("info"));
    }

    #[test]
    fn test_route_is_stable() {
        let router = Router::new(ApartLevel::All, Naming::default());
        let today = date(2021, 11, 25);
        let first = router.route("info", today);
        assert_eq!(first, router.route("info", today));
        assert_eq!(first, Route::Apart("25_info".to_owned()));
    }

    #[test]
    fn test_destination_names() {
        let today = date(2021, 11, 5);

        let dated = Naming::default();
        assert_eq!(dated.shared(today), "202111/05");
        assert_eq!(dated.apart(today, "error"), "05_error");

        let rotated = Naming::new(Single::Off, 30);
        assert_eq!(rotated.shared(today), "20211105");
        assert_eq!(rotated.apart(today, "error"), "20211105_error");

        let single: Single = serde_json::from_str("true").unwrap();
        let single = Naming::new(single, 30);
        assert_eq!(single.shared(today), "single");
        assert_eq!(single.apart(today, "error"), "single_error");

        let named: Single = serde_json::from_str(r#""app""#).unwrap();
        assert_eq!(Naming::new(named, 0).apart(today, "sql"), "app_sql");
    }
}
