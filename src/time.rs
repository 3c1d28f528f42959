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

//! Timestamps for log lines and documents.

use jiff::Timestamp;
use jiff::Zoned;
use jiff::civil::Date;
use jiff::fmt::strtime;
use jiff::tz::TimeZone;

use crate::Error;

/// ISO 8601 with offset, e.g. `2024-08-11T22:44:57+08:00`.
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Renders timestamps in a fixed timezone with a strftime-like layout.
///
/// The timezone defaults to the system timezone. See [`jiff::fmt::strtime`] for the supported
/// conversion specifiers.
#[derive(Debug, Clone)]
pub struct TimeFormat {
    format: String,
    timezone: TimeZone,
}

impl Default for TimeFormat {
    fn default() -> Self {
        Self {
            format: DEFAULT_TIME_FORMAT.to_owned(),
            timezone: TimeZone::system(),
        }
    }
}

impl TimeFormat {
    /// Create a time format, rejecting layouts jiff cannot render.
    ///
    /// An empty layout falls back to [`DEFAULT_TIME_FORMAT`].
    ///
    /// # Examples
    ///
    /// ```
    /// use elasticlog::time::TimeFormat;
    ///
    /// let format = TimeFormat::new("%Y-%m-%d %H:%M:%S%.6f").unwrap();
    /// assert!(TimeFormat::new("%Y%").is_err());
    /// ```
    pub fn new(format: impl Into<String>) -> Result<Self, Error> {
        let mut format = format.into();
        if format.is_empty() {
            format = DEFAULT_TIME_FORMAT.to_owned();
        }

        let probe = Timestamp::UNIX_EPOCH.to_zoned(TimeZone::UTC);
        strtime::format(format.as_bytes(), &probe).map_err(|err| {
            Error::new("invalid time format")
                .with_context("time_format", &format)
                .with_source(err)
        })?;

        Ok(Self {
            format,
            timezone: TimeZone::system(),
        })
    }

    /// Set the timezone for timestamps.
    ///
    /// Defaults to the system timezone if not set.
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.timezone = tz;
        self
    }

    fn zoned(&self, ts: Timestamp) -> Zoned {
        ts.to_zoned(self.timezone.clone())
    }

    /// Render a log line timestamp.
    pub fn format(&self, ts: Timestamp) -> String {
        let zoned = self.zoned(ts);
        // The layout was validated on construction; fall back to RFC 3339 all the same.
        strtime::format(self.format.as_bytes(), &zoned).unwrap_or_else(|_| {
            let offset = self.timezone.to_offset(ts);
            ts.display_with_offset(offset).to_string()
        })
    }

    /// Render the second-precision creation time of a document.
    pub fn created_at(&self, ts: Timestamp) -> String {
        self.zoned(ts).strftime(CREATED_AT_FORMAT).to_string()
    }

    /// The calendar date of a timestamp in this timezone.
    pub fn date(&self, ts: Timestamp) -> Date {
        self.zoned(ts).date()
    }
}

/// Source of the current time.
#[derive(Debug)]
pub(crate) enum Clock {
    DefaultClock,
    #[cfg(test)]
    ManualClock(ManualClock),
}

impl Clock {
    pub(crate) fn now(&self) -> Timestamp {
        match self {
            Clock::DefaultClock => Timestamp::now(),
            #[cfg(test)]
            Clock::ManualClock(clock) => clock.now(),
        }
    }
}

/// The time could be reset.
#[derive(Debug)]
#[cfg(test)]
pub(crate) struct ManualClock {
    now: Timestamp,
}

#[cfg(test)]
impl ManualClock {
    pub(crate) fn new(now: Timestamp) -> ManualClock {
        ManualClock { now }
    }

    fn now(&self) -> Timestamp {
        self.now
    }
}
