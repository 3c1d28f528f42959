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

//! Layouts for formatting log lines.

use std::fmt;

mod custom;
mod json;
mod template;
mod text;

pub use self::custom::CustomLayout;
pub use self::json::JsonLayout;
pub use self::json::JsonOptions;
pub use self::template::Template;
pub use self::text::TextLayout;

/// A layout for formatting one raw message of a channel into a log line.
///
/// Formatting never fails; every input has a textual form.
pub trait Layout: fmt::Debug + Send + Sync + 'static {
    /// Formats a message observed at `time` on `channel`.
    fn format(&self, time: &str, channel: &str, message: &str) -> String;
}

impl<T: Layout> From<T> for Box<dyn Layout> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}
