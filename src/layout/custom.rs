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

use std::fmt::Debug;
use std::fmt::Formatter;

use crate::layout::Layout;

type FormatFunction = dyn Fn(&str, &str, &str) -> String + Send + Sync + 'static;

/// A layout that you can pass the custom layout function.
///
/// The function receives the rendered time, the channel and the message text:
///
/// ```rust
/// use elasticlog::layout::CustomLayout;
/// use elasticlog::layout::Layout;
///
/// let layout = CustomLayout::new(|time, channel, msg| format!("{channel}@{time}: {msg}"));
/// assert_eq!(layout.format("now", "info", "hello"), "info@now: hello");
/// ```
pub struct CustomLayout {
    f: Box<FormatFunction>,
}

impl Debug for CustomLayout {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "CustomLayout {{ ... }}")
    }
}

impl CustomLayout {
    pub fn new(layout: impl Fn(&str, &str, &str) -> String + Send + Sync + 'static) -> Self {
        CustomLayout {
            f: Box::new(layout),
        }
    }
}

impl Layout for CustomLayout {
    fn format(&self, time: &str, channel: &str, message: &str) -> String {
        (self.f)(time, channel, message)
    }
}
