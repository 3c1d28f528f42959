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

use crate::layout::Layout;
use crate::layout::Template;

/// A layout that formats log lines as text through a [`Template`].
///
/// Output format with the default template:
///
/// ```text
/// [2024-08-11T22:44:57+08:00][error] Hello error!
/// [2024-08-11T22:44:57+08:00][info] Hello info!
/// [2024-08-11T22:44:57+08:00][sql] [ SQL ] SELECT 1 [ RunTime:0.000412s ]
/// ```
///
/// # Examples
///
/// ```
/// use elasticlog::layout::Layout;
/// use elasticlog::layout::TextLayout;
///
/// let layout = TextLayout::default().template("%2$s: %3$s".parse().unwrap());
/// assert_eq!(layout.format("now", "info", "hello"), "info: hello");
/// ```
#[derive(Default, Debug, Clone)]
pub struct TextLayout {
    template: Template,
}

impl TextLayout {
    /// Set the line template.
    ///
    /// Default to `[%s][%s] %s`.
    pub fn template(mut self, template: Template) -> Self {
        self.template = template;
        self
    }
}

impl Layout for TextLayout {
    fn format(&self, time: &str, channel: &str, message: &str) -> String {
        self.template.render([time, channel, message])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiline_message_is_kept() {
        let layout = TextLayout::default();
        assert_eq!(
            layout.format("t", "debug", "array (\n)"),
            "[t][debug] array (\n)"
        );
    }
}
