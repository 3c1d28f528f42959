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

use std::io;

use serde::Deserialize;
use serde::Serialize;
use serde_json::ser::CompactFormatter;
use serde_json::ser::Formatter;

use crate::layout::Layout;

/// Escaping flags for [`JsonLayout`].
///
/// Both default to `true`, so slashes and non-ASCII characters are written as they are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JsonOptions {
    /// Write non-ASCII characters as they are instead of `\uXXXX`.
    pub unescaped_unicode: bool,
    /// Write `/` as it is instead of `\/`.
    pub unescaped_slashes: bool,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self {
            unescaped_unicode: true,
            unescaped_slashes: true,
        }
    }
}

/// A JSON layout for formatting log lines.
///
/// Output format:
///
/// ```json
/// {"time":"2024-08-11T22:44:57+08:00","type":"error","msg":"Hello error!"}
/// {"time":"2024-08-11T22:44:57+08:00","type":"info","msg":"GET /api/users 用户"}
/// ```
///
/// # Examples
///
/// ```
/// use elasticlog::layout::JsonLayout;
/// use elasticlog::layout::JsonOptions;
///
/// let json_layout = JsonLayout::default().options(JsonOptions {
///     unescaped_unicode: false,
///     unescaped_slashes: true,
/// });
/// ```
#[derive(Default, Debug, Clone)]
pub struct JsonLayout {
    options: JsonOptions,
}

impl JsonLayout {
    /// Set the escaping flags.
    pub fn options(mut self, options: JsonOptions) -> Self {
        self.options = options;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
struct LogLine<'a> {
    time: &'a str,
    #[serde(rename = "type")]
    channel: &'a str,
    msg: &'a str,
}

impl Layout for JsonLayout {
    fn format(&self, time: &str, channel: &str, message: &str) -> String {
        let line = LogLine {
            time,
            channel,
            msg: message,
        };

        let mut buf = Vec::new();
        let formatter = EscapeFormatter {
            options: self.options,
        };
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        // SAFETY: LogLine is serializable and writing to a Vec never fails.
        line.serialize(&mut serializer).unwrap();
        // SAFETY: serde_json only emits valid UTF-8.
        String::from_utf8(buf).unwrap()
    }
}

/// A compact formatter that optionally escapes slashes and non-ASCII characters.
struct EscapeFormatter {
    options: JsonOptions,
}

impl Formatter for EscapeFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let JsonOptions {
            unescaped_unicode,
            unescaped_slashes,
        } = self.options;
        if unescaped_unicode && unescaped_slashes {
            return CompactFormatter.write_string_fragment(writer, fragment);
        }

        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            let escape_slash = c == '/' && !unescaped_slashes;
            let escape_unicode = !c.is_ascii() && !unescaped_unicode;
            if !escape_slash && !escape_unicode {
                continue;
            }

            writer.write_all(fragment[start..i].as_bytes())?;
            if escape_slash {
                writer.write_all(b"\\/")?;
            } else {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
            start = i + c.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;

    #[test]
    fn test_default_keeps_slashes_and_unicode() {
        let layout = JsonLayout::default();
        let line = layout.format("t", "info", "GET /api 用户 \"quoted\"");
        assert_eq!(
            line,
            r#"{"time":"t","type":"info","msg":"GET /api 用户 \"quoted\""}"#
        );

        let value: Value = serde_json::from_str(&line).unwrap();
        let keys = value.as_object().unwrap().keys().collect::<Vec<_>>();
        assert_eq!(keys, ["msg", "time", "type"]);
    }

    #[test]
    fn test_escaping_flags() {
        let layout = JsonLayout::default().options(JsonOptions {
            unescaped_unicode: false,
            unescaped_slashes: false,
        });
        let line = layout.format("t", "info", "a/é😀");
        assert_eq!(
            line,
            r#"{"time":"t","type":"info","msg":"a\/\u00e9\ud83d\ude00"}"#
        );

        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["msg"], "a/é😀");
    }
}
