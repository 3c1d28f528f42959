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

//! Raw log message payloads.

use std::borrow::Cow;
use std::fmt;
use std::fmt::Write;

/// A raw log message as handed over by the application.
///
/// Text messages are logged as they are. Every other variant is rendered into a stable,
/// human-readable text before formatting:
///
/// ```text
/// array (
///   'user' => 'alice',
///   'roles' =>
///   array (
///     0 => 'admin',
///   ),
/// )
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Message>),
    Map(Vec<(String, Message)>),
}

impl Message {
    /// Create a text message from the `Debug` representation of any value.
    ///
    /// # Examples
    ///
    /// ```
    /// use elasticlog::Message;
    ///
    /// let msg = Message::debug(&Some(42));
    /// assert_eq!(msg.to_text(), "Some(42)");
    /// ```
    pub fn debug(value: &impl fmt::Debug) -> Self {
        Message::Text(format!("{value:?}"))
    }

    /// The text to log for this message.
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Message::Text(text) => Cow::Borrowed(text),
            other => {
                let mut out = String::new();
                // SAFETY: write to a string always succeeds
                other.export(&mut out, "").unwrap();
                Cow::Owned(out)
            }
        }
    }

    fn export(&self, out: &mut String, indent: &str) -> fmt::Result {
        match self {
            Message::Null => out.write_str("NULL"),
            Message::Bool(b) => write!(out, "{b}"),
            Message::Int(i) => write!(out, "{i}"),
            Message::Float(f) => export_float(out, *f),
            Message::Text(text) => export_text(out, text),
            Message::List(items) => {
                out.write_str("array (\n")?;
                for (i, item) in items.iter().enumerate() {
                    write!(out, "{indent}  {i} =>")?;
                    export_entry(out, item, indent)?;
                }
                write!(out, "{indent})")
            }
            Message::Map(entries) => {
                out.write_str("array (\n")?;
                for (key, value) in entries {
                    write!(out, "{indent}  ")?;
                    export_text(out, key)?;
                    out.write_str(" =>")?;
                    export_entry(out, value, indent)?;
                }
                write!(out, "{indent})")
            }
        }
    }
}

fn export_entry(out: &mut String, value: &Message, indent: &str) -> fmt::Result {
    match value {
        Message::List(_) | Message::Map(_) => {
            let nested = format!("{indent}  ");
            write!(out, "\n{nested}")?;
            value.export(out, &nested)?;
        }
        scalar => {
            out.write_char(' ')?;
            scalar.export(out, indent)?;
        }
    }
    out.write_str(",\n")
}

fn export_float(out: &mut String, f: f64) -> fmt::Result {
    if f.is_nan() {
        out.write_str("NAN")
    } else if f.is_infinite() {
        out.write_str(if f > 0.0 { "INF" } else { "-INF" })
    } else {
        // Debug keeps a fractional part on integral values: 1.0 rather than 1.
        write!(out, "{f:?}")
    }
}

fn export_text(out: &mut String, text: &str) -> fmt::Result {
    out.write_char('\'')?;
    for c in text.chars() {
        match c {
            '\'' => out.write_str("\\'")?,
            '\\' => out.write_str("\\\\")?,
            c => out.write_char(c)?,
        }
    }
    out.write_char('\'')
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<&str> for Message {
    fn from(value: &str) -> Self {
        Message::Text(value.to_owned())
    }
}

impl From<String> for Message {
    fn from(value: String) -> Self {
        Message::Text(value)
    }
}

impl From<&String> for Message {
    fn from(value: &String) -> Self {
        Message::Text(value.clone())
    }
}

impl From<Cow<'_, str>> for Message {
    fn from(value: Cow<'_, str>) -> Self {
        Message::Text(value.into_owned())
    }
}

impl From<bool> for Message {
    fn from(value: bool) -> Self {
        Message::Bool(value)
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Message {
                fn from(value: $ty) -> Self {
                    Message::Int(i64::from(value))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Message {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(value) => Message::Int(value),
            Err(_) => Message::Float(value as f64),
        }
    }
}

impl From<usize> for Message {
    fn from(value: usize) -> Self {
        Message::from(value as u64)
    }
}

impl From<f32> for Message {
    fn from(value: f32) -> Self {
        Message::Float(f64::from(value))
    }
}

impl From<f64> for Message {
    fn from(value: f64) -> Self {
        Message::Float(value)
    }
}

impl<T: Into<Message>> From<Option<T>> for Message {
    fn from(value: Option<T>) -> Self {
        value.map_or(Message::Null, Into::into)
    }
}

impl<T: Into<Message>> From<Vec<T>> for Message {
    fn from(value: Vec<T>) -> Self {
        Message::List(value.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<Message>> FromIterator<(K, V)> for Message {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Message::Map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<serde_json::Value> for Message {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Message::Null,
            Value::Bool(b) => Message::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Message::Int(i),
                None => Message::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => Message::Text(s),
            Value::Array(items) => Message::List(items.into_iter().map(Message::from).collect()),
            Value::Object(map) => Message::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Message::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_is_logged_verbatim() {
        let msg = Message::from("it's a/b");
        assert_eq!(msg.to_text(), "it's a/b");
    }

    #[test]
    fn test_scalars() {
        assert_eq!(Message::Null.to_text(), "NULL");
        assert_eq!(Message::from(true).to_text(), "true");
        assert_eq!(Message::from(-7).to_text(), "-7");
        assert_eq!(Message::from(1.0).to_text(), "1.0");
        assert_eq!(Message::from(0.25).to_text(), "0.25");
        assert_eq!(Message::from(f64::NEG_INFINITY).to_text(), "-INF");
        assert_eq!(Message::from(None::<i32>).to_text(), "NULL");
    }

    #[test]
    fn test_nested_export() {
        let msg: Message = vec![
            ("user", Message::from("o'neil")),
            ("roles", Message::from(vec!["admin", "ops"])),
            ("empty", Message::List(vec![])),
        ]
        .into_iter()
        .collect();

        let expected = "array (\n  'user' => 'o\\'neil',\n  'roles' =>\n  array (\n    0 => 'admin',\n    1 => 'ops',\n  ),\n  'empty' =>\n  array (\n  ),\n)";
        assert_eq!(msg.to_text(), expected);
    }

    #[test]
    fn test_from_json_value() {
        let value = serde_json::json!({"id": 3, "tags": ["a"], "ok": null});
        let msg = Message::from(value);
        assert_eq!(
            msg.to_text(),
            "array (\n  'id' => 3,\n  'ok' => NULL,\n  'tags' =>\n  array (\n    0 => 'a',\n  ),\n)"
        );
    }
}
