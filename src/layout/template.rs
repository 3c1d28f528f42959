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

use std::str::FromStr;

use crate::Error;

/// The default line template: `[time][channel] message`.
pub const DEFAULT_TEMPLATE: &str = "[%s][%s] %s";

const SLOTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(usize),
}

/// A printf-style template with three string slots: time, channel and message.
///
/// Supported conversions are `%s` (next argument), `%1$s` to `%3$s` (positional argument) and
/// `%%` (a literal percent sign).
///
/// # Examples
///
/// ```
/// use elasticlog::layout::Template;
///
/// let template: Template = "%2$s|%1$s|%3$s".parse().unwrap();
/// assert_eq!(template.render(["t", "info", "hi"]), "info|t|hi");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Default for Template {
    fn default() -> Self {
        // SAFETY: the default template is valid.
        DEFAULT_TEMPLATE.parse().unwrap()
    }
}

impl FromStr for Template {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Template::default());
        }

        let invalid = |reason: &str| {
            Error::new("invalid format template")
                .with_context("format", s)
                .with_context("reason", reason)
        };

        let mut segments = vec![];
        let mut literal = String::new();
        let mut next_slot = 0;
        let mut chars = s.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }

            let slot = match chars.next() {
                Some('%') => {
                    literal.push('%');
                    continue;
                }
                Some('s') => {
                    next_slot += 1;
                    next_slot
                }
                Some(d) if d.is_ascii_digit() => {
                    let mut position = d.to_digit(10).unwrap_or_default() as usize;
                    while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
                        position = position.saturating_mul(10).saturating_add(d as usize);
                        chars.next();
                    }
                    if chars.next() != Some('$') || chars.next() != Some('s') {
                        return Err(invalid("only %N$s positional conversions are supported"));
                    }
                    position
                }
                Some(_) => return Err(invalid("only %s conversions are supported")),
                None => return Err(invalid("dangling '%' at end of template")),
            };

            if slot == 0 || slot > SLOTS {
                return Err(invalid("template refers to more than three arguments"));
            }
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Slot(slot - 1));
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Template { segments })
    }
}

impl Template {
    /// Substitute the arguments into the template.
    pub fn render(&self, args: [&str; SLOTS]) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot(i) => out.push_str(args[*i]),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template() {
        let template = Template::default();
        assert_eq!(
            template.render(["2021-11-25T10:30:00+08:00", "error", "boom"]),
            "[2021-11-25T10:30:00+08:00][error] boom"
        );
        assert_eq!("".parse::<Template>().unwrap(), template);
    }

    #[test]
    fn test_literal_percent_and_fewer_slots() {
        let template: Template = "100%% %s".parse().unwrap();
        assert_eq!(template.render(["t", "c", "m"]), "100% t");
    }

    #[test]
    fn test_rejects_unsupported_templates() {
        for bad in ["%d", "%s %s %s %s", "%4$s", "%0$s", "%1s", "trailing %"] {
            let err = bad.parse::<Template>().unwrap_err();
            assert_eq!(err.context("format"), Some(bad), "{bad}");
        }
    }
}
