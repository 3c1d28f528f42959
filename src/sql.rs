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

//! Query timing extraction from SQL channel messages.

/// Marks the column probe an ORM issues before touching a table.
pub const SHOW_FULL_COLUMNS: &str = "SHOW FULL COLUMNS";

/// Marks the connection timing line a database driver logs on connect.
pub const CONNECT_USE_TIME: &str = "CONNECT:[ UseTime";

/// What the SQL messages of one group say about the group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SqlSummary {
    /// The group is a probe and no document should be shipped for it.
    pub drop: bool,
    /// Elapsed time parsed from the last message, `0` if there is none.
    pub runtime: f64,
}

/// Inspect the SQL messages of a group, in logging order.
///
/// # Examples
///
/// ```
/// use elasticlog::sql::extract;
///
/// let summary = extract(["[ SQL ] SELECT * FROM `user` [ RunTime:0.000412s ]"]);
/// assert!(!summary.drop);
/// assert_eq!(summary.runtime, 0.000412);
///
/// let summary = extract(["[ SQL ] SHOW FULL COLUMNS FROM `user` [ RunTime:0.001s ]"]);
/// assert!(summary.drop);
/// ```
pub fn extract<'a>(messages: impl IntoIterator<Item = &'a str>) -> SqlSummary {
    let mut last = None;
    for message in messages {
        if message.contains(SHOW_FULL_COLUMNS) || message.contains(CONNECT_USE_TIME) {
            return SqlSummary {
                drop: true,
                runtime: 0.0,
            };
        }
        last = Some(message);
    }

    SqlSummary {
        drop: false,
        runtime: last.map(parse_runtime).unwrap_or_default(),
    }
}

/// Parse the elapsed time trailing a `<statement> : <seconds>` line.
///
/// Lines that do not split into exactly two parts on `:` have no runtime.
pub fn parse_runtime(line: &str) -> f64 {
    let mut parts = line.trim().split(':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(timing), None) => leading_float(timing),
        _ => 0.0,
    }
}

/// Parse the longest numeric prefix after leading whitespace, `0` if there is none.
fn leading_float(text: &str) -> f64 {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let digits = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_end = digits(end);
    let mut mantissa_digits = int_end - end;
    end = int_end;
    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits(end + 1);
        mantissa_digits += frac_end - end - 1;
        end = frac_end;
    }
    if mantissa_digits == 0 {
        return 0.0;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }

    text[..end].parse().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_from_trailing_timing() {
        assert_eq!(parse_runtime("[ SQL ] SELECT 1 : 0.002"), 0.002);
        assert_eq!(parse_runtime("... : 12.34"), 12.34);
        assert_eq!(parse_runtime("[ RunTime:0.000412s ]"), 0.000412);
        assert_eq!(parse_runtime("took: 1.5e-3s"), 0.0015);
        assert_eq!(parse_runtime("took: .5"), 0.5);
    }

    #[test]
    fn test_malformed_timing_is_zero() {
        assert_eq!(parse_runtime("SELECT 1"), 0.0);
        assert_eq!(parse_runtime("SELECT 1 : fast"), 0.0);
        assert_eq!(parse_runtime("a : b : 1.0"), 0.0);
        assert_eq!(parse_runtime("SELECT 1 :"), 0.0);
        assert_eq!(parse_runtime("took: -."), 0.0);
    }

    #[test]
    fn test_only_the_last_message_counts() {
        let summary = extract(["SELECT 1 : 3.0", "SELECT 2 : 0.25"]);
        assert_eq!(
            summary,
            SqlSummary {
                drop: false,
                runtime: 0.25
            }
        );
        assert_eq!(extract([]).runtime, 0.0);
    }

    #[test]
    fn test_probe_queries_drop_the_group() {
        assert!(extract(["SELECT 1 : 0.1", "CONNECT:[ UseTime:0.0012s ] mysql:host=db"]).drop);
        assert!(extract(["SHOW FULL COLUMNS FROM `t`"]).drop);
    }
}
