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

//! Side-channel notification of built documents.

use std::any::Any;
use std::fmt;
use std::panic;
use std::panic::AssertUnwindSafe;

use crate::Error;
use crate::document::Document;

/// A hook invoked with every document a save call builds, e.g. to alert on error logs.
///
/// Notices are best-effort: an error or a panic is handed to the handler's trap and never fails
/// the save call.
///
/// # Examples
///
/// ```
/// use elasticlog::Document;
/// use elasticlog::Error;
/// use elasticlog::notice::Notice;
///
/// #[derive(Debug)]
/// struct AlertOnError;
///
/// impl Notice for AlertOnError {
///     fn notify(&self, document: &Document) -> Result<(), Error> {
///         if document.kind == "error" {
///             // page someone
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Notice: fmt::Debug + Send + Sync + 'static {
    fn notify(&self, document: &Document) -> Result<(), Error>;
}

impl<T: Notice> From<T> for Box<dyn Notice> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

/// Run a notice so that neither its error nor its panic reaches the caller.
pub(crate) fn notify_isolated(notice: &dyn Notice, document: &Document) -> Result<(), Error> {
    match panic::catch_unwind(AssertUnwindSafe(|| notice.notify(document))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(Error::new("failed to run log notice")
            .with_context("type", &document.kind)
            .with_source(err)),
        Err(payload) => Err(Error::new("log notice panicked")
            .with_context("type", &document.kind)
            .with_context("panic", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Failing;

    impl Notice for Failing {
        fn notify(&self, _: &Document) -> Result<(), Error> {
            Err(Error::new("smtp unavailable"))
        }
    }

    #[derive(Debug)]
    struct Panicking;

    impl Notice for Panicking {
        fn notify(&self, _: &Document) -> Result<(), Error> {
            panic!("notice exploded")
        }
    }

    fn document() -> Document {
        Document {
            kind: "error".to_owned(),
            log: "boom\n".to_owned(),
            created_at: "2021-11-25 10:30:00".to_owned(),
            runtime: 0.0,
        }
    }

    #[test]
    fn test_failure_is_wrapped() {
        let err = notify_isolated(&Failing, &document()).unwrap_err();
        assert_eq!(err.message(), "failed to run log notice");
        assert_eq!(err.context("type"), Some("error"));
        assert!(err.to_string().contains("smtp unavailable"));
    }

    #[test]
    fn test_panic_is_contained() {
        let err = notify_isolated(&Panicking, &document()).unwrap_err();
        assert_eq!(err.message(), "log notice panicked");
        assert_eq!(err.context("panic"), Some("notice exploded"));
    }
}
