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

//! Shipping of built documents as one bulk request.

use crate::Error;
use crate::bulk::BulkRequest;
use crate::bulk::BulkResponse;
use crate::document::Document;
use crate::transport::Transport;

/// Ships documents in one bulk request to `prefix + index`.
///
/// There is no retry: a request either goes through or the whole batch is reported failed.
#[derive(Debug)]
pub struct BulkDispatcher {
    transport: Box<dyn Transport>,
    prefix: String,
}

impl BulkDispatcher {
    pub fn new(transport: impl Into<Box<dyn Transport>>, prefix: impl Into<String>) -> Self {
        Self {
            transport: transport.into(),
            prefix: prefix.into(),
        }
    }

    /// Ship the documents, reporting only whether the request went through.
    pub fn dispatch(&self, documents: &[Document], index: &str) -> bool {
        self.try_dispatch(documents, index).is_ok()
    }

    /// Ship the documents and return the cluster response.
    ///
    /// Documents refused individually inside a successful response are not an error here; see
    /// [`BulkResponse::rejected`].
    pub fn try_dispatch(&self, documents: &[Document], index: &str) -> Result<BulkResponse, Error> {
        let mut request = BulkRequest::new(format!("{}{index}", self.prefix));
        for document in documents {
            request.push(document)?;
        }

        let target = request.index().to_owned();
        let len = request.len();
        self.transport.bulk(request.into_body()).map_err(|err| {
            err.with_context("index", target)
                .with_context("documents", len)
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;
    use std::sync::Mutex;

    use super::*;

    /// Records bulk bodies instead of sending them.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct RecordingTransport {
        pub(crate) bodies: Arc<Mutex<Vec<String>>>,
        pub(crate) fail: bool,
    }

    impl RecordingTransport {
        pub(crate) fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub(crate) fn bodies(&self) -> Vec<String> {
            self.bodies.lock().unwrap().clone()
        }
    }

    impl Transport for RecordingTransport {
        fn bulk(&self, body: Vec<u8>) -> Result<BulkResponse, Error> {
            self.bodies
                .lock()
                .unwrap()
                .push(String::from_utf8(body).unwrap());
            if self.fail {
                return Err(Error::new("connection refused"));
            }
            Ok(BulkResponse::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingTransport;
    use super::*;

    fn document() -> Document {
        Document {
            kind: "error".to_owned(),
            log: "boom\n".to_owned(),
            created_at: "2021-11-25 10:30:00".to_owned(),
            runtime: 0.0,
        }
    }

    #[test]
    fn test_dispatch_targets_prefixed_index() {
        let transport = RecordingTransport::default();
        let dispatcher = BulkDispatcher::new(transport.clone(), "prod_");
        assert!(dispatcher.dispatch(&[document()], "app_log"));

        let bodies = transport.bodies();
        assert_eq!(bodies.len(), 1);
        let mut lines = bodies[0].lines();
        assert_eq!(lines.next(), Some(r#"{"index":{"_index":"prod_app_log"}}"#));
        let doc: Document = serde_json::from_str(lines.next().unwrap()).unwrap();
        assert_eq!(doc, document());
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_transport_error_is_false() {
        let dispatcher = BulkDispatcher::new(RecordingTransport::failing(), "");
        assert!(!dispatcher.dispatch(&[document()], "app_log"));

        let err = dispatcher.try_dispatch(&[document()], "app_log").unwrap_err();
        assert_eq!(err.context("index"), Some("app_log"));
        assert_eq!(err.context("documents"), Some("1"));
    }
}
