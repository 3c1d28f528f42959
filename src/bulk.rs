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

//! The Elasticsearch bulk API wire format.
//!
//! A bulk body is newline-delimited JSON, alternating an action line and a document line:
//!
//! ```text
//! {"index":{"_index":"prod_app_log"}}
//! {"type":"","log":"[2021-11-25T10:30:00+08:00][info] hello\n","created_at":"2021-11-25 10:30:00","runtime":0.0}
//! ```

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::document::Document;

#[derive(Serialize)]
struct Action<'a> {
    index: IndexAction<'a>,
}

// No `_id`: the cluster assigns one.
#[derive(Serialize)]
struct IndexAction<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
}

/// A bulk request body indexing documents into one index.
#[derive(Debug, Clone)]
pub struct BulkRequest {
    index: String,
    body: Vec<u8>,
    len: usize,
}

impl BulkRequest {
    /// Create an empty request against the full index name.
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            body: vec![],
            len: 0,
        }
    }

    /// Append an index action and its document.
    pub fn push(&mut self, document: &Document) -> Result<(), Error> {
        let action = Action {
            index: IndexAction { index: &self.index },
        };
        serde_json::to_writer(&mut self.body, &action).map_err(Error::from_json_error)?;
        self.body.push(b'\n');
        serde_json::to_writer(&mut self.body, document).map_err(Error::from_json_error)?;
        self.body.push(b'\n');
        self.len += 1;
        Ok(())
    }

    /// The full name of the target index.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// The number of documents in this request.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

/// The response of a bulk request.
///
/// Unknown fields are ignored; every field defaults so partial bodies still parse.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub errors: bool,
    #[serde(default)]
    pub items: Vec<BulkItem>,
}

/// The outcome of one action in a bulk request.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkItem {
    #[serde(rename = "index", alias = "create", alias = "update", alias = "delete")]
    pub result: ItemResult,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemResult {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl BulkResponse {
    /// The number of documents the cluster refused.
    pub fn rejected(&self) -> usize {
        if !self.errors {
            return 0;
        }
        self.items
            .iter()
            .filter(|item| item.result.error.is_some() || item.result.status >= 300)
            .count()
    }

    /// The first item error, for diagnostics.
    pub fn first_error(&self) -> Option<&serde_json::Value> {
        self.items.iter().find_map(|item| item.result.error.as_ref())
    }
}
