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

//! Delivery of bulk bodies to the cluster.

use std::fmt;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;

use crate::ElasticConfig;
use crate::Error;
use crate::bulk::BulkResponse;

const NDJSON: &str = "application/x-ndjson";

// Response bodies are only kept for diagnostics.
const MAX_ERROR_BODY: usize = 512;

/// Sends one bulk body and reports the cluster response.
///
/// Implementations are shared by every save call of a handler and must be safe to call from
/// several threads at once.
pub trait Transport: fmt::Debug + Send + Sync + 'static {
    /// Send a newline-delimited bulk body.
    ///
    /// Errors cover both transport failures and non-success HTTP statuses.
    fn bulk(&self, body: Vec<u8>) -> Result<BulkResponse, Error>;
}

impl<T: Transport> From<T> for Box<dyn Transport> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

/// A [`Transport`] posting to the `_bulk` endpoint over HTTP.
///
/// The underlying blocking client keeps a connection pool and is safe to share between threads.
/// Requests are spread round-robin over the configured nodes, one attempt per call.
///
/// The blocking client must not be used from within an async runtime.
///
/// # Examples
///
/// ```
/// use elasticlog::ElasticConfig;
/// use elasticlog::transport::HttpTransport;
///
/// let config = ElasticConfig {
///     hosts: vec!["es1:9200".to_owned(), "https://es2:9200/".to_owned()],
///     ..ElasticConfig::default()
/// };
/// let transport = HttpTransport::new(&config).unwrap();
/// ```
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    endpoints: Vec<Url>,
    credentials: Option<(String, String)>,
    next: AtomicUsize,
}

impl HttpTransport {
    /// Create a transport for the nodes, credentials and timeout of `config`.
    pub fn new(config: &ElasticConfig) -> Result<Self, Error> {
        if config.hosts.is_empty() {
            return Err(Error::new("no elasticsearch hosts configured"));
        }
        let endpoints = config
            .hosts
            .iter()
            .map(|host| bulk_endpoint(host))
            .collect::<Result<Vec<_>, _>>()?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|err| Error::new("failed to build http client").with_source(err))?;

        let credentials = if config.user.is_empty() {
            None
        } else {
            Some((config.user.clone(), config.passwd.clone()))
        };

        Ok(Self {
            client,
            endpoints,
            credentials,
            next: AtomicUsize::new(0),
        })
    }

    /// The `_bulk` endpoints, one per node.
    pub fn endpoints(&self) -> &[Url] {
        &self.endpoints
    }

    fn endpoint(&self) -> &Url {
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.endpoints.len();
        &self.endpoints[i]
    }
}

impl Transport for HttpTransport {
    fn bulk(&self, body: Vec<u8>) -> Result<BulkResponse, Error> {
        let endpoint = self.endpoint();
        let mut request = self
            .client
            .post(endpoint.clone())
            .header(CONTENT_TYPE, NDJSON)
            .body(body);
        if let Some((user, passwd)) = &self.credentials {
            request = request.basic_auth(user, Some(passwd));
        }

        let response = request.send().map_err(Error::from_http_error)?;
        let status = response.status();
        let text = response.text().map_err(Error::from_http_error)?;

        if !status.is_success() {
            let mut body = text;
            if body.len() > MAX_ERROR_BODY {
                let mut end = MAX_ERROR_BODY;
                while !body.is_char_boundary(end) {
                    end -= 1;
                }
                body.truncate(end);
            }
            return Err(Error::new("bulk request was refused")
                .with_context("url", endpoint)
                .with_context("status", status.as_u16())
                .with_context("body", body));
        }

        match serde_json::from_str(&text) {
            Ok(response) => Ok(response),
            Err(err) => {
                log::debug!("cannot parse bulk response from {endpoint}: {err}");
                Ok(BulkResponse::default())
            }
        }
    }
}

fn bulk_endpoint(host: &str) -> Result<Url, Error> {
    let host = host.trim().trim_end_matches('/');
    let base = if host.contains("://") {
        host.to_owned()
    } else {
        format!("http://{host}")
    };

    Url::parse(&format!("{base}/_bulk")).map_err(|err| {
        Error::new("invalid elasticsearch host")
            .with_context("host", host)
            .with_source(err)
    })
}
