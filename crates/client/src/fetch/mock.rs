//! Scripted fetcher for strategy and lifecycle tests.

use super::{FetchRequest, FetchedResponse, Fetcher};
use async_trait::async_trait;
use bytes::Bytes;
use presta_core::Error;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{StatusCode, Url};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

type Scripted = Result<FetchedResponse, Error>;

/// Fetcher that replays scripted results per URL and counts calls.
///
/// Each call pops the next scripted result for the requested URL; running
/// out of script is a test bug and panics loudly.
#[derive(Default)]
pub(crate) struct MockFetcher {
    queues: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, url: &str, status: u16, body: &[u8]) {
        self.push(url, Ok(mock_response(url, status, &[], body)));
    }

    pub fn push_ok_with_header(&self, url: &str, status: u16, header: (&str, &str), body: &[u8]) {
        self.push(url, Ok(mock_response(url, status, &[header], body)));
    }

    pub fn push_err(&self, url: &str) {
        self.push(url, Err(Error::Upstream(format!("scripted network failure for {url}"))));
    }

    fn push(&self, url: &str, result: Scripted) {
        self.queues
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(result);
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedResponse, Error> {
        let url = request.url.to_string();
        *self.calls.lock().unwrap().entry(url.clone()).or_default() += 1;
        self.queues
            .lock()
            .unwrap()
            .get_mut(&url)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| panic!("no scripted response for {url}"))
    }
}

/// Build a fully buffered response for tests.
pub(crate) fn mock_response(url: &str, status: u16, headers: &[(&str, &str)], body: &[u8]) -> FetchedResponse {
    let url = Url::parse(url).unwrap();
    let mut header_map = HeaderMap::new();
    for (name, value) in headers {
        header_map.insert(
            HeaderName::from_bytes(name.as_bytes()).unwrap(),
            HeaderValue::from_str(value).unwrap(),
        );
    }
    FetchedResponse {
        url: url.clone(),
        final_url: url,
        status: StatusCode::from_u16(status).unwrap(),
        headers: header_map,
        bytes: Bytes::copy_from_slice(body),
        fetch_ms: 1,
    }
}
