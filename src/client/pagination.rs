//! Offset/count pagination over collection endpoints.

use crate::client::{Endpoint, LinkedInClient};
use crate::client::transport::Transport;
use crate::error::{Error, Result};
use serde::Deserialize;
use serde_json::Value;

/// Decoded collection envelope `{"elements": [...], "paging": {"total": n}}`
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub elements: Vec<Value>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub total: Option<u64>,
}

impl Page {
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| Error::Format(format!("unexpected collection envelope: {e}")))
    }

    pub fn total(&self) -> Option<u64> {
        self.paging.as_ref().and_then(|p| p.total)
    }
}

/// Lazy sequence of every element of a collection, fetched page by page.
///
/// Pages are requested at offsets `0, count, 2*count, ...` only when the
/// consumer asks for more elements. The sequence ends when the reported total
/// has been fetched, when a page without a total comes back short, or when a
/// page is empty. The first error is yielded once and ends the sequence.
pub struct Paginated<'a, T: Transport> {
    client: &'a LinkedInClient<T>,
    endpoint: Endpoint,
    count: usize,
    start: usize,
    fetched: u64,
    buffered: std::vec::IntoIter<Value>,
    finished: bool,
    pending_error: Option<Error>,
}

impl<'a, T: Transport> Paginated<'a, T> {
    pub(crate) fn new(client: &'a LinkedInClient<T>, endpoint: Endpoint, count: usize) -> Self {
        let pending_error = (count == 0)
            .then(|| Error::Validation(format!("page size for '{}' must be positive", endpoint.path)));
        Paginated {
            client,
            endpoint,
            count,
            start: 0,
            fetched: 0,
            buffered: Vec::new().into_iter(),
            finished: false,
            pending_error,
        }
    }

    fn fetch_next_page(&mut self) -> Result<()> {
        let page = Page::from_value(self.client.fetch_page(&self.endpoint, self.start, self.count)?)?;
        let received = page.elements.len();
        self.fetched += received as u64;
        self.start += self.count;

        self.finished = received == 0
            || match page.total() {
                Some(total) => self.fetched >= total,
                None => received < self.count,
            };
        self.buffered = page.elements.into_iter();
        Ok(())
    }
}

impl<T: Transport> Iterator for Paginated<'_, T> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.pending_error.take() {
            self.finished = true;
            return Some(Err(err));
        }
        loop {
            if let Some(element) = self.buffered.next() {
                return Some(Ok(element));
            }
            if self.finished {
                return None;
            }
            if let Err(err) = self.fetch_next_page() {
                self.finished = true;
                return Some(Err(err));
            }
        }
    }
}
