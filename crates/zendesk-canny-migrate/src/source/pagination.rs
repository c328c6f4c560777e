//! Cursor pagination over Zendesk list endpoints.
//!
//! Every list response is an envelope holding the page items under the
//! collection name plus a `next_page` URL. An empty or null `next_page` ends
//! the chain. Each chain is independent, so any number of paginators can run
//! concurrently against the same client.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;

use super::SourceApi;
use crate::error::{Error, Result};

/// One decoded page of a list endpoint.
#[derive(Debug)]
struct Page<T> {
    items: Vec<T>,
    next_page: Option<String>,
}

/// Page-at-a-time iterator over a cursor chain.
pub struct Paginator<'a, T> {
    api: &'a dyn SourceApi,
    collection: &'static str,
    next_url: Option<String>,
    page: usize,
    _items: PhantomData<fn() -> T>,
}

impl<'a, T: DeserializeOwned> Paginator<'a, T> {
    /// Starts a chain at `start_url`, reading items from the `collection` key.
    pub fn new(api: &'a dyn SourceApi, collection: &'static str, start_url: String) -> Self {
        Self {
            api,
            collection,
            next_url: Some(start_url),
            page: 0,
            _items: PhantomData,
        }
    }

    /// Number of pages fetched so far.
    pub fn pages_fetched(&self) -> usize {
        self.page
    }

    /// Fetches the next page, or returns `None` once the cursor is exhausted.
    ///
    /// # Errors
    ///
    /// `Error::Transport` if the request fails, `Error::MalformedResponse` if
    /// the envelope cannot be decoded or announces a next page without items.
    pub async fn next_page(&mut self) -> Result<Option<Vec<T>>> {
        let Some(url) = self.next_url.take() else {
            return Ok(None);
        };

        let context = format!("error while getting page {} of {}", self.page, self.collection);
        let body = self
            .api
            .get_json(&url)
            .await
            .map_err(|e| e.with_context(&context))?;
        let page = decode_page::<T>(body, self.collection, self.page)
            .map_err(|e| e.with_context(&context))?;

        self.page += 1;
        self.next_url = page.next_page;
        Ok(Some(page.items))
    }
}

/// Follows a cursor chain to the end and concatenates all items in page order.
///
/// # Errors
///
/// Fails on the first page that fails; items of earlier pages are discarded.
pub async fn fetch_all<T: DeserializeOwned>(
    api: &dyn SourceApi,
    collection: &'static str,
    start_url: String,
) -> Result<Vec<T>> {
    let mut paginator = Paginator::new(api, collection, start_url);
    let mut items = Vec::new();
    while let Some(page) = paginator.next_page().await? {
        items.extend(page);
    }
    Ok(items)
}

fn decode_page<T: DeserializeOwned>(body: Value, collection: &str, page: usize) -> Result<Page<T>> {
    let Value::Object(mut envelope) = body else {
        return Err(Error::MalformedResponse(format!(
            "page {} of {} is not a JSON object",
            page, collection
        )));
    };

    let next_page = match envelope.remove("next_page") {
        None | Some(Value::Null) => None,
        Some(Value::String(url)) if url.is_empty() => None,
        Some(Value::String(url)) => Some(url),
        Some(other) => {
            return Err(Error::MalformedResponse(format!(
                "next_page of {} is not a string: {}",
                collection, other
            )))
        }
    };

    let items = match envelope.remove(collection) {
        None | Some(Value::Null) => None,
        Some(value) => Some(serde_json::from_value::<Vec<T>>(value).map_err(|e| {
            Error::MalformedResponse(format!("cannot decode {}: {}", collection, e))
        })?),
    };

    match (items, next_page) {
        (None, Some(_)) => Err(Error::MalformedResponse(format!(
            "{} are not found on page {} while next page is present",
            collection, page
        ))),
        (items, next_page) => Ok(Page {
            items: items.unwrap_or_default(),
            next_page,
        }),
    }
}

#[cfg(test)]
#[path = "pagination_tests.rs"]
mod tests;
