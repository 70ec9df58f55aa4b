//! Response bodies of the Elasticsearch REST endpoints the backend calls.

use std::collections::HashMap;

use serde::Deserialize;

/// `GET /{index}/_doc/{id}` and each entry of `_mget`.
#[derive(Debug, Deserialize)]
pub(super) struct GetResponse<T> {
    #[serde(default)]
    pub found: bool,
    #[serde(rename = "_source")]
    pub source: Option<T>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MgetResponse<T> {
    pub docs: Vec<GetResponse<T>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SearchResponse<T> {
    pub hits: Hits<T>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Hits<T> {
    pub hits: Vec<Hit<T>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Hit<T> {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_source")]
    pub source: T,
    #[serde(rename = "_seq_no")]
    pub seq_no: Option<u64>,
    #[serde(rename = "_primary_term")]
    pub primary_term: Option<u64>,
}

/// `_update` with `_source=true` echoes the updated document under `get`.
#[derive(Debug, Deserialize)]
pub(super) struct UpdateResponse<T> {
    pub get: Option<UpdatedSource<T>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdatedSource<T> {
    #[serde(rename = "_source")]
    pub source: T,
}

#[derive(Debug, Deserialize)]
pub(super) struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Deserialize)]
pub(super) struct BulkResponse {
    pub errors: bool,
    /// One single-key map per action, keyed by the action name.
    pub items: Vec<HashMap<String, BulkItem>>,
}

impl BulkResponse {
    /// Failed items in request order.
    pub fn failures(&self) -> Vec<&BulkItem> {
        self.items
            .iter()
            .flat_map(|item| item.values())
            .filter(|item| item.error.is_some())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct BulkItem {
    pub status: u16,
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub error: Option<BulkError>,
}

#[derive(Debug, Deserialize)]
pub(super) struct BulkError {
    #[serde(rename = "type")]
    pub kind: String,
    pub reason: Option<String>,
}

impl std::fmt::Display for BulkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "{}: {}", self.kind, reason),
            None => f.write_str(&self.kind),
        }
    }
}

/// Projection of an order onto its item ids, used by the stock-level count.
#[derive(Debug, Deserialize)]
pub(super) struct OrderItems {
    #[serde(rename = "ORDER_LINE", default)]
    pub lines: Vec<LineItem>,
}

#[derive(Debug, Deserialize)]
pub(super) struct LineItem {
    #[serde(rename = "OL_I_ID")]
    pub item_id: u32,
}
