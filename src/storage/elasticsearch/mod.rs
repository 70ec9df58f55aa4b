//! Elasticsearch storage backend.
//!
//! Talks to the REST API with `reqwest`. Elasticsearch has no multi-document
//! transactions, so the bracketing calls are no-ops and
//! `supports_transactions` reports false. Single-document atomicity covers
//! what the workload needs: the district counter is one scripted update and
//! new-order claims delete under `if_seq_no`/`if_primary_term`.
//!
//! Every index is named `{database}_{table}`. Documents get deterministic
//! ids built from their primary key so that inserts are create-only.

mod responses;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use self::responses::{
    BulkResponse, CountResponse, GetResponse, Hit, MgetResponse, OrderItems, SearchResponse,
    UpdateResponse,
};
use crate::config::StorageConfig;
use crate::models::{
    Customer, District, History, Item, NewOrder, Order, OrderLine, Record, Stock, StockUpdate,
    Table, Warehouse,
};
use crate::storage::helpers::{format_timestamp, select_median};
use crate::storage::{Result, Storage, StorageError};

/// Node used when the configured URI is empty.
pub const DEFAULT_URI: &str = "http://localhost:9200";

/// Versioned delete attempts before a claim gives up with a conflict.
const CLAIM_ATTEMPTS: usize = 8;

/// Server-side retries for scripted updates racing on the same document.
const RETRY_ON_CONFLICT: u32 = 5;

/// Upper bound on hits fetched by one search.
const MAX_HITS: usize = 10_000;

fn warehouse_key(w: u32) -> String {
    w.to_string()
}

fn district_key(w: u32, d: u32) -> String {
    format!("{w}.{d}")
}

fn customer_key(c: u32, w: u32, d: u32) -> String {
    format!("{w}.{d}.{c}")
}

fn order_key(o: u32, w: u32, d: u32) -> String {
    format!("{w}.{d}.{o}")
}

fn stock_key(i: u32, w: u32) -> String {
    format!("{w}.{i}")
}

/// Document id and body for a record. History rows get generated ids.
fn document(record: &Record) -> Result<(Option<String>, Value)> {
    Ok(match record {
        Record::Warehouse(w) => (Some(warehouse_key(w.w_id)), serde_json::to_value(w)?),
        Record::District(d) => (Some(district_key(d.d_w_id, d.d_id)), serde_json::to_value(d)?),
        Record::Customer(c) => (
            Some(customer_key(c.c_id, c.c_w_id, c.c_d_id)),
            serde_json::to_value(c)?,
        ),
        Record::History(h) => (None, serde_json::to_value(h)?),
        Record::NewOrder(n) => (
            Some(order_key(n.no_o_id, n.no_w_id, n.no_d_id)),
            serde_json::to_value(n)?,
        ),
        Record::Order(o) => (Some(order_key(o.o_id, o.o_w_id, o.o_d_id)), serde_json::to_value(o)?),
        Record::Item(i) => (Some(i.i_id.to_string()), serde_json::to_value(i)?),
        Record::Stock(s) => (Some(stock_key(s.s_i_id, s.s_w_id)), serde_json::to_value(s)?),
    })
}

/// Decode a successful response, mapping 404 and 409 onto the storage kinds.
async fn read<T: DeserializeOwned>(
    response: Response,
    entity: &'static str,
    key: &str,
) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::NOT_FOUND => StorageError::not_found(entity, key),
        StatusCode::CONFLICT => StorageError::conflict(entity, body),
        _ => StorageError::Transport(format!("{status}: {body}")),
    })
}

fn filter(terms: &[(&str, u32)]) -> Value {
    let clauses: Vec<Value> = terms
        .iter()
        .map(|(field, value)| {
            let mut term = serde_json::Map::new();
            term.insert(field.to_string(), json!(value));
            json!({ "term": term })
        })
        .collect();
    json!({ "bool": { "filter": clauses } })
}

/// Elasticsearch-backed storage.
#[derive(Clone)]
pub struct ElasticsearchStorage {
    client: Client,
    base_url: Arc<str>,
    prefix: Arc<str>,
    atomic_claim: bool,
}

impl ElasticsearchStorage {
    pub fn new(client: Client, base_url: &str, prefix: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').into(),
            prefix: prefix.to_ascii_lowercase().into(),
            atomic_claim: false,
        }
    }

    /// Delete new-order entries in the claiming call.
    pub fn with_atomic_claim(mut self, atomic_claim: bool) -> Self {
        self.atomic_claim = atomic_claim;
        self
    }

    /// Index backing `table`.
    pub fn index(&self, table: Table) -> String {
        format!("{}_{}", self.prefix, table)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        debug!(%method, path, "request");
        self.client
            .request(method, format!("{}/{}", self.base_url, path))
    }

    async fn ping(&self) -> Result<()> {
        let response = self.request(Method::GET, "").send().await?;
        read::<Value>(response, "cluster", &self.base_url).await?;
        Ok(())
    }

    async fn get_doc<T: DeserializeOwned>(
        &self,
        table: Table,
        entity: &'static str,
        id: &str,
    ) -> Result<T> {
        let path = format!("{}/_doc/{}", self.index(table), id);
        let response = self.request(Method::GET, &path).send().await?;
        let doc: GetResponse<T> = read(response, entity, id).await?;
        match doc.source {
            Some(source) if doc.found => Ok(source),
            _ => Err(StorageError::not_found(entity, id)),
        }
    }

    async fn update_script(
        &self,
        table: Table,
        entity: &'static str,
        id: &str,
        source: &str,
        params: Value,
    ) -> Result<()> {
        let path = format!(
            "{}/_update/{}?refresh=true&retry_on_conflict={}",
            self.index(table),
            id,
            RETRY_ON_CONFLICT
        );
        let response = self
            .request(Method::POST, &path)
            .json(&json!({
                "script": { "source": source, "lang": "painless", "params": params }
            }))
            .send()
            .await?;
        read::<Value>(response, entity, id).await?;
        Ok(())
    }

    async fn search<T: DeserializeOwned>(&self, table: Table, body: Value) -> Result<Vec<Hit<T>>> {
        let path = format!("{}/_search", self.index(table));
        let response = self.request(Method::POST, &path).json(&body).send().await?;
        let result: SearchResponse<T> = read(response, table.as_str(), "search").await?;
        Ok(result.hits.hits)
    }

    async fn mget<T: DeserializeOwned>(&self, table: Table, ids: Vec<String>) -> Result<Vec<T>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let path = format!("{}/_mget", self.index(table));
        let response = self
            .request(Method::POST, &path)
            .json(&json!({ "ids": ids }))
            .send()
            .await?;
        let result: MgetResponse<T> = read(response, table.as_str(), "mget").await?;
        Ok(result
            .docs
            .into_iter()
            .filter(|doc| doc.found)
            .filter_map(|doc| doc.source)
            .collect())
    }

    async fn bulk(&self, lines: &[Value]) -> Result<BulkResponse> {
        let mut body = String::new();
        for line in lines {
            body.push_str(&serde_json::to_string(line)?);
            body.push('\n');
        }
        let response = self
            .request(Method::POST, "_bulk?refresh=true")
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .await?;
        read(response, "bulk", "").await
    }

    fn create_action(&self, record: &Record) -> Result<[Value; 2]> {
        let (id, doc) = document(record)?;
        let mut meta = json!({ "_index": self.index(record.table()) });
        if let Some(id) = id {
            meta["_id"] = Value::String(id);
        }
        Ok([json!({ "create": meta }), doc])
    }

    async fn oldest_new_order(&self, w: u32, d: u32) -> Result<Option<Hit<NewOrder>>> {
        let hits = self
            .search(
                Table::NewOrder,
                json!({
                    "size": 1,
                    "seq_no_primary_term": true,
                    "query": filter(&[("NO_W_ID", w), ("NO_D_ID", d)]),
                    "sort": [{ "NO_O_ID": "asc" }]
                }),
            )
            .await?;
        Ok(hits.into_iter().next())
    }

    async fn claim_new_order(&self, w: u32, d: u32) -> Result<Option<NewOrder>> {
        for attempt in 1..=CLAIM_ATTEMPTS {
            let Some(hit) = self.oldest_new_order(w, d).await? else {
                return Ok(None);
            };
            let (Some(seq_no), Some(primary_term)) = (hit.seq_no, hit.primary_term) else {
                return Err(StorageError::Transport(
                    "search hit without sequence number".to_string(),
                ));
            };
            let path = format!(
                "{}/_doc/{}?if_seq_no={}&if_primary_term={}&refresh=true",
                self.index(Table::NewOrder),
                hit.id,
                seq_no,
                primary_term
            );
            let response = self.request(Method::DELETE, &path).send().await?;
            let status = response.status();
            match status {
                s if s.is_success() => return Ok(Some(hit.source)),
                StatusCode::CONFLICT | StatusCode::NOT_FOUND => {
                    debug!(attempt, id = %hit.id, "Claim lost to another worker");
                }
                _ => {
                    let body = response.text().await.unwrap_or_default();
                    return Err(StorageError::Transport(format!("{status}: {body}")));
                }
            }
        }
        Err(StorageError::conflict(
            "new_order",
            format!("claim in w={w} d={d} lost {CLAIM_ATTEMPTS} races"),
        ))
    }

    async fn get_order(&self, o: u32, w: u32, d: u32) -> Result<Order> {
        let mut order: Order = self.get_doc(Table::Orders, "order", &order_key(o, w, d)).await?;
        order.order_lines.sort_by_key(|line| line.ol_number);
        Ok(order)
    }
}

/// Connect to the node at `config.uri`, prefixing indices with `config.database`.
pub async fn connect(config: &StorageConfig) -> Result<ElasticsearchStorage> {
    let base_url = if config.uri.is_empty() {
        DEFAULT_URI
    } else {
        config.uri.as_str()
    };
    if config.transactions {
        warn!("Elasticsearch has no transactions; bracketing is disabled");
    }
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
    let storage = ElasticsearchStorage::new(client, base_url, &config.database)
        .with_atomic_claim(config.atomic_claim);
    storage.ping().await?;
    info!(url = base_url, prefix = %storage.prefix, "Connected to Elasticsearch");
    Ok(storage)
}

#[async_trait]
impl Storage for ElasticsearchStorage {
    fn session(&self) -> Arc<dyn Storage> {
        Arc::new(self.clone())
    }

    fn supports_transactions(&self) -> bool {
        false
    }

    async fn start_trx(&self) -> Result<()> {
        Ok(())
    }

    async fn commit_trx(&self) -> Result<()> {
        Ok(())
    }

    async fn rollback_trx(&self) -> Result<()> {
        Ok(())
    }

    async fn create_schema(&self) -> Result<()> {
        let settings = json!({
            "mappings": {
                "dynamic_templates": [
                    { "strings": {
                        "match_mapping_type": "string",
                        "mapping": { "type": "keyword" }
                    } },
                    { "doubles": {
                        "match_mapping_type": "double",
                        "mapping": { "type": "double" }
                    } }
                ]
            }
        });
        // Order lines live inside their order document.
        for table in Table::ALL.into_iter().filter(|t| *t != Table::OrderLine) {
            let index = self.index(table);
            let response = self.request(Method::PUT, &index).json(&settings).send().await?;
            let status = response.status();
            if status.is_success() {
                continue;
            }
            let body = response.text().await.unwrap_or_default();
            if status == StatusCode::BAD_REQUEST
                && body.contains("resource_already_exists_exception")
            {
                debug!(index = %index, "Index already exists");
                continue;
            }
            return Err(StorageError::Transport(format!("create {index}: {status}: {body}")));
        }
        info!(prefix = %self.prefix, "Indices created");
        Ok(())
    }

    async fn create_indexes(&self) -> Result<()> {
        let path = format!("{}/_mapping", self.index(Table::Orders));
        let response = self
            .request(Method::PUT, &path)
            .json(&json!({ "properties": { "ORDER_LINE": { "type": "nested" } } }))
            .send()
            .await?;
        read::<Value>(response, "orders", "mapping").await?;
        info!(prefix = %self.prefix, "Order line mapping applied");
        Ok(())
    }

    async fn insert_one(&self, record: &Record) -> Result<()> {
        let index = self.index(record.table());
        let (id, doc) = document(record)?;
        let (method, path, key) = match id {
            Some(id) => (Method::PUT, format!("{index}/_create/{id}?refresh=true"), id),
            None => (Method::POST, format!("{index}/_doc?refresh=true"), String::new()),
        };
        let response = self.request(method, &path).json(&doc).send().await?;
        read::<Value>(response, record.table().as_str(), &key).await?;
        Ok(())
    }

    async fn insert_batch(&self, table: Table, records: &[Record]) -> Result<()> {
        let misplaced = records.iter().filter(|r| r.table() != table).count();
        if misplaced > 0 {
            return Err(StorageError::BatchRejected {
                table,
                failed: misplaced,
                total: records.len(),
                reason: format!("records for other tables in {table} batch"),
            });
        }
        if records.is_empty() {
            return Ok(());
        }

        let mut lines = Vec::with_capacity(records.len() * 2);
        for record in records {
            lines.extend(self.create_action(record)?);
        }
        let result = self.bulk(&lines).await?;
        if !result.errors {
            return Ok(());
        }
        let failures = result.failures();
        let reason = failures
            .iter()
            .find_map(|item| item.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_default();
        warn!(
            table = %table,
            failed = failures.len(),
            total = records.len(),
            "Bulk insert had failures"
        );
        Err(StorageError::BatchRejected {
            table,
            failed: failures.len(),
            total: records.len(),
            reason,
        })
    }

    async fn increment_district_order_id(
        &self,
        warehouse_id: u32,
        district_id: u32,
    ) -> Result<u32> {
        let key = district_key(warehouse_id, district_id);
        let path = format!(
            "{}/_update/{}?refresh=true&retry_on_conflict={}&_source=true",
            self.index(Table::District),
            key,
            RETRY_ON_CONFLICT
        );
        let response = self
            .request(Method::POST, &path)
            .json(&json!({
                "script": { "source": "ctx._source.D_NEXT_O_ID += 1", "lang": "painless" }
            }))
            .send()
            .await?;
        let result: UpdateResponse<District> = read(response, "district", &key).await?;
        match result.get {
            Some(updated) => Ok(updated.source.d_next_o_id - 1),
            None => Err(StorageError::Transport(format!(
                "update of district {key} returned no source"
            ))),
        }
    }

    async fn get_new_order(&self, warehouse_id: u32, district_id: u32) -> Result<Option<NewOrder>> {
        if self.atomic_claim {
            return self.claim_new_order(warehouse_id, district_id).await;
        }
        Ok(self
            .oldest_new_order(warehouse_id, district_id)
            .await?
            .map(|hit| hit.source))
    }

    async fn check_new_order(
        &self,
        warehouse_id: u32,
        district_id: u32,
    ) -> Result<Option<NewOrder>> {
        Ok(self
            .oldest_new_order(warehouse_id, district_id)
            .await?
            .map(|hit| hit.source))
    }

    async fn delete_new_order(
        &self,
        order_id: u32,
        warehouse_id: u32,
        district_id: u32,
    ) -> Result<()> {
        if self.atomic_claim {
            return Ok(());
        }
        let key = order_key(order_id, warehouse_id, district_id);
        let path = format!("{}/_doc/{}?refresh=true", self.index(Table::NewOrder), key);
        let response = self.request(Method::DELETE, &path).send().await?;
        read::<Value>(response, "new_order", &key).await?;
        Ok(())
    }

    async fn get_customer(
        &self,
        customer_id: u32,
        warehouse_id: u32,
        district_id: u32,
    ) -> Result<Customer> {
        self.get_doc(
            Table::Customer,
            "customer",
            &customer_key(customer_id, warehouse_id, district_id),
        )
        .await
    }

    async fn get_customer_by_name(
        &self,
        last_name: &str,
        warehouse_id: u32,
        district_id: u32,
    ) -> Result<Customer> {
        let hits: Vec<Hit<Customer>> = self
            .search(
                Table::Customer,
                json!({
                    "size": MAX_HITS,
                    "query": {
                        "bool": {
                            "filter": [
                                { "term": { "C_W_ID": warehouse_id } },
                                { "term": { "C_D_ID": district_id } },
                                { "term": { "C_LAST": last_name } }
                            ]
                        }
                    },
                    "sort": [{ "C_ID": "asc" }]
                }),
            )
            .await?;
        select_median(hits.into_iter().map(|hit| hit.source).collect()).ok_or_else(|| {
            StorageError::not_found(
                "customer",
                format!("w={warehouse_id} d={district_id} last={last_name}"),
            )
        })
    }

    async fn get_customer_id_order(
        &self,
        order_id: u32,
        warehouse_id: u32,
        district_id: u32,
    ) -> Result<u32> {
        Ok(self.get_order(order_id, warehouse_id, district_id).await?.o_c_id)
    }

    async fn update_orders(
        &self,
        order_id: u32,
        warehouse_id: u32,
        district_id: u32,
        carrier_id: u32,
        delivery_date: DateTime<Utc>,
    ) -> Result<()> {
        self.update_script(
            Table::Orders,
            "order",
            &order_key(order_id, warehouse_id, district_id),
            "ctx._source.O_CARRIER_ID = params.carrier; \
             for (line in ctx._source.ORDER_LINE) { line.OL_DELIVERY_D = params.delivery_d; }",
            json!({ "carrier": carrier_id, "delivery_d": format_timestamp(&delivery_date) }),
        )
        .await
    }

    async fn sum_ol_amount(
        &self,
        order_id: u32,
        warehouse_id: u32,
        district_id: u32,
    ) -> Result<f64> {
        Ok(self
            .get_order(order_id, warehouse_id, district_id)
            .await?
            .total_amount())
    }

    async fn update_customer(
        &self,
        customer_id: u32,
        warehouse_id: u32,
        district_id: u32,
        amount: f64,
    ) -> Result<()> {
        self.update_script(
            Table::Customer,
            "customer",
            &customer_key(customer_id, warehouse_id, district_id),
            "ctx._source.C_BALANCE += params.amount; ctx._source.C_DELIVERY_CNT += 1;",
            json!({ "amount": amount }),
        )
        .await
    }

    async fn get_next_order_id(&self, warehouse_id: u32, district_id: u32) -> Result<u32> {
        Ok(self.get_district(warehouse_id, district_id).await?.d_next_o_id)
    }

    async fn get_stock_count(
        &self,
        order_id_lt: u32,
        order_id_ge: u32,
        threshold: i32,
        warehouse_id: u32,
        district_id: u32,
    ) -> Result<u64> {
        let hits: Vec<Hit<OrderItems>> = self
            .search(
                Table::Orders,
                json!({
                    "size": MAX_HITS,
                    "_source": ["ORDER_LINE.OL_I_ID"],
                    "query": {
                        "bool": {
                            "filter": [
                                { "term": { "O_W_ID": warehouse_id } },
                                { "term": { "O_D_ID": district_id } },
                                { "range": { "O_ID": { "gte": order_id_ge, "lt": order_id_lt } } }
                            ]
                        }
                    }
                }),
            )
            .await?;
        let items: BTreeSet<u32> = hits
            .into_iter()
            .flat_map(|hit| hit.source.lines)
            .map(|line| line.item_id)
            .collect();
        if items.is_empty() {
            return Ok(0);
        }

        let path = format!("{}/_count", self.index(Table::Stock));
        let response = self
            .request(Method::POST, &path)
            .json(&json!({
                "query": {
                    "bool": {
                        "filter": [
                            { "term": { "S_W_ID": warehouse_id } },
                            { "terms": { "S_I_ID": items } },
                            { "range": { "S_QUANTITY": { "lt": threshold } } }
                        ]
                    }
                }
            }))
            .send()
            .await?;
        let result: CountResponse = read(response, "stock", "count").await?;
        Ok(result.count)
    }

    async fn get_last_order(
        &self,
        customer_id: u32,
        warehouse_id: u32,
        district_id: u32,
    ) -> Result<Order> {
        let hits: Vec<Hit<Order>> = self
            .search(
                Table::Orders,
                json!({
                    "size": 1,
                    "query": filter(&[
                        ("O_W_ID", warehouse_id),
                        ("O_D_ID", district_id),
                        ("O_C_ID", customer_id),
                    ]),
                    "sort": [{ "O_ID": "desc" }]
                }),
            )
            .await?;
        let mut order = hits.into_iter().next().map(|hit| hit.source).ok_or_else(|| {
            StorageError::not_found(
                "order",
                format!("last of w={warehouse_id} d={district_id} c={customer_id}"),
            )
        })?;
        order.order_lines.sort_by_key(|line| line.ol_number);
        Ok(order)
    }

    async fn get_order_lines(
        &self,
        order_id: u32,
        warehouse_id: u32,
        district_id: u32,
    ) -> Result<Vec<OrderLine>> {
        Ok(self
            .get_order(order_id, warehouse_id, district_id)
            .await?
            .order_lines)
    }

    async fn get_warehouse(&self, warehouse_id: u32) -> Result<Warehouse> {
        self.get_doc(Table::Warehouse, "warehouse", &warehouse_key(warehouse_id))
            .await
    }

    async fn update_warehouse_balance(&self, warehouse_id: u32, amount: f64) -> Result<()> {
        self.update_script(
            Table::Warehouse,
            "warehouse",
            &warehouse_key(warehouse_id),
            "ctx._source.W_YTD += params.amount;",
            json!({ "amount": amount }),
        )
        .await
    }

    async fn get_district(&self, warehouse_id: u32, district_id: u32) -> Result<District> {
        self.get_doc(
            Table::District,
            "district",
            &district_key(warehouse_id, district_id),
        )
        .await
    }

    async fn update_district_balance(
        &self,
        warehouse_id: u32,
        district_id: u32,
        amount: f64,
    ) -> Result<()> {
        self.update_script(
            Table::District,
            "district",
            &district_key(warehouse_id, district_id),
            "ctx._source.D_YTD += params.amount;",
            json!({ "amount": amount }),
        )
        .await
    }

    async fn insert_history(&self, history: &History) -> Result<()> {
        self.insert_one(&Record::History(history.clone())).await
    }

    async fn update_credit(
        &self,
        customer_id: u32,
        warehouse_id: u32,
        district_id: u32,
        amount: f64,
        data: Option<&str>,
    ) -> Result<()> {
        self.update_script(
            Table::Customer,
            "customer",
            &customer_key(customer_id, warehouse_id, district_id),
            "ctx._source.C_BALANCE -= params.amount; \
             ctx._source.C_YTD_PAYMENT += params.amount; \
             ctx._source.C_PAYMENT_CNT += 1; \
             if (params.data != null) { ctx._source.C_DATA = params.data; }",
            json!({ "amount": amount, "data": data }),
        )
        .await
    }

    async fn create_order(&self, order: &Order) -> Result<()> {
        let mut lines = Vec::with_capacity(4);
        lines.extend(self.create_action(&Record::Order(order.clone()))?);
        lines.extend(self.create_action(&Record::NewOrder(order.new_order_entry()))?);

        let result = self.bulk(&lines).await?;
        if !result.errors {
            return Ok(());
        }
        let key = order_key(order.o_id, order.o_w_id, order.o_d_id);
        let failures = result.failures();
        if failures.iter().any(|item| item.status == StatusCode::CONFLICT.as_u16()) {
            return Err(StorageError::conflict("order", format!("{key} already exists")));
        }
        let reason = failures
            .iter()
            .find_map(|item| item.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_default();
        Err(StorageError::Transport(format!("create order {key}: {reason}")))
    }

    async fn get_items(&self, item_ids: &[u32]) -> Result<Vec<Item>> {
        self.mget(Table::Item, item_ids.iter().map(u32::to_string).collect())
            .await
    }

    async fn get_stock_info(&self, _district_id: u32, keys: &[(u32, u32)]) -> Result<Vec<Stock>> {
        self.mget(
            Table::Stock,
            keys.iter().map(|&(i, w)| stock_key(i, w)).collect(),
        )
        .await
    }

    async fn update_stocks(&self, updates: &[StockUpdate]) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let index = self.index(Table::Stock);
        let mut lines = Vec::with_capacity(updates.len() * 2);
        for u in updates {
            let id = stock_key(u.s_i_id, u.s_w_id);
            lines.push(json!({ "update": { "_index": index, "_id": id } }));
            lines.push(json!({
                "doc": {
                    "S_QUANTITY": u.s_quantity,
                    "S_YTD": u.s_ytd,
                    "S_ORDER_CNT": u.s_order_cnt,
                    "S_REMOTE_CNT": u.s_remote_cnt
                }
            }));
        }

        let result = self.bulk(&lines).await?;
        if !result.errors {
            return Ok(());
        }
        let failures = result.failures();
        if let Some(missing) = failures
            .iter()
            .find(|item| item.status == StatusCode::NOT_FOUND.as_u16())
        {
            return Err(StorageError::not_found(
                "stock",
                missing.id.clone().unwrap_or_default(),
            ));
        }
        let reason = failures
            .iter()
            .find_map(|item| item.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_default();
        Err(StorageError::Transport(format!("stock update: {reason}")))
    }
}
