use crate::config::FirebaseConfig;
use crate::firestore::{
    BeginTransactionRequest, BeginTransactionResponse, CollectionSelector, CommitRequest, DocumentMask,
    ErrorEnvelope, FieldReference, FirestoreDocument, Order, Precondition, ReadWrite, RollbackRequest,
    RunQueryRequest, RunQueryResponse, StructuredQuery, TransactionOptions, Write, field_path, fields_from_json,
    fields_to_json,
};
use crate::store::{
    Direction, Document, DocumentStore, Fields, OrderBy, Query, Snapshot, StoreError, StoreResult, Subscription,
    merge_fields,
};
use log::{debug, warn};
use reqwest::{Client, Method, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

const TRANSACTION_ATTEMPTS: u32 = 5;
const REQUEST_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Firestore REST v1 client.
#[derive(Debug, Clone)]
pub struct FirestoreClient {
    client: Client,
    endpoint: String,
    project_id: String,
    api_key: String,
    id_token: Option<String>,
    timeout: Duration,
    poll_interval: Duration,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl FirestoreClient {
    pub fn new(config: &FirebaseConfig) -> Self {
        Self {
            client: Client::builder()
                .user_agent("gamesboard/0.1 (terminal event board)")
                .build()
                .unwrap_or_default(),
            endpoint: config.endpoint().to_owned(),
            project_id: config.project_id.trim().to_owned(),
            api_key: config.api_key.trim().to_owned(),
            id_token: config.id_token.clone(),
            timeout: config.timeout(),
            poll_interval: config.poll_interval(),
            max_attempts: REQUEST_ATTEMPTS,
            retry_backoff: RETRY_BACKOFF,
        }
    }

    pub fn with_retry(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_backoff = backoff;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn database(&self) -> String {
        format!("projects/{}/databases/(default)", self.project_id)
    }

    /// `{endpoint}/v1/projects/{p}/databases/(default)/documents`
    fn documents_url(&self) -> String {
        format!("{}/v1/{}/documents", self.endpoint, self.database())
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{collection}/{id}", self.documents_url())
    }

    fn document_name(&self, collection: &str, id: &str) -> String {
        format!("{}/documents/{collection}/{id}", self.database())
    }

    /// Send one request, retrying network failures and 429/5xx with a linear
    /// backoff. Non-success statuses come back as `StoreError`.
    async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> StoreResult<Response> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut request = self
                .client
                .request(method.clone(), url)
                .timeout(self.timeout)
                .query(&[("key", self.api_key.as_str())]);
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(token) = &self.id_token {
                request = request.bearer_auth(token);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let err = match request.send().await {
                Ok(res) if res.status().is_success() => return Ok(res),
                Ok(res) => api_error(res, url).await,
                Err(e) => StoreError::Network(e, url.to_owned()),
            };
            if !err.is_transient() || attempt >= self.max_attempts {
                return Err(err);
            }
            debug!("{method} {url} failed (attempt {attempt}): {err}");
            tokio::time::sleep(self.retry_backoff * attempt).await;
        }
    }

    async fn json<T: DeserializeOwned>(res: Response, url: &str) -> StoreResult<T> {
        res.json::<T>()
            .await
            .map_err(|e| StoreError::Parsing(format!("{url}: {e}")))
    }

    async fn fetch(&self, collection: &str, id: &str, transaction: Option<&str>) -> StoreResult<Option<Document>> {
        let url = self.document_url(collection, id);
        let query: Vec<(&str, String)> = transaction
            .map(|tx| vec![("transaction", tx.to_owned())])
            .unwrap_or_default();
        debug!("GET {collection}/{id}");
        match self.execute::<()>(Method::GET, &url, &query, None).await {
            Ok(res) => {
                let doc: FirestoreDocument = Self::json(res, &url).await?;
                Ok(Some(into_document(doc, id)))
            }
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn patch(&self, collection: &str, id: &str, fields: &Fields, mask: bool, must_exist: bool) -> StoreResult<()> {
        let url = self.document_url(collection, id);
        let mut query: Vec<(&str, String)> = Vec::new();
        if mask {
            query.extend(fields.keys().map(|k| ("updateMask.fieldPaths", field_path(k))));
        }
        if must_exist {
            query.push(("currentDocument.exists", "true".to_owned()));
        }
        let body = FirestoreDocument { fields: fields_from_json(fields), ..Default::default() };
        debug!("PATCH {collection}/{id} ({} fields, mask: {mask})", fields.len());
        self.execute(Method::PATCH, &url, &query, Some(&body)).await?;
        Ok(())
    }

    async fn begin_transaction(&self) -> StoreResult<String> {
        let url = format!("{}:beginTransaction", self.documents_url());
        let body = BeginTransactionRequest {
            options: TransactionOptions { read_write: ReadWrite::default() },
        };
        let res = self.execute(Method::POST, &url, &[], Some(&body)).await?;
        let started: BeginTransactionResponse = Self::json(res, &url).await?;
        if started.transaction.is_empty() {
            return Err(StoreError::Parsing(format!("{url}: missing transaction id")));
        }
        Ok(started.transaction)
    }

    async fn commit(&self, collection: &str, id: &str, update: &Fields, exists: bool, transaction: &str) -> StoreResult<()> {
        let url = format!("{}:commit", self.documents_url());
        let body = CommitRequest {
            writes: vec![Write {
                update: FirestoreDocument {
                    name: self.document_name(collection, id),
                    fields: fields_from_json(update),
                    ..Default::default()
                },
                update_mask: Some(DocumentMask {
                    field_paths: update.keys().map(|k| field_path(k)).collect(),
                }),
                current_document: Some(Precondition { exists }),
            }],
            transaction: Some(transaction.to_owned()),
        };
        self.execute(Method::POST, &url, &[], Some(&body)).await?;
        Ok(())
    }

    async fn rollback(&self, transaction: &str) {
        let url = format!("{}:rollback", self.documents_url());
        let body = RollbackRequest { transaction: transaction.to_owned() };
        if let Err(e) = self.execute(Method::POST, &url, &[], Some(&body)).await {
            warn!("rollback failed: {e}");
        }
    }

    async fn try_transaction<F>(&self, collection: &str, id: &str, f: &F) -> StoreResult<Fields>
    where
        F: Fn(Option<&Fields>) -> StoreResult<Fields> + Send + Sync,
    {
        let transaction = self.begin_transaction().await?;
        let result = async {
            let current = self.fetch(collection, id, Some(&transaction)).await?;
            let current = current.map(|d| d.fields);
            let update = f(current.as_ref())?;
            self.commit(collection, id, &update, current.is_some(), &transaction).await?;
            Ok::<_, StoreError>(merge_fields(current.as_ref(), &update))
        }
        .await;

        // An aborted commit has already released the transaction.
        if let Err(e) = &result
            && !matches!(e, StoreError::Aborted(_))
        {
            self.rollback(&transaction).await;
        }
        result
    }
}

impl DocumentStore for FirestoreClient {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        self.fetch(collection, id, None).await
    }

    async fn list(&self, collection: &str, order: Option<&OrderBy>) -> StoreResult<Vec<Document>> {
        let url = format!("{}:runQuery", self.documents_url());
        let body = RunQueryRequest {
            structured_query: StructuredQuery {
                from: vec![CollectionSelector { collection_id: collection.to_owned() }],
                order_by: order
                    .map(|o| Order {
                        field: FieldReference { field_path: field_path(&o.field) },
                        direction: match o.direction {
                            Direction::Ascending => "ASCENDING",
                            Direction::Descending => "DESCENDING",
                        },
                    })
                    .into_iter()
                    .collect(),
            },
        };
        debug!("runQuery {collection}");
        let res = self.execute(Method::POST, &url, &[], Some(&body)).await?;
        let rows: Vec<RunQueryResponse> = Self::json(res, &url).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.document)
            .map(|doc| {
                let id = doc.id().to_owned();
                into_document(doc, &id)
            })
            .collect())
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields, merge: bool) -> StoreResult<()> {
        if merge && fields.is_empty() {
            return Ok(());
        }
        self.patch(collection, id, &fields, merge, false).await
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()> {
        self.patch(collection, id, &fields, true, true).await
    }

    async fn transact<F>(&self, collection: &str, id: &str, f: F) -> StoreResult<Fields>
    where
        F: Fn(Option<&Fields>) -> StoreResult<Fields> + Send + Sync,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_transaction(collection, id, &f).await {
                Err(StoreError::Aborted(msg)) if attempt < TRANSACTION_ATTEMPTS => {
                    debug!("transaction on {collection}/{id} aborted (attempt {attempt}): {msg}");
                }
                other => return other,
            }
        }
    }

    /// Polls the query, emitting only when the result changed. The first
    /// poll happens right away.
    fn subscribe(&self, query: Query) -> Subscription {
        let client = self.clone();
        let period = self.poll_interval.max(Duration::from_millis(10));
        Subscription::spawn(move |tx| async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut last: Option<Snapshot> = None;
            loop {
                interval.tick().await;
                match client.snapshot(&query).await {
                    Ok(snapshot) => {
                        if last.as_ref() == Some(&snapshot) {
                            continue;
                        }
                        if tx.send(snapshot.clone()).await.is_err() {
                            break;
                        }
                        last = Some(snapshot);
                    }
                    Err(e) => warn!("subscription poll failed: {e}"),
                }
            }
        })
    }
}

fn into_document(doc: FirestoreDocument, id: &str) -> Document {
    Document::new(id, fields_to_json(&doc.fields))
}

async fn api_error(res: Response, url: &str) -> StoreError {
    let status = res.status().as_u16();
    let body = res.text().await.unwrap_or_default();
    let envelope: ErrorEnvelope = serde_json::from_str(&body).unwrap_or_default();
    let message = if envelope.error.message.is_empty() { body } else { envelope.error.message };

    match (status, envelope.error.status.as_str()) {
        (404, _) | (_, "NOT_FOUND") => StoreError::NotFound(format!("{url}: {message}")),
        (409, _) | (_, "ABORTED") => StoreError::Aborted(message),
        _ => StoreError::Api { status, message, url: url.to_owned() },
    }
}
