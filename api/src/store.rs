use crate::client::FirestoreClient;
use crate::config::FirebaseConfig;
use crate::memory::MemoryStore;
use futures_util::Stream;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub type StoreResult<T> = Result<T, StoreError>;

/// Top-level fields of a stored document.
pub type Fields = serde_json::Map<String, Value>;

const SUBSCRIPTION_BUFFER: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self { id: id.into(), fields }
    }

    /// Decode the fields into a typed value. The document id is exposed to
    /// the target as an `id` field unless the document already carries one.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        let mut fields = self.fields.clone();
        fields
            .entry("id")
            .or_insert_with(|| Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| StoreError::Parsing(format!("document {}: {e}", self.id)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: Direction::Ascending }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: Direction::Descending }
    }
}

/// What a subscription watches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Collection { name: String, order: Option<OrderBy> },
    Document { collection: String, id: String },
}

impl Query {
    pub fn collection(name: impl Into<String>, order: Option<OrderBy>) -> Self {
        Query::Collection { name: name.into(), order }
    }

    pub fn document(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Query::Document { collection: collection.into(), id: id.into() }
    }
}

/// Result of evaluating a [`Query`] at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Collection(Vec<Document>),
    Document(Option<Document>),
}

#[derive(Debug)]
pub enum StoreError {
    /// Remote credentials are missing or still hold placeholder values.
    NotConfigured,
    NotFound(String),
    Network(reqwest::Error, String),
    Api { status: u16, message: String, url: String },
    Parsing(String),
    /// Transaction lost to a concurrent writer.
    Aborted(String),
    Other(String),
}

impl StoreError {
    /// Network failures, throttling and server errors are worth another try.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Network(..) => true,
            StoreError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotConfigured => write!(f, "Remote store is not configured"),
            StoreError::NotFound(what) => write!(f, "Not found: {what}"),
            StoreError::Network(e, url) => write!(f, "Network error for {url}: {e}"),
            StoreError::Api { status, message, url } => {
                write!(f, "API error {status} for {url}: {message}")
            }
            StoreError::Parsing(msg) => write!(f, "Parse error: {msg}"),
            StoreError::Aborted(msg) => write!(f, "Transaction aborted: {msg}"),
            StoreError::Other(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Network(e, _) => Some(e),
            _ => None,
        }
    }
}

/// Live feed of snapshots for one [`Query`].
///
/// The first snapshot arrives right away, later ones whenever the data
/// changes. Dropping the subscription (or calling [`Subscription::cancel`])
/// stops the background task.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::Receiver<Snapshot>,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn spawn<F, Fut>(task: F) -> Self
    where
        F: FnOnce(mpsc::Sender<Snapshot>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let handle = tokio::spawn(task(tx));
        Self { rx, handle: Some(handle) }
    }

    pub async fn next(&mut self) -> Option<Snapshot> {
        self.rx.recv().await
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.rx.close();
    }

    pub fn is_cancelled(&self) -> bool {
        self.handle.is_none()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl Stream for Subscription {
    type Item = Snapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Document service behind the repository: a remote Firestore project or the
/// in-process store seeded from bundled data.
pub trait DocumentStore: Send + Sync {
    fn get(&self, collection: &str, id: &str) -> impl Future<Output = StoreResult<Option<Document>>> + Send;

    /// Documents lacking the `order` field are left out of an ordered list.
    fn list(
        &self,
        collection: &str,
        order: Option<&OrderBy>,
    ) -> impl Future<Output = StoreResult<Vec<Document>>> + Send;

    /// Write a document. With `merge`, only the given top-level fields are
    /// replaced and the rest of the document is kept.
    fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        merge: bool,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Merge fields into an existing document; `NotFound` when it is absent.
    fn update(&self, collection: &str, id: &str, fields: Fields) -> impl Future<Output = StoreResult<()>> + Send;

    /// Atomic read-modify-write. `f` sees the current fields (None when the
    /// document does not exist) and returns the fields to merge in. It may
    /// run more than once under contention. Returns the document as written.
    fn transact<F>(&self, collection: &str, id: &str, f: F) -> impl Future<Output = StoreResult<Fields>> + Send
    where
        F: Fn(Option<&Fields>) -> StoreResult<Fields> + Send + Sync;

    fn subscribe(&self, query: Query) -> Subscription;

    fn snapshot(&self, query: &Query) -> impl Future<Output = StoreResult<Snapshot>> + Send {
        async move {
            match query {
                Query::Collection { name, order } => {
                    self.list(name, order.as_ref()).await.map(Snapshot::Collection)
                }
                Query::Document { collection, id } => self.get(collection, id).await.map(Snapshot::Document),
            }
        }
    }
}

/// The store picked at startup. Consumers hold a `Backend` and never branch
/// on which one is active.
#[derive(Debug, Clone)]
pub enum Backend {
    Remote(FirestoreClient),
    Local(MemoryStore),
}

impl Backend {
    pub fn from_config(config: &FirebaseConfig) -> Self {
        if config.is_configured() {
            log::debug!("using Firestore project {}", config.project_id);
            Backend::Remote(FirestoreClient::new(config))
        } else {
            log::debug!("Firestore not configured, using bundled data");
            Backend::Local(crate::seed::memory_store())
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Backend::Remote(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Backend::Remote(_) => "firestore",
            Backend::Local(_) => "local",
        }
    }
}

impl DocumentStore for Backend {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        match self {
            Backend::Remote(s) => s.get(collection, id).await,
            Backend::Local(s) => s.get(collection, id).await,
        }
    }

    async fn list(&self, collection: &str, order: Option<&OrderBy>) -> StoreResult<Vec<Document>> {
        match self {
            Backend::Remote(s) => s.list(collection, order).await,
            Backend::Local(s) => s.list(collection, order).await,
        }
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields, merge: bool) -> StoreResult<()> {
        match self {
            Backend::Remote(s) => s.set(collection, id, fields, merge).await,
            Backend::Local(s) => s.set(collection, id, fields, merge).await,
        }
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()> {
        match self {
            Backend::Remote(s) => s.update(collection, id, fields).await,
            Backend::Local(s) => s.update(collection, id, fields).await,
        }
    }

    async fn transact<F>(&self, collection: &str, id: &str, f: F) -> StoreResult<Fields>
    where
        F: Fn(Option<&Fields>) -> StoreResult<Fields> + Send + Sync,
    {
        match self {
            Backend::Remote(s) => s.transact(collection, id, f).await,
            Backend::Local(s) => s.transact(collection, id, f).await,
        }
    }

    fn subscribe(&self, query: Query) -> Subscription {
        match self {
            Backend::Remote(s) => s.subscribe(query),
            Backend::Local(s) => s.subscribe(query),
        }
    }
}

/// Merge `update` over `base`, replacing whole top-level fields.
pub fn merge_fields(base: Option<&Fields>, update: &Fields) -> Fields {
    let mut merged = base.cloned().unwrap_or_default();
    for (key, value) in update {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => Fields::new(),
        }
    }

    #[test]
    fn decode_exposes_document_id() {
        #[derive(serde::Deserialize)]
        struct Named {
            id: String,
            name: String,
        }

        let doc = Document::new("7", fields(json!({"name": "Biology"})));
        let named: Named = doc.decode().unwrap();
        assert_eq!(named.id, "7");
        assert_eq!(named.name, "Biology");
    }

    #[test]
    fn decode_keeps_explicit_id_field() {
        let doc = Document::new("doc-1", fields(json!({"id": 3})));
        let value: Value = doc.decode().unwrap();
        assert_eq!(value["id"], json!(3));
    }

    #[test]
    fn merge_replaces_top_level_fields_only() {
        let base = fields(json!({"1": [{"name": "a"}], "2": [{"name": "b"}]}));
        let update = fields(json!({"2": []}));
        let merged = merge_fields(Some(&base), &update);
        assert_eq!(merged["1"], json!([{"name": "a"}]));
        assert_eq!(merged["2"], json!([]));
    }

    #[test]
    fn transient_errors_are_classified() {
        let throttled = StoreError::Api { status: 429, message: String::new(), url: String::new() };
        let unavailable = StoreError::Api { status: 503, message: String::new(), url: String::new() };
        let denied = StoreError::Api { status: 403, message: String::new(), url: String::new() };
        assert!(throttled.is_transient());
        assert!(unavailable.is_transient());
        assert!(!denied.is_transient());
        assert!(!StoreError::NotFound("teams/1".into()).is_transient());
        assert!(!StoreError::Aborted("contention".into()).is_transient());
    }

    #[tokio::test]
    async fn cancelled_subscription_yields_nothing() {
        let mut sub = Subscription::spawn(|tx| async move {
            let _ = tx.send(Snapshot::Document(None)).await;
            std::future::pending::<()>().await;
        });
        assert_eq!(sub.next().await, Some(Snapshot::Document(None)));
        sub.cancel();
        assert!(sub.is_cancelled());
        assert_eq!(sub.next().await, None);
    }
}
