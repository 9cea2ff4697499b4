use crate::store::{
    Direction, Document, DocumentStore, Fields, OrderBy, Query, Snapshot, StoreError, StoreResult, Subscription,
    merge_fields,
};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// In-process document store. Collections keep insertion order; every write
/// bumps a revision that wakes the subscriptions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    collections: Mutex<HashMap<String, Vec<(String, Fields)>>>,
    revision: watch::Sender<u64>,
}

impl Default for Inner {
    fn default() -> Self {
        let (revision, _) = watch::channel(0);
        Self { collections: Mutex::default(), revision }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<(String, Fields)>>> {
        self.inner.collections.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.inner.revision.send_modify(|rev| *rev += 1);
    }

    pub fn revision(&self) -> u64 {
        *self.inner.revision.borrow()
    }

    /// Insert or replace a whole document.
    pub fn put(&self, collection: &str, id: &str, fields: Fields) {
        upsert(&mut self.lock(), collection, id, fields);
        self.bump();
    }

    /// Same semantics as [`DocumentStore::set`], without the future.
    pub fn write(&self, collection: &str, id: &str, fields: Fields, merge: bool) {
        {
            let mut collections = self.lock();
            let fields = if merge {
                let current = collections
                    .get(collection)
                    .and_then(|docs| docs.iter().find(|(doc_id, _)| doc_id == id))
                    .map(|(_, f)| f);
                merge_fields(current, &fields)
            } else {
                fields
            };
            upsert(&mut collections, collection, id, fields);
        }
        self.bump();
    }

    pub fn remove(&self, collection: &str, id: &str) -> Option<Fields> {
        let removed = self.lock().get_mut(collection).and_then(|docs| {
            let pos = docs.iter().position(|(doc_id, _)| doc_id == id)?;
            Some(docs.remove(pos).1)
        });
        if removed.is_some() {
            self.bump();
        }
        removed
    }

    /// Swap in a full copy of a collection, e.g. after a successful remote read.
    pub fn replace_collection(&self, collection: &str, docs: Vec<Document>) {
        let docs = docs.into_iter().map(|d| (d.id, d.fields)).collect();
        self.lock().insert(collection.to_owned(), docs);
        self.bump();
    }

    pub fn get_now(&self, collection: &str, id: &str) -> Option<Document> {
        self.lock()
            .get(collection)?
            .iter()
            .find(|(doc_id, _)| doc_id == id)
            .map(|(doc_id, fields)| Document::new(doc_id.clone(), fields.clone()))
    }

    pub fn list_now(&self, collection: &str, order: Option<&OrderBy>) -> Vec<Document> {
        let mut docs: Vec<Document> = self
            .lock()
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = order {
            docs.retain(|d| d.fields.contains_key(&order.field));
            docs.sort_by(|a, b| {
                let ord = compare_values(&a.fields[&order.field], &b.fields[&order.field]);
                match order.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }
        docs
    }

    pub fn snapshot_now(&self, query: &Query) -> Snapshot {
        match query {
            Query::Collection { name, order } => Snapshot::Collection(self.list_now(name, order.as_ref())),
            Query::Document { collection, id } => Snapshot::Document(self.get_now(collection, id)),
        }
    }
}

fn upsert(collections: &mut HashMap<String, Vec<(String, Fields)>>, collection: &str, id: &str, fields: Fields) {
    let docs = collections.entry(collection.to_owned()).or_default();
    match docs.iter_mut().find(|(doc_id, _)| doc_id == id) {
        Some((_, existing)) => *existing = fields,
        None => docs.push((id.to_owned(), fields)),
    }
}

/// Cross-type ordering: null < bool < number < string < everything else.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or_default(), y.as_f64().unwrap_or_default());
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        Ok(self.get_now(collection, id))
    }

    async fn list(&self, collection: &str, order: Option<&OrderBy>) -> StoreResult<Vec<Document>> {
        Ok(self.list_now(collection, order))
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields, merge: bool) -> StoreResult<()> {
        self.write(collection, id, fields, merge);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()> {
        {
            let mut collections = self.lock();
            let existing = collections
                .get_mut(collection)
                .and_then(|docs| docs.iter_mut().find(|(doc_id, _)| doc_id == id))
                .ok_or_else(|| StoreError::NotFound(format!("{collection}/{id}")))?;
            existing.1 = merge_fields(Some(&existing.1), &fields);
        }
        self.bump();
        Ok(())
    }

    async fn transact<F>(&self, collection: &str, id: &str, f: F) -> StoreResult<Fields>
    where
        F: Fn(Option<&Fields>) -> StoreResult<Fields> + Send + Sync,
    {
        let merged = {
            let mut collections = self.lock();
            let current = collections
                .get(collection)
                .and_then(|docs| docs.iter().find(|(doc_id, _)| doc_id == id))
                .map(|(_, fields)| fields.clone());
            let update = f(current.as_ref())?;
            let merged = merge_fields(current.as_ref(), &update);
            upsert(&mut collections, collection, id, merged.clone());
            merged
        };
        self.bump();
        Ok(merged)
    }

    fn subscribe(&self, query: Query) -> Subscription {
        let store = self.clone();
        let mut changes = self.inner.revision.subscribe();
        Subscription::spawn(move |tx| async move {
            let mut last: Option<Snapshot> = None;
            loop {
                let snapshot = store.snapshot_now(&query);
                if last.as_ref() != Some(&snapshot) {
                    if tx.send(snapshot.clone()).await.is_err() {
                        break;
                    }
                    last = Some(snapshot);
                }
                if changes.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => Fields::new(),
        }
    }

    fn team_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.put("teams", "1", fields(json!({"name": "Nursing", "points": 100})));
        store.put("teams", "2", fields(json!({"name": "Arts", "points": 250})));
        store.put("teams", "3", fields(json!({"name": "Biology"})));
        store
    }

    #[tokio::test]
    async fn ordered_list_skips_documents_without_the_field() {
        let store = team_store();
        let docs = store.list("teams", Some(&OrderBy::desc("points"))).await.unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1"]);

        let by_name = store.list("teams", Some(&OrderBy::asc("name"))).await.unwrap();
        let names: Vec<&str> = by_name.iter().filter_map(|d| d.fields["name"].as_str()).collect();
        assert_eq!(names, vec!["Arts", "Biology", "Nursing"]);
    }

    #[tokio::test]
    async fn unordered_list_keeps_insertion_order() {
        let docs = team_store().list("teams", None).await.unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn merge_set_keeps_other_fields() {
        let store = MemoryStore::new();
        store.set("schedules", "1", fields(json!({"1": ["a"]})), true).await.unwrap();
        store.set("schedules", "1", fields(json!({"2": ["b"]})), true).await.unwrap();
        let doc = store.get("schedules", "1").await.unwrap().unwrap();
        assert_eq!(Value::Object(doc.fields), json!({"1": ["a"], "2": ["b"]}));

        store.set("schedules", "1", fields(json!({"3": []})), false).await.unwrap();
        let doc = store.get("schedules", "1").await.unwrap().unwrap();
        assert_eq!(Value::Object(doc.fields), json!({"3": []}));
    }

    #[tokio::test]
    async fn update_requires_existing_document() {
        let store = team_store();
        let err = store.update("teams", "99", fields(json!({"points": 1}))).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        store.update("teams", "1", fields(json!({"points": 5}))).await.unwrap();
        let doc = store.get_now("teams", "1").unwrap();
        assert_eq!(doc.fields["points"], json!(5));
        assert_eq!(doc.fields["name"], json!("Nursing"));
    }

    #[tokio::test]
    async fn transaction_sees_current_fields() {
        let store = team_store();
        let written = store
            .transact("teams", "1", |current| {
                let points = current.and_then(|f| f["points"].as_f64()).unwrap_or_default();
                Ok(fields(json!({"points": points + 10.0})))
            })
            .await
            .unwrap();
        assert_eq!(written["points"], json!(110.0));
        assert_eq!(written["name"], json!("Nursing"));
    }

    #[tokio::test]
    async fn failed_transaction_writes_nothing() {
        let store = team_store();
        let before = store.revision();
        let result = store
            .transact("teams", "1", |_| Err(StoreError::Other("rejected".into())))
            .await;
        assert!(result.is_err());
        assert_eq!(store.revision(), before);
    }

    #[tokio::test]
    async fn subscription_fires_immediately_and_after_writes() {
        let store = team_store();
        let mut sub = store.subscribe(Query::document("teams", "1"));

        let first = sub.next().await.unwrap();
        assert!(matches!(first, Snapshot::Document(Some(ref d)) if d.fields["points"] == json!(100)));

        store.update("teams", "1", fields(json!({"points": 40}))).await.unwrap();
        let second = tokio::time::timeout(Duration::from_secs(1), sub.next()).await.unwrap().unwrap();
        assert!(matches!(second, Snapshot::Document(Some(ref d)) if d.fields["points"] == json!(40)));
    }

    #[tokio::test]
    async fn subscription_ignores_unrelated_writes() {
        let store = team_store();
        let mut sub = store.subscribe(Query::document("teams", "1"));
        sub.next().await.unwrap();

        store.put("games", "trivia", fields(json!({"name": "Trivia"})));
        let waited = tokio::time::timeout(Duration::from_millis(100), sub.next()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn cancelled_subscription_stops() {
        let store = team_store();
        let mut sub = store.subscribe(Query::collection("teams", None));
        sub.next().await.unwrap();
        sub.cancel();

        store.put("teams", "4", fields(json!({"name": "Law"})));
        assert_eq!(sub.next().await, None);
    }
}
