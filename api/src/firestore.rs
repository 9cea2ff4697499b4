//! Firestore REST v1 wire types: serde shapes for request and response
//! bodies, plus conversion between typed values and plain JSON.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as Json};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Typed values
// ---------------------------------------------------------------------------

/// One Firestore value. Serialized externally tagged, which is exactly the
/// `{"stringValue": "..."}` shape the REST API uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    /// int64 travels as a decimal string.
    IntegerValue(String),
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(LatLng),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Value>,
}

impl Value {
    pub fn to_json(&self) -> Json {
        match self {
            Value::NullValue(()) => Json::Null,
            Value::BooleanValue(b) => Json::Bool(*b),
            Value::IntegerValue(s) => match s.parse::<i64>() {
                Ok(n) => Json::Number(n.into()),
                Err(_) => Json::String(s.clone()),
            },
            Value::DoubleValue(d) => Number::from_f64(*d).map(Json::Number).unwrap_or(Json::Null),
            Value::TimestampValue(s)
            | Value::StringValue(s)
            | Value::BytesValue(s)
            | Value::ReferenceValue(s) => Json::String(s.clone()),
            Value::GeoPointValue(p) => {
                let mut map = Map::new();
                map.insert("latitude".into(), Number::from_f64(p.latitude).map_or(Json::Null, Json::Number));
                map.insert("longitude".into(), Number::from_f64(p.longitude).map_or(Json::Null, Json::Number));
                Json::Object(map)
            }
            Value::ArrayValue(a) => Json::Array(a.values.iter().map(Value::to_json).collect()),
            Value::MapValue(m) => Json::Object(fields_to_json(&m.fields)),
        }
    }

    pub fn from_json(json: &Json) -> Self {
        match json {
            Json::Null => Value::NullValue(()),
            Json::Bool(b) => Value::BooleanValue(*b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::IntegerValue(i.to_string())
                } else {
                    Value::DoubleValue(n.as_f64().unwrap_or_default())
                }
            }
            Json::String(s) => Value::StringValue(s.clone()),
            Json::Array(items) => Value::ArrayValue(ArrayValue {
                values: items.iter().map(Value::from_json).collect(),
            }),
            Json::Object(map) => Value::MapValue(MapValue { fields: fields_from_json(map) }),
        }
    }
}

pub fn fields_to_json(fields: &BTreeMap<String, Value>) -> Map<String, Json> {
    fields.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()
}

pub fn fields_from_json(map: &Map<String, Json>) -> BTreeMap<String, Value> {
    map.iter().map(|(k, v)| (k.clone(), Value::from_json(v))).collect()
}

/// Quote a top-level field name for use in an update mask or order clause.
/// Names that are not plain identifiers (day keys like `1`) go in backticks.
pub fn field_path(name: &str) -> String {
    let mut chars = name.chars();
    let simple = matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric());
    if simple {
        name.to_owned()
    } else {
        let escaped = name.replace('\\', "\\\\").replace('`', "\\`");
        format!("`{escaped}`")
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirestoreDocument {
    /// `projects/{p}/databases/(default)/documents/{collection}/{id}`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    #[serde(default, skip_serializing)]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing)]
    pub update_time: Option<String>,
}

impl FirestoreDocument {
    /// Last path segment of the resource name.
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// runQuery
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryRequest {
    pub structured_query: StructuredQuery,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredQuery {
    pub from: Vec<CollectionSelector>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<Order>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSelector {
    pub collection_id: String,
}

#[derive(Debug, Serialize)]
pub struct Order {
    pub field: FieldReference,
    pub direction: &'static str, // "ASCENDING" | "DESCENDING"
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReference {
    pub field_path: String,
}

/// One element of the streamed runQuery response array. Elements without a
/// document only carry progress information.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryResponse {
    pub document: Option<FirestoreDocument>,
    pub read_time: Option<String>,
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct BeginTransactionRequest {
    pub options: TransactionOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOptions {
    pub read_write: ReadWrite,
}

#[derive(Debug, Serialize, Default)]
pub struct ReadWrite {}

#[derive(Debug, Deserialize, Default)]
pub struct BeginTransactionResponse {
    #[serde(default)]
    pub transaction: String,
}

#[derive(Debug, Serialize)]
pub struct CommitRequest {
    pub writes: Vec<Write>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Write {
    pub update: FirestoreDocument,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_mask: Option<DocumentMask>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_document: Option<Precondition>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMask {
    pub field_paths: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct Precondition {
    pub exists: bool,
}

#[derive(Debug, Serialize)]
pub struct RollbackRequest {
    pub transaction: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize, Default)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String, // "ABORTED", "NOT_FOUND", ...
}
