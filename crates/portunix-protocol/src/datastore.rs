//! Datastore extension message shapes, gated behind the `datastore`
//! capability tag.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::base::StringMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreRequest {
    pub key: String,
    /// Opaque payload, base64-encoded at the JSON boundary by serde's
    /// default `Vec<u8>` handling is *not* used here — callers pass bytes
    /// already base64-encoded as a string to keep the wire format plain JSON.
    pub value: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub metadata: StringMap,
    #[serde(default)]
    pub config: StringMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreResponse {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub result_metadata: StringMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveRequest {
    pub key: String,
    #[serde(default)]
    pub filter: StringMap,
    #[serde(default)]
    pub config: StringMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveResponse {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub metadata: StringMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub collection: String,
    #[serde(default)]
    pub filter: StringMap,
    #[serde(default)]
    pub sort: Vec<String>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub config: StringMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub success: bool,
    #[serde(default)]
    pub results: Vec<Value>,
    pub total_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    pub key: String,
    #[serde(default)]
    pub config: StringMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequest {
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub config: StringMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub success: bool,
    #[serde(default)]
    pub keys: Vec<String>,
    pub total_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestConnectionRequest {
    #[serde(default)]
    pub config: StringMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestConnectionResponse {
    pub success: bool,
    #[serde(default)]
    pub connection_info: StringMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GetStatsRequest {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatastoreStats {
    pub total_keys: u64,
    pub total_size_bytes: u64,
    #[serde(default)]
    pub collections: Vec<String>,
    #[serde(default)]
    pub performance: StringMap,
    pub last_updated_timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetStatsResponse {
    pub stats: DatastoreStats,
}
