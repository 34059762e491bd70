//! Qdrant-backed vector store
//!
//! Chunks are stored as Qdrant points: the embedding is the point vector and
//! the text and metadata live in the payload. String ids are mapped to
//! name-based UUIDs, with the original id kept in the payload.

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, Distance, GetPointsBuilder, PointId,
    PointStruct, QueryPointsBuilder,
    UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use ragmem_core::{Error, Result, SearchConfig, SearchResult, VectorDocument, VectorStore};

const PAYLOAD_ID: &str = "_id";
const PAYLOAD_CONTENT: &str = "_content";
const PAYLOAD_METADATA: &str = "_metadata";

/// Connection settings for a Qdrant collection
#[derive(Debug, Clone)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub collection_name: String,
    pub dimensions: u64,
}

impl QdrantConfig {
    pub fn new(url: impl Into<String>, collection_name: impl Into<String>, dimensions: usize) -> Self {
        Self {
            url: url.into(),
            api_key: None,
            collection_name: collection_name.into(),
            dimensions: dimensions as u64,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }
}

/// Vector store backed by a Qdrant collection
pub struct QdrantVectorStore {
    client: Qdrant,
    collection_name: String,
    dimensions: u64,
}

/// Deterministic point id for a document id
pub fn point_id(id: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes()).to_string()
}

fn extract_string(value: &Value) -> Option<&str> {
    match &value.kind {
        Some(Kind::StringValue(s)) => Some(s.as_str()),
        _ => None,
    }
}

fn qdrant_error(action: &str) -> impl Fn(qdrant_client::QdrantError) -> Error + '_ {
    move |e| Error::VectorStore(format!("Qdrant {} failed: {}", action, e))
}

impl QdrantVectorStore {
    /// Connect to Qdrant and create the collection if it is missing
    pub async fn connect(config: QdrantConfig) -> Result<Self> {
        let mut builder = Qdrant::from_url(&config.url);
        if let Some(api_key) = config.api_key {
            builder = builder.api_key(api_key);
        }
        let client = builder.build().map_err(qdrant_error("connection"))?;

        let store = Self {
            client,
            collection_name: config.collection_name,
            dimensions: config.dimensions,
        };
        store.ensure_collection_exists().await?;
        Ok(store)
    }

    async fn ensure_collection_exists(&self) -> Result<()> {
        let exists = self
            .client
            .collection_exists(&self.collection_name)
            .await
            .map_err(qdrant_error("collection check"))?;

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection_name).vectors_config(
                        VectorParamsBuilder::new(self.dimensions, Distance::Cosine),
                    ),
                )
                .await
                .map_err(qdrant_error("create collection"))?;
            info!(collection = %self.collection_name, "created Qdrant collection");
        }

        Ok(())
    }

    fn to_point(document: VectorDocument) -> Result<PointStruct> {
        let embedding = document.embedding.ok_or_else(|| {
            Error::VectorStore(format!("document {} has no embedding", document.id))
        })?;

        let mut payload: HashMap<String, Value> = HashMap::new();
        payload.insert(PAYLOAD_ID.to_string(), document.id.clone().into());
        payload.insert(PAYLOAD_CONTENT.to_string(), document.content.into());
        payload.insert(
            PAYLOAD_METADATA.to_string(),
            serde_json::to_string(&document.metadata)?.into(),
        );

        Ok(PointStruct::new(point_id(&document.id), embedding, payload))
    }

    fn from_payload(payload: &HashMap<String, Value>, score: Option<f32>) -> VectorDocument {
        let get = |key: &str| payload.get(key).and_then(extract_string).unwrap_or_default();

        VectorDocument {
            id: get(PAYLOAD_ID).to_string(),
            content: get(PAYLOAD_CONTENT).to_string(),
            embedding: None,
            metadata: serde_json::from_str(get(PAYLOAD_METADATA)).unwrap_or_default(),
            score,
        }
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn store_batch(&self, documents: Vec<VectorDocument>) -> Result<Vec<String>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = documents.iter().map(|d| d.id.clone()).collect();
        let points = documents
            .into_iter()
            .map(Self::to_point)
            .collect::<Result<Vec<_>>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection_name, points).wait(true))
            .await
            .map_err(qdrant_error("upsert"))?;

        Ok(ids)
    }

    async fn search_by_vector(&self, vector: &[f32], config: &SearchConfig) -> Result<SearchResult> {
        let response = self
            .client
            .query(
                QueryPointsBuilder::new(&self.collection_name)
                    .query(vector.to_vec())
                    .limit(config.top_k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(qdrant_error("search"))?;

        let documents: Vec<VectorDocument> = response
            .result
            .iter()
            .filter(|point| match config.score_threshold {
                Some(threshold) => point.score >= threshold,
                None => true,
            })
            .map(|point| Self::from_payload(&point.payload, Some(point.score)))
            .collect();

        let total = documents.len();
        Ok(SearchResult { documents, total })
    }

    async fn get(&self, id: &str) -> Result<Option<VectorDocument>> {
        let ids: Vec<PointId> = vec![point_id(id).into()];
        let response = self
            .client
            .get_points(GetPointsBuilder::new(&self.collection_name, ids).with_payload(true))
            .await
            .map_err(qdrant_error("get"))?;

        Ok(response
            .result
            .first()
            .map(|point| Self::from_payload(&point.payload, None)))
    }

    async fn clear(&self) -> Result<()> {
        self.client
            .delete_collection(&self.collection_name)
            .await
            .map_err(qdrant_error("delete collection"))?;
        self.ensure_collection_exists().await
    }

    async fn count(&self) -> Result<usize> {
        let response = self
            .client
            .count(CountPointsBuilder::new(&self.collection_name).exact(true))
            .await
            .map_err(qdrant_error("count"))?;
        Ok(response.result.map(|c| c.count as usize).unwrap_or(0))
    }
}
