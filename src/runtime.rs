//! Wiring of embedders, vector stores and chat models for the CLI

use anyhow::{Context, Result, anyhow, bail};
use clap::ValueEnum;
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use ragmem_anthropic::AnthropicClient;
use ragmem_chat::PolicyKind;
use ragmem_core::{ChatModel, Embedder, IndexingResult, QueryEngine, SearchConfig, VectorStore};
use ragmem_gemini::GeminiEmbedder;
use ragmem_index::{
    DirectoryReader, HashEmbedder, Indexer, LocalVectorStore, QdrantConfig, QdrantVectorStore,
    QueryEngineTool, VectorQueryEngine,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmbedderKind {
    /// Local hashed bag-of-words embeddings, no network needed
    Hash,
    /// Gemini embedding API (needs GOOGLE_API_KEY)
    Gemini,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    Template,
    Rewrite,
}

impl From<PolicyArg> for PolicyKind {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Template => PolicyKind::Template,
            PolicyArg::Rewrite => PolicyKind::Rewrite,
        }
    }
}

/// A `--tool NAME=DESCRIPTION=PATH` argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub path: PathBuf,
}

impl std::str::FromStr for ToolSpec {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (name, rest) = s
            .split_once('=')
            .ok_or_else(|| format!("expected NAME=DESCRIPTION=PATH, got '{}'", s))?;
        let (description, path) = rest
            .rsplit_once('=')
            .ok_or_else(|| format!("expected NAME=DESCRIPTION=PATH, got '{}'", s))?;

        if name.trim().is_empty() || path.trim().is_empty() {
            return Err(format!("tool name and path must not be empty in '{}'", s));
        }

        Ok(Self {
            name: name.trim().to_string(),
            description: description.trim().to_string(),
            path: PathBuf::from(path.trim()),
        })
    }
}

/// Shared collaborators for one CLI invocation
pub struct Runtime {
    embedder: Arc<dyn Embedder>,
    qdrant_url: Option<String>,
    top_k: usize,
    contextual: bool,
    chat_model: Option<Arc<dyn ChatModel>>,
}

impl Runtime {
    pub fn new(embedder: EmbedderKind, qdrant_url: Option<String>, top_k: usize) -> Result<Self> {
        let embedder: Arc<dyn Embedder> = match embedder {
            EmbedderKind::Hash => Arc::new(HashEmbedder::default()),
            EmbedderKind::Gemini => Arc::new(
                GeminiEmbedder::from_env().context("failed to configure the Gemini embedder")?,
            ),
        };

        Ok(Self {
            embedder,
            qdrant_url,
            top_k,
            contextual: false,
            chat_model: None,
        })
    }

    /// Enrich each chunk with model-written context while indexing
    pub fn contextual(mut self, contextual: bool) -> Self {
        self.contextual = contextual;
        self
    }

    /// The chat model, created from the environment on first use
    pub fn chat_model(&mut self) -> Result<Arc<dyn ChatModel>> {
        if let Some(model) = &self.chat_model {
            return Ok(model.clone());
        }

        let client = AnthropicClient::from_env().context("failed to configure the Anthropic client")?;
        let model: Arc<dyn ChatModel> = Arc::new(client);
        self.chat_model = Some(model.clone());
        Ok(model)
    }

    /// Open the vector store for a collection: Qdrant when a URL was given,
    /// otherwise a fresh in-memory store
    pub async fn open_store(&self, collection: &str) -> Result<Arc<dyn VectorStore>> {
        match &self.qdrant_url {
            Some(url) => {
                let config = QdrantConfig::new(url, collection, self.embedder.dimensions())
                    .with_api_key(std::env::var("QDRANT_API_KEY").ok());
                let store = QdrantVectorStore::connect(config)
                    .await
                    .with_context(|| format!("failed to connect to Qdrant at {}", url))?;
                Ok(Arc::new(store))
            }
            None => Ok(Arc::new(LocalVectorStore::new())),
        }
    }

    /// Open the store for `index`, which needs one that outlives the process
    pub async fn persistent_store(&self, collection: &str) -> Result<Arc<dyn VectorStore>> {
        if self.qdrant_url.is_none() {
            bail!("indexing needs --qdrant-url (or QDRANT_URL); an in-memory store is dropped when the command exits");
        }
        self.open_store(collection).await
    }

    /// Load, chunk, embed and store the given files and directories
    pub async fn index(&mut self, store: Arc<dyn VectorStore>, paths: &[PathBuf]) -> Result<IndexingResult> {
        let mut indexer = Indexer::new(self.embedder.clone(), store);
        if self.contextual {
            indexer = indexer.with_contextualizer(self.chat_model()?);
        }

        let result = indexer
            .index_paths(&DirectoryReader::new().recursive(true), paths)
            .await?;
        info!(
            documents = result.documents_indexed,
            chunks = result.chunks_indexed,
            failed = result.chunks_failed,
            "indexing finished"
        );
        Ok(result)
    }

    /// Build a query engine over a collection, indexing `paths` into it first
    pub async fn engine(&mut self, collection: &str, paths: &[PathBuf]) -> Result<Arc<dyn QueryEngine>> {
        let store = self.open_store(collection).await?;

        if !paths.is_empty() {
            let result = self.index(store.clone(), paths).await?;
            report_indexing(&result);
        } else if self.qdrant_url.is_none() {
            bail!("no documents to search: pass --data, or --qdrant-url for an existing collection");
        }

        let engine = VectorQueryEngine::new(self.embedder.clone(), store, self.chat_model()?)
            .with_search_config(SearchConfig {
                top_k: self.top_k,
                score_threshold: None,
            });
        Ok(Arc::new(engine))
    }

    /// One query engine per tool, each over its own collection
    pub async fn tools(&mut self, specs: &[ToolSpec]) -> Result<Vec<QueryEngineTool>> {
        if specs.is_empty() {
            return Err(anyhow!("at least one --tool is required"));
        }

        let mut tools = Vec::with_capacity(specs.len());
        for spec in specs {
            let engine = self.engine(&spec.name, std::slice::from_ref(&spec.path)).await?;
            tools.push(QueryEngineTool::new(&spec.name, &spec.description, engine));
        }
        Ok(tools)
    }
}

pub fn report_indexing(result: &IndexingResult) {
    println!(
        "{} Indexed {} documents ({} chunks)",
        "✅".green(),
        result.documents_indexed,
        result.chunks_indexed
    );
    if result.chunks_failed > 0 {
        println!("{} {} chunks failed", "⚠️".yellow(), result.chunks_failed);
        for error in &result.errors {
            println!("  {} {}", "•".yellow(), error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tool_spec() {
        let spec: ToolSpec = "fin_stmt=Use this tool for financial statements=data/10q"
            .parse()
            .unwrap();
        assert_eq!(spec.name, "fin_stmt");
        assert_eq!(spec.description, "Use this tool for financial statements");
        assert_eq!(spec.path, PathBuf::from("data/10q"));
    }

    #[test]
    fn test_parse_tool_spec_description_with_equals() {
        let spec: ToolSpec = "prices=price = close=prices.csv".parse().unwrap();
        assert_eq!(spec.description, "price = close");
        assert_eq!(spec.path, PathBuf::from("prices.csv"));
    }

    #[test]
    fn test_parse_tool_spec_rejects_malformed() {
        assert!("just-a-name".parse::<ToolSpec>().is_err());
        assert!("=desc=path".parse::<ToolSpec>().is_err());
    }

    #[tokio::test]
    async fn test_index_without_qdrant_is_refused() {
        let runtime = Runtime::new(EmbedderKind::Hash, None, 2).unwrap();
        let err = match runtime.persistent_store("docs").await {
            Ok(_) => panic!("expected indexing without Qdrant to fail"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("--qdrant-url"));
    }

    #[tokio::test]
    async fn test_in_memory_store_without_qdrant() {
        let runtime = Runtime::new(EmbedderKind::Hash, None, 2).unwrap();
        let store = runtime.open_store("docs").await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_index_into_memory_store() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "Revenue was 100 this year.").unwrap();

        let mut runtime = Runtime::new(EmbedderKind::Hash, None, 2).unwrap();
        let store = runtime.open_store("docs").await.unwrap();
        let result = runtime
            .index(store.clone(), &[dir.path().to_path_buf()])
            .await
            .unwrap();

        assert_eq!(result.documents_indexed, 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
