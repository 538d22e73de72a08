use async_trait::async_trait;

/// Source of supplementary context for retrieval-augmented answers.
///
/// An empty or placeholder context is a degraded result, not an error:
/// callers proceed with generation either way.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve_context(&self, query: &str, collection: &str) -> String;
}

/// Returns the same configured context for every query
#[derive(Debug, Clone)]
pub struct StaticRetriever {
    context: String,
}

impl StaticRetriever {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
        }
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn retrieve_context(&self, _query: &str, _collection: &str) -> String {
        self.context.clone()
    }
}
