//! Knowledge base
//!
//! Reference documents the planner grounds on: platform guides, pricing
//! notes, and previously confirmed plans written back as examples. The
//! store-backed implementation ranks by keyword overlap, which is enough
//! for the small corpora this runs against.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use docstore::{Filter, IndexValue, Record, Store, StoreError, now_ms};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::generate_id;

/// Content type for confirmed plans fed back as planning examples
pub const CONTENT_TYPE_CAMPAIGN_PLAN: &str = "campaign_plan";

/// Errors from knowledge base operations
#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// A reference document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub content: String,
    /// Coarse kind used to scope searches (guide, pricing, campaign_plan)
    pub content_type: String,
    /// Where the document came from, if anywhere
    #[serde(default)]
    pub source_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Document {
    pub fn new(
        name: impl Into<String>,
        content: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let now = now_ms();
        Self {
            id: generate_id("doc", &name),
            name,
            content: content.into(),
            content_type: content_type.into(),
            source_url: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Record for Document {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn collection_name() -> &'static str {
        "documents"
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert(
            "content_type".to_string(),
            IndexValue::String(self.content_type.clone()),
        );
        fields
    }
}

/// Reference document lookup for the planner
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Store a document
    async fn add_document(&self, doc: Document) -> Result<(), KnowledgeError>;

    /// Return the contents of the best-matching documents, most relevant
    /// first
    async fn search(
        &self,
        query: &str,
        content_type: Option<&str>,
        limit: usize,
    ) -> Result<Vec<String>, KnowledgeError>;
}

/// Docstore-backed knowledge base with keyword-overlap ranking
pub struct StoreKnowledgeBase {
    store: Arc<Store>,
}

impl StoreKnowledgeBase {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

/// Count how many distinct query terms appear in the document text
fn overlap_score(query_terms: &[String], text: &str) -> usize {
    let haystack = text.to_lowercase();
    query_terms.iter().filter(|term| haystack.contains(term.as_str())).count()
}

fn query_terms(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|t| t.chars().count() > 1)
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl KnowledgeBase for StoreKnowledgeBase {
    async fn add_document(&self, doc: Document) -> Result<(), KnowledgeError> {
        debug!(doc_id = %doc.id, content_type = %doc.content_type, "StoreKnowledgeBase::add_document: called");
        self.store.create(&doc)?;
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        content_type: Option<&str>,
        limit: usize,
    ) -> Result<Vec<String>, KnowledgeError> {
        debug!(%query, ?content_type, limit, "StoreKnowledgeBase::search: called");
        let filters = match content_type {
            Some(ct) => vec![Filter::eq("content_type", IndexValue::from(ct.to_string()))],
            None => vec![],
        };
        let docs: Vec<Document> = self.store.list(&filters)?;

        let terms = query_terms(query);
        let mut scored: Vec<(usize, Document)> = docs
            .into_iter()
            .map(|d| {
                let score = overlap_score(&terms, &format!("{} {}", d.name, d.content));
                (score, d)
            })
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored.into_iter().take(limit).map(|(_, d)| d.content).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kb() -> StoreKnowledgeBase {
        StoreKnowledgeBase::new(Arc::new(Store::in_memory().unwrap()))
    }

    #[tokio::test]
    async fn test_add_and_search() {
        let kb = kb();
        kb.add_document(Document::new(
            "native pricing",
            "native campaigns bid between 1500 and 4000 toman per click",
            "pricing",
        ))
        .await
        .unwrap();
        kb.add_document(Document::new("banner sizes", "banner creatives use fixed sizes", "guide"))
            .await
            .unwrap();

        let hits = kb.search("native bid toman", None, 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].contains("1500"));
    }

    #[tokio::test]
    async fn test_search_scoped_by_content_type() {
        let kb = kb();
        kb.add_document(Document::new("a", "campaign budget advice", "guide")).await.unwrap();
        kb.add_document(Document::new("b", "campaign budget example", CONTENT_TYPE_CAMPAIGN_PLAN))
            .await
            .unwrap();

        let hits = kb
            .search("campaign budget", Some(CONTENT_TYPE_CAMPAIGN_PLAN), 5)
            .await
            .unwrap();
        assert_eq!(hits, vec!["campaign budget example".to_string()]);
    }

    #[tokio::test]
    async fn test_search_ranks_by_overlap() {
        let kb = kb();
        kb.add_document(Document::new("weak", "campaign", "guide")).await.unwrap();
        kb.add_document(Document::new("strong", "campaign budget targeting", "guide"))
            .await
            .unwrap();

        let hits = kb.search("campaign budget targeting", None, 1).await.unwrap();
        assert_eq!(hits, vec!["campaign budget targeting".to_string()]);
    }

    #[tokio::test]
    async fn test_search_no_match_returns_empty() {
        let kb = kb();
        kb.add_document(Document::new("a", "unrelated text", "guide")).await.unwrap();
        let hits = kb.search("قهوه", None, 5).await.unwrap();
        assert!(hits.is_empty());
    }
}
