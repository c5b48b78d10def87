//! Retrieval settings attached to every completion request.
//!
//! The hosted endpoint runs the vector search itself; the client only has to
//! name the index, the search credential and the embedding deployment.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Simple,
    Semantic,
    #[default]
    Vector,
    VectorSimpleHybrid,
    VectorSemanticHybrid,
}

impl QueryType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "simple" => Some(QueryType::Simple),
            "semantic" => Some(QueryType::Semantic),
            "vector" => Some(QueryType::Vector),
            "vector_simple_hybrid" => Some(QueryType::VectorSimpleHybrid),
            "vector_semantic_hybrid" => Some(QueryType::VectorSemanticHybrid),
            _ => None,
        }
    }
}

/// Immutable retrieval configuration, built once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalConfig {
    endpoint: String,
    index_name: String,
    search_key: String,
    embedding_deployment: String,
    query_type: QueryType,
}

impl RetrievalConfig {
    pub fn new(
        endpoint: impl Into<String>,
        index_name: impl Into<String>,
        search_key: impl Into<String>,
        embedding_deployment: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            index_name: index_name.into(),
            search_key: search_key.into(),
            embedding_deployment: embedding_deployment.into(),
            query_type: QueryType::default(),
        }
    }

    pub fn with_query_type(mut self, query_type: QueryType) -> Self {
        self.query_type = query_type;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn embedding_deployment(&self) -> &str {
        &self.embedding_deployment
    }

    pub fn query_type(&self) -> QueryType {
        self.query_type
    }

    /// The `data_sources` array of a completion request body
    pub fn data_sources(&self) -> Vec<DataSource> {
        vec![DataSource {
            kind: "azure_search".to_string(),
            parameters: SearchParameters {
                endpoint: self.endpoint.clone(),
                index_name: self.index_name.clone(),
                authentication: Authentication {
                    kind: "api_key".to_string(),
                    key: self.search_key.clone(),
                },
                query_type: self.query_type,
                embedding_dependency: EmbeddingDependency {
                    kind: "deployment_name".to_string(),
                    deployment_name: self.embedding_deployment.clone(),
                },
            },
        }]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSource {
    #[serde(rename = "type")]
    pub kind: String,
    pub parameters: SearchParameters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParameters {
    pub endpoint: String,
    pub index_name: String,
    pub authentication: Authentication,
    pub query_type: QueryType,
    pub embedding_dependency: EmbeddingDependency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Authentication {
    #[serde(rename = "type")]
    pub kind: String,
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingDependency {
    #[serde(rename = "type")]
    pub kind: String,
    pub deployment_name: String,
}
