use serde::{Deserialize, Serialize};

/// Provider settings forwarded to the rewrite service with every job.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RewriteOptions {
    pub provider: String,
    pub model_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// `POST {base}/keyword-rewrite` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordRewriteRequest {
    pub rewrite_id: String,
    pub keyword: String,
    pub callback_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<RewriteOptions>,
}

/// `POST {base}/rewrite` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<RewriteOptions>,
}

/// Synchronous rewrite result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteOutput {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub meta_title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub meta_keywords: Option<String>,
}
