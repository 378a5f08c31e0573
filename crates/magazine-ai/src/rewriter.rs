use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::models::{RewriteOptions, RewriteOutput};

/// 关键词改写任务（异步，结果通过回调返回）
#[derive(Debug, Clone, Serialize)]
pub struct KeywordJob {
    pub rewrite_id: String,
    pub keyword: String,
    /// Absolute URL the service posts its result to.
    pub callback_url: String,
    pub options: Option<RewriteOptions>,
}

/// 同步改写输入
#[derive(Debug, Clone, Serialize)]
pub struct RewriteInput {
    pub title: Option<String>,
    pub content: String,
    pub options: Option<RewriteOptions>,
}

/// Seam between the API handlers and the external rewriting service.
#[async_trait]
pub trait ArticleRewriter: Send + Sync {
    /// Hand a keyword job to the service. `Ok` means the service accepted
    /// it; the result arrives later on the callback URL.
    async fn dispatch_keyword(&self, job: KeywordJob) -> Result<()>;

    /// Rewrite a piece of content and wait for the result.
    async fn rewrite(&self, input: RewriteInput) -> Result<RewriteOutput>;
}
