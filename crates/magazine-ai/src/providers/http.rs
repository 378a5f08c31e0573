use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::models::{KeywordRewriteRequest, RewriteOutput, RewriteRequest};
use crate::rewriter::{ArticleRewriter, KeywordJob, RewriteInput};

/// JSON-over-HTTP client for the rewrite service.
#[derive(Clone)]
pub struct HttpRewriteService {
    base_url: String,
    client: Client,
    dispatch_timeout: Duration,
    rewrite_timeout: Duration,
}

impl HttpRewriteService {
    pub fn new(base_url: &str, dispatch_timeout_secs: u64, rewrite_timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            dispatch_timeout: Duration::from_secs(dispatch_timeout_secs),
            rewrite_timeout: Duration::from_secs(rewrite_timeout_secs),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

/// Short, non-sensitive description of a failed response.
async fn status_error(resp: reqwest::Response, what: &str) -> anyhow::Error {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    tracing::error!(
        status = %status,
        body = %body.chars().take(500).collect::<String>(),
        "{what} request failed"
    );
    anyhow::anyhow!("rewrite service returned {status}")
}

#[async_trait]
impl ArticleRewriter for HttpRewriteService {
    async fn dispatch_keyword(&self, job: KeywordJob) -> Result<()> {
        let req = KeywordRewriteRequest {
            rewrite_id: job.rewrite_id,
            keyword: job.keyword,
            callback_url: job.callback_url,
            options: job.options,
        };

        tracing::debug!(rewrite_id = %req.rewrite_id, keyword = %req.keyword, "Dispatching keyword rewrite");

        let resp = self
            .client
            .post(self.endpoint("keyword-rewrite"))
            .timeout(self.dispatch_timeout)
            .json(&req)
            .send()
            .await
            .context("rewrite service unreachable")?;

        if !resp.status().is_success() {
            return Err(status_error(resp, "Keyword rewrite").await);
        }
        Ok(())
    }

    async fn rewrite(&self, input: RewriteInput) -> Result<RewriteOutput> {
        let req = RewriteRequest {
            title: input.title,
            content: input.content,
            options: input.options,
        };

        tracing::debug!(content_length = req.content.len(), "Calling rewrite service");

        let resp = self
            .client
            .post(self.endpoint("rewrite"))
            .timeout(self.rewrite_timeout)
            .json(&req)
            .send()
            .await
            .context("rewrite service unreachable")?;

        if !resp.status().is_success() {
            return Err(status_error(resp, "Rewrite").await);
        }

        let out: RewriteOutput = resp
            .json()
            .await
            .context("rewrite service returned an invalid body")?;
        if out.content.trim().is_empty() {
            anyhow::bail!("rewrite service returned empty content");
        }
        Ok(out)
    }
}
