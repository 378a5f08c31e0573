//! Keyword rewrite jobs: `pending -> processing -> completed | failed`.
//!
//! The record is created before the rewrite service is called, moved to
//! `processing` once the service accepts the job, and finished by the
//! signed callback. A failed job can be retried, a completed one converted
//! into a draft or a published article.

use chrono::Utc;
use magazine_common::types::{
    ConvertedArticle, KeywordRewrite, KeywordRewriteCallback, PublishStatus, RewriteStatus,
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, TransactionTrait,
};

use crate::entities::keyword_rewrite::{self, Column, Entity};
use crate::error::{Result, StorageError};
use crate::store::approved::{insert_approved_in, NewApproved};
use crate::store::draft::{approved_slug_taken, insert_draft_in, unique_slug, NewDraft};
use crate::store::{derive_slug, parse_column, CallbackOutcome, ContentStore};

#[derive(Debug, Clone, Default)]
pub struct KeywordRewriteFilter {
    pub status: Option<RewriteStatus>,
    /// Substring of the keyword.
    pub keyword: Option<String>,
}

/// Parameters for turning a completed rewrite into an article.
#[derive(Debug, Clone, Default)]
pub struct KeywordConversion {
    pub category_id: String,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub publish: bool,
    pub user_id: Option<String>,
}

fn to_keyword_rewrite(m: keyword_rewrite::Model) -> Result<KeywordRewrite> {
    let all_articles = m
        .all_articles
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?;
    Ok(KeywordRewrite {
        status: parse_column("keyword_rewrites.status", &m.status)?,
        id: m.id,
        keyword: m.keyword,
        created_by: m.created_by,
        source_url: m.source_url,
        source_title: m.source_title,
        source_content: m.source_content,
        rewritten_content: m.rewritten_content,
        error_message: m.error_message,
        all_articles,
        completed_at: m.completed_at.map(|t| t.with_timezone(&Utc)),
        converted_at: m.converted_at.map(|t| t.with_timezone(&Utc)),
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    })
}

const IN_FLIGHT: [&str; 2] = ["pending", "processing"];

fn live() -> Select<Entity> {
    Entity::find().filter(Column::DeletedAt.is_null())
}

fn filtered(filter: &KeywordRewriteFilter) -> Select<Entity> {
    let mut q = live();
    if let Some(status) = filter.status {
        q = q.filter(Column::Status.eq(status.as_str()));
    }
    if let Some(keyword) = filter.keyword.as_deref().map(str::trim) {
        if !keyword.is_empty() {
            q = q.filter(Column::Keyword.contains(keyword));
        }
    }
    q
}

impl ContentStore {
    async fn live_keyword_model(&self, id: &str) -> Result<keyword_rewrite::Model> {
        live()
            .filter(Column::Id.eq(id))
            .one(self.db())
            .await?
            .ok_or_else(|| StorageError::not_found("keyword_rewrite", id))
    }

    pub async fn create_keyword_rewrite(
        &self,
        keyword: &str,
        created_by: Option<&str>,
    ) -> Result<KeywordRewrite> {
        let now = Utc::now().fixed_offset();
        let am = keyword_rewrite::ActiveModel {
            id: Set(magazine_common::id::next_id()),
            keyword: Set(keyword.trim().to_owned()),
            created_by: Set(created_by.map(str::to_owned)),
            status: Set(RewriteStatus::Pending.as_str().to_owned()),
            source_url: Set(None),
            source_title: Set(None),
            source_content: Set(None),
            rewritten_content: Set(None),
            error_message: Set(None),
            all_articles: Set(None),
            completed_at: Set(None),
            converted_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        };
        let m = am.insert(self.db()).await?;
        to_keyword_rewrite(m)
    }

    pub async fn get_keyword_rewrite(&self, id: &str) -> Result<Option<KeywordRewrite>> {
        let m = live().filter(Column::Id.eq(id)).one(self.db()).await?;
        m.map(to_keyword_rewrite).transpose()
    }

    pub async fn list_keyword_rewrites(
        &self,
        filter: &KeywordRewriteFilter,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<KeywordRewrite>> {
        let rows = filtered(filter)
            .order_by(Column::CreatedAt, Order::Desc)
            .limit(limit)
            .offset(offset)
            .all(self.db())
            .await?;
        rows.into_iter().map(to_keyword_rewrite).collect()
    }

    pub async fn count_keyword_rewrites(&self, filter: &KeywordRewriteFilter) -> Result<u64> {
        Ok(filtered(filter).count(self.db()).await?)
    }

    /// `pending -> processing` after the rewrite service accepted the job.
    ///
    /// Guarded on `status = pending` so that a callback racing ahead of the
    /// dispatch response is never overwritten.
    pub async fn mark_keyword_dispatched(&self, id: &str) -> Result<KeywordRewrite> {
        let now = Utc::now().fixed_offset();
        Entity::update_many()
            .col_expr(Column::Status, Expr::value(RewriteStatus::Processing.as_str()))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Id.eq(id))
            .filter(Column::Status.eq(RewriteStatus::Pending.as_str()))
            .exec(self.db())
            .await?;
        to_keyword_rewrite(self.live_keyword_model(id).await?)
    }

    /// `pending -> failed` when the dispatch call itself failed.
    pub async fn mark_keyword_dispatch_failed(
        &self,
        id: &str,
        error_message: &str,
    ) -> Result<KeywordRewrite> {
        let now = Utc::now().fixed_offset();
        Entity::update_many()
            .col_expr(Column::Status, Expr::value(RewriteStatus::Failed.as_str()))
            .col_expr(Column::ErrorMessage, Expr::value(error_message))
            .col_expr(Column::CompletedAt, Expr::value(now))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Id.eq(id))
            .filter(Column::Status.eq(RewriteStatus::Pending.as_str()))
            .exec(self.db())
            .await?;
        to_keyword_rewrite(self.live_keyword_model(id).await?)
    }

    /// Apply a callback from the rewrite service.
    ///
    /// The write is conditional on the record still being in flight, so of
    /// two concurrent deliveries only one lands. Redelivery of the same
    /// terminal state is acknowledged without a write; a delivery that would
    /// flip one terminal state into the other is a conflict.
    pub async fn apply_keyword_callback(
        &self,
        cb: &KeywordRewriteCallback,
    ) -> Result<CallbackOutcome<KeywordRewrite>> {
        if !cb.status.is_terminal() {
            return Err(StorageError::field("status", "must be either completed or failed"));
        }
        // 404 before anything else
        self.live_keyword_model(&cb.rewrite_id).await?;

        let all_articles = cb
            .all_articles
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let error_message = match cb.status {
            RewriteStatus::Failed => Some(
                cb.error_message
                    .clone()
                    .unwrap_or_else(|| "rewrite service reported failure".to_owned()),
            ),
            _ => None,
        };
        let now = Utc::now().fixed_offset();
        let mut update = Entity::update_many()
            .col_expr(Column::Status, Expr::value(cb.status.as_str()))
            .col_expr(Column::ErrorMessage, Expr::value(error_message))
            .col_expr(Column::CompletedAt, Expr::value(now))
            .col_expr(Column::UpdatedAt, Expr::value(now));
        let optional = [
            (Column::SourceUrl, cb.source_url.clone()),
            (Column::SourceTitle, cb.source_title.clone()),
            (Column::SourceContent, cb.source_content.clone()),
            (Column::RewrittenContent, cb.rewritten_content.clone()),
            (Column::AllArticles, all_articles),
        ];
        for (column, value) in optional {
            if let Some(value) = value {
                update = update.col_expr(column, Expr::value(value));
            }
        }
        let res = update
            .filter(Column::Id.eq(cb.rewrite_id.as_str()))
            .filter(Column::DeletedAt.is_null())
            .filter(Column::Status.is_in(IN_FLIGHT))
            .exec(self.db())
            .await?;

        let m = self.live_keyword_model(&cb.rewrite_id).await?;
        if res.rows_affected > 0 {
            return Ok(CallbackOutcome::Applied(to_keyword_rewrite(m)?));
        }
        let current: RewriteStatus = parse_column("keyword_rewrites.status", &m.status)?;
        if current == cb.status {
            return Ok(CallbackOutcome::Duplicate(to_keyword_rewrite(m)?));
        }
        Err(StorageError::Conflict(format!(
            "keyword rewrite {} is already {}",
            cb.rewrite_id, current
        )))
    }

    /// `failed -> pending`, clearing the previous attempt's results.
    pub async fn reset_keyword_for_retry(&self, id: &str) -> Result<KeywordRewrite> {
        let m = self.live_keyword_model(id).await?;
        let current: RewriteStatus = parse_column("keyword_rewrites.status", &m.status)?;
        if current != RewriteStatus::Failed {
            return Err(StorageError::InvalidTransition {
                entity: "keyword_rewrite",
                from: current.to_string(),
                to: RewriteStatus::Pending.to_string(),
            });
        }

        let mut am: keyword_rewrite::ActiveModel = m.into();
        am.status = Set(RewriteStatus::Pending.as_str().to_owned());
        am.error_message = Set(None);
        am.completed_at = Set(None);
        am.source_url = Set(None);
        am.source_title = Set(None);
        am.source_content = Set(None);
        am.rewritten_content = Set(None);
        am.all_articles = Set(None);
        am.updated_at = Set(Utc::now().fixed_offset());
        let m = am.update(self.db()).await?;
        to_keyword_rewrite(m)
    }

    pub async fn delete_keyword_rewrite(&self, id: &str) -> Result<()> {
        let m = self.live_keyword_model(id).await?;
        let now = Utc::now().fixed_offset();
        let mut am: keyword_rewrite::ActiveModel = m.into();
        am.deleted_at = Set(Some(now));
        am.updated_at = Set(now);
        am.update(self.db()).await?;
        Ok(())
    }

    /// Turn a completed rewrite into a pending draft, or publish it directly.
    ///
    /// A rewrite converts once: the record is claimed by setting
    /// `converted_at` in the same transaction that writes the article.
    pub async fn convert_keyword_rewrite(
        &self,
        id: &str,
        conversion: KeywordConversion,
    ) -> Result<ConvertedArticle> {
        let record = to_keyword_rewrite(self.live_keyword_model(id).await?)?;
        if record.status != RewriteStatus::Completed {
            return Err(StorageError::InvalidTransition {
                entity: "keyword_rewrite",
                from: record.status.to_string(),
                to: "converted".to_string(),
            });
        }
        let content = record
            .rewritten_content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                StorageError::Conflict(format!("keyword rewrite {id} has no rewritten content"))
            })?;
        let title = conversion
            .title
            .or(record.source_title)
            .unwrap_or_else(|| record.keyword.clone());

        let txn = self.db().begin().await?;
        let now = Utc::now().fixed_offset();
        let claimed = Entity::update_many()
            .col_expr(Column::ConvertedAt, Expr::value(now))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Id.eq(id))
            .filter(Column::DeletedAt.is_null())
            .filter(Column::Status.eq(RewriteStatus::Completed.as_str()))
            .filter(Column::ConvertedAt.is_null())
            .exec(&txn)
            .await?;
        if claimed.rows_affected == 0 {
            return Err(StorageError::Conflict(format!(
                "keyword rewrite {id} has already been converted"
            )));
        }

        let converted = if conversion.publish {
            let slug = match conversion.slug {
                Some(slug) => {
                    if approved_slug_taken(&txn, &slug, None).await? {
                        return Err(StorageError::field("slug", "has already been taken"));
                    }
                    slug
                }
                None => unique_slug(&txn, &derive_slug(&title, &record.id)).await?,
            };
            let article = insert_approved_in(
                &txn,
                NewApproved {
                    title,
                    slug,
                    content,
                    meta_title: None,
                    meta_description: None,
                    meta_keywords: Some(record.keyword),
                    featured_image_id: None,
                    user_id: conversion.user_id,
                    category_id: Some(conversion.category_id),
                    original_article_id: None,
                    ai_generated: true,
                    status: PublishStatus::Published,
                    published_at: Some(Utc::now()),
                },
            )
            .await?;
            ConvertedArticle::Published(article)
        } else {
            let draft = insert_draft_in(
                &txn,
                NewDraft {
                    title,
                    slug: conversion.slug,
                    content,
                    meta_keywords: Some(record.keyword),
                    user_id: conversion.user_id,
                    category_id: Some(conversion.category_id),
                    keyword_rewrite_id: Some(record.id),
                    ..Default::default()
                },
            )
            .await?;
            ConvertedArticle::Draft(draft)
        };
        txn.commit().await?;
        Ok(converted)
    }
}
