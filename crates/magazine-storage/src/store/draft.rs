//! Rewritten drafts and the review state machine (`pending -> approved | rejected`).

use chrono::{DateTime, Utc};
use magazine_common::types::{ApprovedArticle, DraftStatus, PublishStatus, RewrittenArticle};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, TransactionTrait,
};

use crate::entities::approved_article;
use crate::entities::article;
use crate::entities::facebook_post;
use crate::entities::rewritten_article::{self, Column, Entity};
use crate::error::{Result, StorageError};
use crate::store::approved::{insert_approved_in, NewApproved};
use crate::store::{derive_slug, map_unique_violation, parse_column, ContentStore};

const SLUG_TAKEN: &str = "has already been taken";

/// Input for a new pending draft.
#[derive(Debug, Clone, Default)]
pub struct NewDraft {
    pub title: String,
    /// Derived from the title (and made unique) when `None`.
    pub slug: Option<String>,
    pub content: String,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub featured_image: Option<String>,
    pub user_id: Option<String>,
    pub category_id: Option<String>,
    pub original_article_id: Option<String>,
    pub facebook_post_id: Option<String>,
    pub keyword_rewrite_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DraftFilter {
    pub status: Option<DraftStatus>,
    pub category_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DraftUpdate {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub featured_image: Option<String>,
    pub category_id: Option<String>,
    pub resubmit: bool,
}

/// Optional values that replace the draft's own when it is approved.
#[derive(Debug, Clone, Default)]
pub struct ApproveOverrides {
    pub category_id: Option<String>,
    pub featured_image_id: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Which source record a rewrite came from.
enum RewriteOrigin<'a> {
    Article(&'a str),
    FacebookPost(&'a str),
}

pub(crate) fn to_draft(m: rewritten_article::Model) -> Result<RewrittenArticle> {
    Ok(RewrittenArticle {
        status: parse_column("rewritten_articles.status", &m.status)?,
        id: m.id,
        title: m.title,
        slug: m.slug,
        content: m.content,
        meta_title: m.meta_title,
        meta_description: m.meta_description,
        meta_keywords: m.meta_keywords,
        featured_image: m.featured_image,
        user_id: m.user_id,
        category_id: m.category_id,
        original_article_id: m.original_article_id,
        facebook_post_id: m.facebook_post_id,
        keyword_rewrite_id: m.keyword_rewrite_id,
        rejection_reason: m.rejection_reason,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    })
}

fn live() -> Select<Entity> {
    Entity::find().filter(Column::DeletedAt.is_null())
}

fn filtered(filter: &DraftFilter) -> Select<Entity> {
    let mut q = live();
    if let Some(status) = filter.status {
        q = q.filter(Column::Status.eq(status.as_str()));
    }
    if let Some(category_id) = &filter.category_id {
        q = q.filter(Column::CategoryId.eq(category_id.as_str()));
    }
    q
}

async fn draft_slug_taken<C: ConnectionTrait>(
    conn: &C,
    slug: &str,
    exclude_id: Option<&str>,
) -> Result<bool> {
    let mut q = live().filter(Column::Slug.eq(slug));
    if let Some(id) = exclude_id {
        q = q.filter(Column::Id.ne(id));
    }
    Ok(q.count(conn).await? > 0)
}

pub(crate) async fn approved_slug_taken<C: ConnectionTrait>(
    conn: &C,
    slug: &str,
    exclude_id: Option<&str>,
) -> Result<bool> {
    let mut q = approved_article::Entity::find()
        .filter(approved_article::Column::DeletedAt.is_null())
        .filter(approved_article::Column::Slug.eq(slug));
    if let Some(id) = exclude_id {
        q = q.filter(approved_article::Column::Id.ne(id));
    }
    Ok(q.count(conn).await? > 0)
}

/// Append `-2`, `-3`, ... until the slug is free in both article tables.
pub(crate) async fn unique_slug<C: ConnectionTrait>(conn: &C, base: &str) -> Result<String> {
    let mut candidate = base.to_owned();
    let mut n = 2;
    while draft_slug_taken(conn, &candidate, None).await?
        || approved_slug_taken(conn, &candidate, None).await?
    {
        candidate = format!("{base}-{n}");
        n += 1;
    }
    Ok(candidate)
}

pub(crate) async fn insert_draft_in<C: ConnectionTrait>(conn: &C, new: NewDraft) -> Result<RewrittenArticle> {
    let id = magazine_common::id::next_id();
    let slug = match new.slug {
        Some(slug) => {
            if draft_slug_taken(conn, &slug, None).await?
                || approved_slug_taken(conn, &slug, None).await?
            {
                return Err(StorageError::field("slug", SLUG_TAKEN));
            }
            slug
        }
        None => unique_slug(conn, &derive_slug(&new.title, &id)).await?,
    };

    let now = Utc::now().fixed_offset();
    let am = rewritten_article::ActiveModel {
        id: Set(id),
        title: Set(new.title),
        slug: Set(slug),
        content: Set(new.content),
        meta_title: Set(new.meta_title),
        meta_description: Set(new.meta_description),
        meta_keywords: Set(new.meta_keywords),
        featured_image: Set(new.featured_image),
        user_id: Set(new.user_id),
        category_id: Set(new.category_id),
        original_article_id: Set(new.original_article_id),
        facebook_post_id: Set(new.facebook_post_id),
        keyword_rewrite_id: Set(new.keyword_rewrite_id),
        status: Set(DraftStatus::Pending.as_str().to_owned()),
        rejection_reason: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    };
    let m = am
        .insert(conn)
        .await
        .map_err(|e| map_unique_violation(e, "slug"))?;
    to_draft(m)
}

/// Body of the approval transaction. Every statement runs on `txn`.
async fn approve_in<C: ConnectionTrait>(
    txn: &C,
    id: &str,
    overrides: &ApproveOverrides,
) -> Result<ApprovedArticle> {
    let m = live()
        .filter(Column::Id.eq(id))
        .one(txn)
        .await?
        .ok_or_else(|| StorageError::not_found("rewritten_article", id))?;
    let draft = to_draft(m)?;

    if draft.status == DraftStatus::Approved {
        return Err(StorageError::InvalidTransition {
            entity: "rewritten_article",
            from: draft.status.to_string(),
            to: DraftStatus::Approved.to_string(),
        });
    }
    if approved_slug_taken(txn, &draft.slug, None).await? {
        return Err(StorageError::field("slug", SLUG_TAKEN));
    }

    let ai_generated = draft.is_ai_generated();
    let article = insert_approved_in(
        txn,
        NewApproved {
            title: draft.title,
            slug: draft.slug,
            content: draft.content,
            meta_title: draft.meta_title,
            meta_description: draft.meta_description,
            meta_keywords: draft.meta_keywords,
            featured_image_id: overrides.featured_image_id.clone(),
            user_id: draft.user_id,
            category_id: overrides.category_id.clone().or(draft.category_id),
            original_article_id: draft.original_article_id,
            ai_generated,
            status: PublishStatus::Published,
            published_at: Some(overrides.published_at.unwrap_or_else(Utc::now)),
        },
    )
    .await?;

    // 草稿在审核通过后即被替换
    let res = Entity::delete_by_id(id).exec(txn).await?;
    if res.rows_affected != 1 {
        return Err(StorageError::not_found("rewritten_article", id));
    }
    Ok(article)
}

impl ContentStore {
    pub async fn create_draft(&self, new: NewDraft) -> Result<RewrittenArticle> {
        insert_draft_in(self.db(), new).await
    }

    /// Store the rewrite of a scraped article and flag the article processed, atomically.
    pub async fn record_article_rewrite(
        &self,
        article_id: &str,
        new: NewDraft,
    ) -> Result<RewrittenArticle> {
        self.record_source_rewrite(RewriteOrigin::Article(article_id), new)
            .await
    }

    /// Store the rewrite of a Facebook post and flag the post processed, atomically.
    pub async fn record_post_rewrite(
        &self,
        post_id: &str,
        new: NewDraft,
    ) -> Result<RewrittenArticle> {
        self.record_source_rewrite(RewriteOrigin::FacebookPost(post_id), new)
            .await
    }

    async fn record_source_rewrite(
        &self,
        origin: RewriteOrigin<'_>,
        mut new: NewDraft,
    ) -> Result<RewrittenArticle> {
        let txn = self.db().begin().await?;
        let now = Utc::now().fixed_offset();
        match origin {
            RewriteOrigin::Article(id) => {
                let m = article::Entity::find_by_id(id)
                    .one(&txn)
                    .await?
                    .ok_or_else(|| StorageError::not_found("article", id))?;
                new.original_article_id = Some(m.id.clone());
                let mut am: article::ActiveModel = m.into();
                am.is_processed = Set(true);
                am.is_ai_rewritten = Set(true);
                am.updated_at = Set(now);
                am.update(&txn).await?;
            }
            RewriteOrigin::FacebookPost(id) => {
                let m = facebook_post::Entity::find_by_id(id)
                    .one(&txn)
                    .await?
                    .ok_or_else(|| StorageError::not_found("facebook_post", id))?;
                new.facebook_post_id = Some(m.id.clone());
                let mut am: facebook_post::ActiveModel = m.into();
                am.processed = Set(true);
                am.updated_at = Set(now);
                am.update(&txn).await?;
            }
        }
        let draft = insert_draft_in(&txn, new).await?;
        txn.commit().await?;
        Ok(draft)
    }

    pub async fn get_draft(&self, id: &str) -> Result<Option<RewrittenArticle>> {
        let m = live().filter(Column::Id.eq(id)).one(self.db()).await?;
        m.map(to_draft).transpose()
    }

    pub async fn list_drafts(
        &self,
        filter: &DraftFilter,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<RewrittenArticle>> {
        let rows = filtered(filter)
            .order_by(Column::CreatedAt, Order::Desc)
            .limit(limit)
            .offset(offset)
            .all(self.db())
            .await?;
        rows.into_iter().map(to_draft).collect()
    }

    pub async fn count_drafts(&self, filter: &DraftFilter) -> Result<u64> {
        Ok(filtered(filter).count(self.db()).await?)
    }

    pub async fn update_draft(&self, id: &str, update: DraftUpdate) -> Result<RewrittenArticle> {
        let m = live()
            .filter(Column::Id.eq(id))
            .one(self.db())
            .await?
            .ok_or_else(|| StorageError::not_found("rewritten_article", id))?;

        if let Some(slug) = &update.slug {
            if *slug != m.slug
                && (draft_slug_taken(self.db(), slug, Some(id)).await?
                    || approved_slug_taken(self.db(), slug, None).await?)
            {
                return Err(StorageError::field("slug", SLUG_TAKEN));
            }
        }
        let was_rejected = m.status == DraftStatus::Rejected.as_str();

        let mut am: rewritten_article::ActiveModel = m.into();
        if let Some(v) = update.title {
            am.title = Set(v);
        }
        if let Some(v) = update.slug {
            am.slug = Set(v);
        }
        if let Some(v) = update.content {
            am.content = Set(v);
        }
        if let Some(v) = update.meta_title {
            am.meta_title = Set(Some(v));
        }
        if let Some(v) = update.meta_description {
            am.meta_description = Set(Some(v));
        }
        if let Some(v) = update.meta_keywords {
            am.meta_keywords = Set(Some(v));
        }
        if let Some(v) = update.featured_image {
            am.featured_image = Set(Some(v));
        }
        if let Some(v) = update.category_id {
            am.category_id = Set(Some(v));
        }
        if update.resubmit && was_rejected {
            am.status = Set(DraftStatus::Pending.as_str().to_owned());
            am.rejection_reason = Set(None);
        }
        am.updated_at = Set(Utc::now().fixed_offset());
        let m = am
            .update(self.db())
            .await
            .map_err(|e| map_unique_violation(e, "slug"))?;
        to_draft(m)
    }

    pub async fn delete_draft(&self, id: &str) -> Result<()> {
        let m = live()
            .filter(Column::Id.eq(id))
            .one(self.db())
            .await?
            .ok_or_else(|| StorageError::not_found("rewritten_article", id))?;
        let now = Utc::now().fixed_offset();
        let mut am: rewritten_article::ActiveModel = m.into();
        am.deleted_at = Set(Some(now));
        am.updated_at = Set(now);
        am.update(self.db()).await?;
        Ok(())
    }

    /// Promote a draft to a published article and remove the draft.
    ///
    /// Runs in a single transaction: on any error nothing is inserted and
    /// the draft is left as it was.
    pub async fn approve_draft(
        &self,
        id: &str,
        overrides: &ApproveOverrides,
    ) -> Result<ApprovedArticle> {
        let txn = self.db().begin().await?;
        match approve_in(&txn, id, overrides).await {
            Ok(article) => {
                txn.commit().await?;
                Ok(article)
            }
            Err(e) => {
                if let Err(rb) = txn.rollback().await {
                    tracing::error!(draft_id = %id, error = %rb, "Approval rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Mark a draft rejected in place. Rejecting twice is a no-op.
    pub async fn reject_draft(&self, id: &str, reason: Option<String>) -> Result<RewrittenArticle> {
        let m = live()
            .filter(Column::Id.eq(id))
            .one(self.db())
            .await?
            .ok_or_else(|| StorageError::not_found("rewritten_article", id))?;
        let status: DraftStatus = parse_column("rewritten_articles.status", &m.status)?;
        match status {
            DraftStatus::Rejected => return to_draft(m),
            DraftStatus::Approved => {
                return Err(StorageError::InvalidTransition {
                    entity: "rewritten_article",
                    from: status.to_string(),
                    to: DraftStatus::Rejected.to_string(),
                })
            }
            DraftStatus::Pending => {}
        }

        let mut am: rewritten_article::ActiveModel = m.into();
        am.status = Set(DraftStatus::Rejected.as_str().to_owned());
        am.rejection_reason = Set(reason);
        am.updated_at = Set(Utc::now().fixed_offset());
        let m = am.update(self.db()).await?;
        to_draft(m)
    }
}
