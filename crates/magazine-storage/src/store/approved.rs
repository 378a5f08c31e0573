//! Published (approved) articles.

use chrono::{DateTime, Utc};
use magazine_common::types::{ApprovedArticle, PublishStatus};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select,
};

use crate::entities::approved_article::{self, Column, Entity};
use crate::entities::media;
use crate::error::{Result, StorageError};
use crate::store::draft::approved_slug_taken;
use crate::store::{map_unique_violation, parse_column, ContentStore};

pub(crate) struct NewApproved {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub featured_image_id: Option<String>,
    pub user_id: Option<String>,
    pub category_id: Option<String>,
    pub original_article_id: Option<String>,
    pub ai_generated: bool,
    pub status: PublishStatus,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct ApprovedArticleFilter {
    pub status: Option<PublishStatus>,
    pub category_id: Option<String>,
    /// Case-insensitive substring of the title.
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ApprovedArticleUpdate {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub category_id: Option<String>,
    pub featured_image_id: Option<String>,
}

fn to_approved(m: approved_article::Model) -> Result<ApprovedArticle> {
    Ok(ApprovedArticle {
        status: parse_column("approved_articles.status", &m.status)?,
        id: m.id,
        title: m.title,
        slug: m.slug,
        content: m.content,
        meta_title: m.meta_title,
        meta_description: m.meta_description,
        meta_keywords: m.meta_keywords,
        featured_image_id: m.featured_image_id,
        user_id: m.user_id,
        category_id: m.category_id,
        original_article_id: m.original_article_id,
        ai_generated: m.ai_generated,
        published_at: m.published_at.map(|t| t.with_timezone(&Utc)),
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    })
}

fn live() -> Select<Entity> {
    Entity::find().filter(Column::DeletedAt.is_null())
}

fn filtered(filter: &ApprovedArticleFilter) -> Select<Entity> {
    let mut q = live();
    if let Some(status) = filter.status {
        q = q.filter(Column::Status.eq(status.as_str()));
    }
    if let Some(category_id) = &filter.category_id {
        q = q.filter(Column::CategoryId.eq(category_id.as_str()));
    }
    if let Some(search) = filter.search.as_deref().map(str::trim) {
        if !search.is_empty() {
            // SQLite LIKE is case-insensitive for ascii
            q = q.filter(Column::Title.contains(search));
        }
    }
    q
}

pub(crate) async fn insert_approved_in<C: ConnectionTrait>(
    conn: &C,
    new: NewApproved,
) -> Result<ApprovedArticle> {
    let now = Utc::now().fixed_offset();
    let am = approved_article::ActiveModel {
        id: Set(magazine_common::id::next_id()),
        title: Set(new.title),
        slug: Set(new.slug),
        content: Set(new.content),
        meta_title: Set(new.meta_title),
        meta_description: Set(new.meta_description),
        meta_keywords: Set(new.meta_keywords),
        featured_image_id: Set(new.featured_image_id),
        user_id: Set(new.user_id),
        category_id: Set(new.category_id),
        original_article_id: Set(new.original_article_id),
        ai_generated: Set(new.ai_generated),
        status: Set(new.status.as_str().to_owned()),
        published_at: Set(new.published_at.map(|t| t.fixed_offset())),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    };
    let m = am
        .insert(conn)
        .await
        .map_err(|e| map_unique_violation(e, "slug"))?;
    to_approved(m)
}

impl ContentStore {
    pub async fn get_approved_article(&self, id: &str) -> Result<Option<ApprovedArticle>> {
        let m = live().filter(Column::Id.eq(id)).one(self.db()).await?;
        m.map(to_approved).transpose()
    }

    /// Public lookup: only published, live articles are visible.
    pub async fn get_published_by_slug(&self, slug: &str) -> Result<Option<ApprovedArticle>> {
        let m = live()
            .filter(Column::Slug.eq(slug))
            .filter(Column::Status.eq(PublishStatus::Published.as_str()))
            .one(self.db())
            .await?;
        m.map(to_approved).transpose()
    }

    pub async fn list_approved_articles(
        &self,
        filter: &ApprovedArticleFilter,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<ApprovedArticle>> {
        let rows = filtered(filter)
            .order_by(Column::PublishedAt, Order::Desc)
            .order_by(Column::CreatedAt, Order::Desc)
            .limit(limit)
            .offset(offset)
            .all(self.db())
            .await?;
        rows.into_iter().map(to_approved).collect()
    }

    pub async fn count_approved_articles(&self, filter: &ApprovedArticleFilter) -> Result<u64> {
        Ok(filtered(filter).count(self.db()).await?)
    }

    pub async fn update_approved_article(
        &self,
        id: &str,
        update: ApprovedArticleUpdate,
    ) -> Result<ApprovedArticle> {
        let m = live()
            .filter(Column::Id.eq(id))
            .one(self.db())
            .await?
            .ok_or_else(|| StorageError::not_found("approved_article", id))?;

        if let Some(slug) = &update.slug {
            if *slug != m.slug && approved_slug_taken(self.db(), slug, Some(id)).await? {
                return Err(StorageError::field("slug", "has already been taken"));
            }
        }
        if let Some(media_id) = &update.featured_image_id {
            let exists = media::Entity::find_by_id(media_id.as_str())
                .one(self.db())
                .await?
                .is_some();
            if !exists {
                return Err(StorageError::field("featured_image_id", "does not exist"));
            }
        }

        let mut am: approved_article::ActiveModel = m.into();
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
        if let Some(v) = update.category_id {
            am.category_id = Set(Some(v));
        }
        if let Some(v) = update.featured_image_id {
            am.featured_image_id = Set(Some(v));
        }
        am.updated_at = Set(Utc::now().fixed_offset());
        let m = am
            .update(self.db())
            .await
            .map_err(|e| map_unique_violation(e, "slug"))?;
        to_approved(m)
    }

    /// Archive or re-publish. Re-publishing an article that never had a
    /// `published_at` stamps it with the current time.
    pub async fn set_publish_status(
        &self,
        id: &str,
        status: PublishStatus,
    ) -> Result<ApprovedArticle> {
        let m = live()
            .filter(Column::Id.eq(id))
            .one(self.db())
            .await?
            .ok_or_else(|| StorageError::not_found("approved_article", id))?;
        if m.status == status.as_str() {
            return to_approved(m);
        }

        let now = Utc::now().fixed_offset();
        let needs_stamp = status == PublishStatus::Published && m.published_at.is_none();
        let mut am: approved_article::ActiveModel = m.into();
        am.status = Set(status.as_str().to_owned());
        if needs_stamp {
            am.published_at = Set(Some(now));
        }
        am.updated_at = Set(now);
        let m = am.update(self.db()).await?;
        to_approved(m)
    }

    pub async fn delete_approved_article(&self, id: &str) -> Result<()> {
        let m = live()
            .filter(Column::Id.eq(id))
            .one(self.db())
            .await?
            .ok_or_else(|| StorageError::not_found("approved_article", id))?;
        let now = Utc::now().fixed_offset();
        let mut am: approved_article::ActiveModel = m.into();
        am.deleted_at = Set(Some(now));
        am.updated_at = Set(now);
        am.update(self.db()).await?;
        Ok(())
    }
}
