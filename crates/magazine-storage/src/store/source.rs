//! Scraped source records: articles and Facebook posts.

use chrono::Utc;
use magazine_common::types::{FacebookPost, SourceArticle};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};

use crate::entities::article::{self, Column as ArtCol, Entity as ArtEntity};
use crate::entities::facebook_post::{self, Column as PostCol, Entity as PostEntity};
use crate::error::{Result, StorageError};
use crate::store::{derive_slug, ContentStore};

pub struct NewSourceArticle {
    pub title: String,
    pub slug: Option<String>,
    pub content: String,
    pub source_url: Option<String>,
    pub source_name: Option<String>,
    pub source_icon: Option<String>,
}

pub struct NewFacebookPost {
    pub content: String,
    pub source_url: Option<String>,
    pub page_or_group_name: Option<String>,
}

fn to_article(m: article::Model) -> SourceArticle {
    SourceArticle {
        id: m.id,
        title: m.title,
        slug: m.slug,
        content: m.content,
        source_url: m.source_url,
        source_name: m.source_name,
        source_icon: m.source_icon,
        is_processed: m.is_processed,
        is_ai_rewritten: m.is_ai_rewritten,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

fn to_post(m: facebook_post::Model) -> FacebookPost {
    FacebookPost {
        id: m.id,
        content: m.content,
        source_url: m.source_url,
        page_or_group_name: m.page_or_group_name,
        processed: m.processed,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

impl ContentStore {
    // ---- Articles ----

    pub async fn insert_source_article(&self, new: NewSourceArticle) -> Result<SourceArticle> {
        let id = magazine_common::id::next_id();
        let slug = new.slug.unwrap_or_else(|| derive_slug(&new.title, &id));
        let now = Utc::now().fixed_offset();
        let am = article::ActiveModel {
            id: Set(id),
            title: Set(new.title),
            slug: Set(slug),
            content: Set(new.content),
            source_url: Set(new.source_url),
            source_name: Set(new.source_name),
            source_icon: Set(new.source_icon),
            is_processed: Set(false),
            is_ai_rewritten: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let m = am.insert(self.db()).await?;
        Ok(to_article(m))
    }

    pub async fn get_source_article(&self, id: &str) -> Result<Option<SourceArticle>> {
        let m = ArtEntity::find_by_id(id).one(self.db()).await?;
        Ok(m.map(to_article))
    }

    pub async fn list_source_articles(
        &self,
        is_processed: Option<bool>,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<SourceArticle>> {
        let mut q = ArtEntity::find();
        if let Some(p) = is_processed {
            q = q.filter(ArtCol::IsProcessed.eq(p));
        }
        let rows = q
            .order_by(ArtCol::CreatedAt, Order::Desc)
            .limit(limit)
            .offset(offset)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_article).collect())
    }

    pub async fn count_source_articles(&self, is_processed: Option<bool>) -> Result<u64> {
        let mut q = ArtEntity::find();
        if let Some(p) = is_processed {
            q = q.filter(ArtCol::IsProcessed.eq(p));
        }
        Ok(q.count(self.db()).await?)
    }

    pub async fn delete_source_article(&self, id: &str) -> Result<()> {
        let res = ArtEntity::delete_by_id(id).exec(self.db()).await?;
        if res.rows_affected == 0 {
            return Err(StorageError::not_found("article", id));
        }
        Ok(())
    }

    // ---- Facebook posts ----

    pub async fn insert_facebook_post(&self, new: NewFacebookPost) -> Result<FacebookPost> {
        let now = Utc::now().fixed_offset();
        let am = facebook_post::ActiveModel {
            id: Set(magazine_common::id::next_id()),
            content: Set(new.content),
            source_url: Set(new.source_url),
            page_or_group_name: Set(new.page_or_group_name),
            processed: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let m = am.insert(self.db()).await?;
        Ok(to_post(m))
    }

    pub async fn get_facebook_post(&self, id: &str) -> Result<Option<FacebookPost>> {
        let m = PostEntity::find_by_id(id).one(self.db()).await?;
        Ok(m.map(to_post))
    }

    pub async fn list_facebook_posts(
        &self,
        processed: Option<bool>,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<FacebookPost>> {
        let mut q = PostEntity::find();
        if let Some(p) = processed {
            q = q.filter(PostCol::Processed.eq(p));
        }
        let rows = q
            .order_by(PostCol::CreatedAt, Order::Desc)
            .limit(limit)
            .offset(offset)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_post).collect())
    }

    pub async fn count_facebook_posts(&self, processed: Option<bool>) -> Result<u64> {
        let mut q = PostEntity::find();
        if let Some(p) = processed {
            q = q.filter(PostCol::Processed.eq(p));
        }
        Ok(q.count(self.db()).await?)
    }

    pub async fn delete_facebook_post(&self, id: &str) -> Result<()> {
        let res = PostEntity::delete_by_id(id).exec(self.db()).await?;
        if res.rows_affected == 0 {
            return Err(StorageError::not_found("facebook_post", id));
        }
        Ok(())
    }
}
