use chrono::Utc;
use magazine_common::types::{Media, MediaType};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};

use crate::entities::approved_article;
use crate::entities::media::{self, Column, Entity};
use crate::error::{Result, StorageError};
use crate::store::{parse_column, ContentStore};

/// Metadata of a file already written to the media directory.
pub struct NewMedia {
    pub id: String,
    pub name: String,
    pub file_name: String,
    pub file_path: String,
    pub mime_type: String,
    pub size: i64,
    pub media_type: MediaType,
    pub user_id: Option<String>,
}

fn to_media(m: media::Model) -> Result<Media> {
    Ok(Media {
        media_type: parse_column("media.type", &m.media_type)?,
        id: m.id,
        name: m.name,
        file_name: m.file_name,
        file_path: m.file_path,
        mime_type: m.mime_type,
        size: m.size,
        user_id: m.user_id,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    })
}

impl ContentStore {
    pub async fn insert_media(&self, new: NewMedia) -> Result<Media> {
        let now = Utc::now().fixed_offset();
        let am = media::ActiveModel {
            id: Set(new.id),
            name: Set(new.name),
            file_name: Set(new.file_name),
            file_path: Set(new.file_path),
            mime_type: Set(new.mime_type),
            size: Set(new.size),
            media_type: Set(new.media_type.as_str().to_owned()),
            user_id: Set(new.user_id),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let m = am.insert(self.db()).await?;
        to_media(m)
    }

    pub async fn get_media(&self, id: &str) -> Result<Option<Media>> {
        let m = Entity::find_by_id(id).one(self.db()).await?;
        m.map(to_media).transpose()
    }

    pub async fn list_media(
        &self,
        media_type: Option<MediaType>,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Media>> {
        let mut q = Entity::find();
        if let Some(t) = media_type {
            q = q.filter(Column::MediaType.eq(t.as_str()));
        }
        let rows = q
            .order_by(Column::CreatedAt, Order::Desc)
            .limit(limit)
            .offset(offset)
            .all(self.db())
            .await?;
        rows.into_iter().map(to_media).collect()
    }

    pub async fn count_media(&self, media_type: Option<MediaType>) -> Result<u64> {
        let mut q = Entity::find();
        if let Some(t) = media_type {
            q = q.filter(Column::MediaType.eq(t.as_str()));
        }
        Ok(q.count(self.db()).await?)
    }

    /// Delete the row and return it so the caller can remove the file.
    ///
    /// Articles using it as their featured image are detached in the same
    /// transaction.
    pub async fn delete_media(&self, id: &str) -> Result<Media> {
        let txn = self.db().begin().await?;
        let m = Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| StorageError::not_found("media", id))?;
        let media = to_media(m)?;
        let detached = approved_article::Entity::update_many()
            .col_expr(
                approved_article::Column::FeaturedImageId,
                Expr::value(Option::<String>::None),
            )
            .col_expr(
                approved_article::Column::UpdatedAt,
                Expr::value(Utc::now().fixed_offset()),
            )
            .filter(approved_article::Column::FeaturedImageId.eq(id))
            .exec(&txn)
            .await?;
        Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        if detached.rows_affected > 0 {
            tracing::info!(media_id = %id, articles = detached.rows_affected, "Detached featured image from articles");
        }
        Ok(media)
    }
}
