use chrono::Utc;
use magazine_common::types::Category;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};

use crate::entities::category::{self, Column, Entity};
use crate::error::{FieldErrors, Result, StorageError};
use crate::store::{derive_slug, map_unique_violation, ContentStore};

fn to_category(m: category::Model) -> Category {
    Category {
        id: m.id,
        name: m.name,
        slug: m.slug,
        description: m.description,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

fn live() -> sea_orm::Select<Entity> {
    Entity::find().filter(Column::DeletedAt.is_null())
}

impl ContentStore {
    /// Name and slug must both be free among live categories, except on `exclude_id`.
    async fn check_category_unique(
        &self,
        name: Option<&str>,
        slug: Option<&str>,
        exclude_id: Option<&str>,
    ) -> Result<()> {
        let mut errors = FieldErrors::new();
        if let Some(name) = name {
            let mut q = live().filter(Column::Name.eq(name));
            if let Some(id) = exclude_id {
                q = q.filter(Column::Id.ne(id));
            }
            if q.count(self.db()).await? > 0 {
                errors.insert("name".into(), vec!["has already been taken".into()]);
            }
        }
        if let Some(slug) = slug {
            let mut q = live().filter(Column::Slug.eq(slug));
            if let Some(id) = exclude_id {
                q = q.filter(Column::Id.ne(id));
            }
            if q.count(self.db()).await? > 0 {
                errors.insert("slug".into(), vec!["has already been taken".into()]);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(StorageError::Validation(errors))
        }
    }

    pub async fn create_category(
        &self,
        name: &str,
        slug: Option<&str>,
        description: Option<String>,
    ) -> Result<Category> {
        let id = magazine_common::id::next_id();
        let slug = match slug {
            Some(s) => s.to_owned(),
            None => derive_slug(name, &id),
        };
        self.check_category_unique(Some(name), Some(&slug), None)
            .await?;

        let now = Utc::now().fixed_offset();
        let am = category::ActiveModel {
            id: Set(id),
            name: Set(name.to_owned()),
            slug: Set(slug),
            description: Set(description),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        };
        let m = am
            .insert(self.db())
            .await
            .map_err(|e| map_unique_violation(e, "slug"))?;
        Ok(to_category(m))
    }

    pub async fn get_category(&self, id: &str) -> Result<Option<Category>> {
        let m = live().filter(Column::Id.eq(id)).one(self.db()).await?;
        Ok(m.map(to_category))
    }

    pub async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let m = live().filter(Column::Slug.eq(slug)).one(self.db()).await?;
        Ok(m.map(to_category))
    }

    pub async fn list_categories(&self, limit: u64, offset: u64) -> Result<Vec<Category>> {
        let rows = live()
            .order_by(Column::Name, Order::Asc)
            .limit(limit)
            .offset(offset)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_category).collect())
    }

    pub async fn count_categories(&self) -> Result<u64> {
        Ok(live().count(self.db()).await?)
    }

    pub async fn update_category(
        &self,
        id: &str,
        name: Option<String>,
        slug: Option<String>,
        description: Option<String>,
    ) -> Result<Category> {
        let m = live()
            .filter(Column::Id.eq(id))
            .one(self.db())
            .await?
            .ok_or_else(|| StorageError::not_found("category", id))?;

        self.check_category_unique(name.as_deref(), slug.as_deref(), Some(id))
            .await?;

        let mut am: category::ActiveModel = m.into();
        if let Some(name) = name {
            am.name = Set(name);
        }
        if let Some(slug) = slug {
            am.slug = Set(slug);
        }
        if let Some(description) = description {
            am.description = Set(Some(description));
        }
        am.updated_at = Set(Utc::now().fixed_offset());
        let m = am
            .update(self.db())
            .await
            .map_err(|e| map_unique_violation(e, "slug"))?;
        Ok(to_category(m))
    }

    pub async fn delete_category(&self, id: &str) -> Result<()> {
        let m = live()
            .filter(Column::Id.eq(id))
            .one(self.db())
            .await?
            .ok_or_else(|| StorageError::not_found("category", id))?;
        let now = Utc::now().fixed_offset();
        let mut am: category::ActiveModel = m.into();
        am.deleted_at = Set(Some(now));
        am.updated_at = Set(now);
        am.update(self.db()).await?;
        Ok(())
    }

    /// Idempotent seed insert used by the `init-categories` CLI. Returns
    /// `false` when a live category with the same slug already exists.
    pub async fn ensure_category(
        &self,
        name: &str,
        slug: Option<&str>,
        description: Option<String>,
    ) -> Result<bool> {
        let slug = slug
            .map(str::to_owned)
            .unwrap_or_else(|| derive_slug(name, name));
        if self.get_category_by_slug(&slug).await?.is_some() {
            return Ok(false);
        }
        match self.create_category(name, Some(&slug), description).await {
            Ok(_) => Ok(true),
            Err(StorageError::Validation(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
