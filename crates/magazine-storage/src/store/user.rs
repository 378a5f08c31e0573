use chrono::Utc;
use magazine_common::types::{User, UserRole};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};

use crate::entities::user::{self, Column, Entity};
use crate::error::{Result, StorageError};
use crate::store::{map_unique_violation, parse_column, ContentStore};

pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub is_active: bool,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

fn to_user(m: user::Model) -> Result<User> {
    Ok(User {
        role: parse_column("users.role", &m.role)?,
        id: m.id,
        name: m.name,
        email: m.email,
        password_hash: m.password_hash,
        is_active: m.is_active,
        token_version: m.token_version as i64,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    })
}

impl ContentStore {
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let model = Entity::find()
            .filter(Column::Email.eq(email.to_lowercase()))
            .one(self.db())
            .await?;
        model.map(to_user).transpose()
    }

    pub async fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        model.map(to_user).transpose()
    }

    pub async fn create_user(&self, new: NewUser) -> Result<User> {
        let email = new.email.to_lowercase();
        if self.get_user_by_email(&email).await?.is_some() {
            return Err(StorageError::field("email", "has already been taken"));
        }
        let now = Utc::now().fixed_offset();
        let am = user::ActiveModel {
            id: Set(magazine_common::id::next_id()),
            name: Set(new.name),
            email: Set(email),
            password_hash: Set(new.password_hash),
            role: Set(new.role.as_str().to_owned()),
            is_active: Set(new.is_active),
            token_version: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let m = am
            .insert(self.db())
            .await
            .map_err(|e| map_unique_violation(e, "email"))?;
        to_user(m)
    }

    /// Apply a partial update. Changing the password, role or active flag
    /// bumps `token_version`, which invalidates outstanding tokens.
    pub async fn update_user(&self, id: &str, update: UserUpdate) -> Result<User> {
        let m = Entity::find_by_id(id)
            .one(self.db())
            .await?
            .ok_or_else(|| StorageError::not_found("user", id))?;

        if let Some(email) = &update.email {
            let email = email.to_lowercase();
            if email != m.email && self.get_user_by_email(&email).await?.is_some() {
                return Err(StorageError::field("email", "has already been taken"));
            }
        }

        let revoke = update.password_hash.is_some()
            || update.role.is_some_and(|r| r.as_str() != m.role)
            || update.is_active.is_some_and(|a| a != m.is_active);
        let token_version = m.token_version;

        let mut am: user::ActiveModel = m.into();
        if let Some(name) = update.name {
            am.name = Set(name);
        }
        if let Some(email) = update.email {
            am.email = Set(email.to_lowercase());
        }
        if let Some(hash) = update.password_hash {
            am.password_hash = Set(hash);
        }
        if let Some(role) = update.role {
            am.role = Set(role.as_str().to_owned());
        }
        if let Some(active) = update.is_active {
            am.is_active = Set(active);
        }
        if revoke {
            am.token_version = Set(token_version + 1);
        }
        am.updated_at = Set(Utc::now().fixed_offset());
        let m = am
            .update(self.db())
            .await
            .map_err(|e| map_unique_violation(e, "email"))?;
        to_user(m)
    }

    pub async fn delete_user(&self, id: &str) -> Result<()> {
        let res = Entity::delete_by_id(id).exec(self.db()).await?;
        if res.rows_affected == 0 {
            return Err(StorageError::not_found("user", id));
        }
        Ok(())
    }

    pub async fn list_users(&self, limit: u64, offset: u64) -> Result<Vec<User>> {
        let rows = Entity::find()
            .order_by(Column::CreatedAt, Order::Asc)
            .limit(limit)
            .offset(offset)
            .all(self.db())
            .await?;
        rows.into_iter().map(to_user).collect()
    }

    pub async fn count_users(&self) -> Result<u64> {
        Ok(Entity::find().count(self.db()).await?)
    }
}
