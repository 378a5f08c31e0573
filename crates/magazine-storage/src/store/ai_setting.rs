use chrono::Utc;
use magazine_common::types::AiSetting;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, QueryFilter, QueryOrder,
};

use crate::entities::ai_setting::{self, Column, Entity};
use crate::error::Result;
use crate::store::ContentStore;

/// Values written by an upsert. `api_key: None` keeps the stored key.
pub struct AiSettingInput {
    pub provider: String,
    pub api_key: Option<String>,
    pub model_name: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<i32>,
    pub is_active: bool,
}

impl ContentStore {
    fn to_ai_setting(&self, m: ai_setting::Model) -> Result<AiSetting> {
        let api_key = match m.api_key.as_deref() {
            Some(encrypted) => Some(self.cipher.decrypt(encrypted)?),
            None => None,
        };
        Ok(AiSetting {
            id: m.id,
            provider: m.provider,
            api_key,
            model_name: m.model_name,
            temperature: m.temperature,
            max_tokens: m.max_tokens,
            is_active: m.is_active,
            created_at: m.created_at.with_timezone(&Utc),
            updated_at: m.updated_at.with_timezone(&Utc),
        })
    }

    /// The most recently updated settings row, active or not.
    pub async fn get_ai_setting(&self) -> Result<Option<AiSetting>> {
        let m = Entity::find()
            .order_by(Column::UpdatedAt, Order::Desc)
            .one(self.db())
            .await?;
        m.map(|m| self.to_ai_setting(m)).transpose()
    }

    /// Settings forwarded to the rewrite service, if any are active.
    pub async fn get_active_ai_setting(&self) -> Result<Option<AiSetting>> {
        let m = Entity::find()
            .filter(Column::IsActive.eq(true))
            .order_by(Column::UpdatedAt, Order::Desc)
            .one(self.db())
            .await?;
        m.map(|m| self.to_ai_setting(m)).transpose()
    }

    /// Insert or update the row for `input.provider`. Activating one
    /// provider deactivates the others.
    pub async fn upsert_ai_setting(&self, input: AiSettingInput) -> Result<AiSetting> {
        let now = Utc::now().fixed_offset();
        let encrypted = input
            .api_key
            .as_deref()
            .map(|k| self.cipher.encrypt(k))
            .transpose()?;

        if input.is_active {
            Entity::update_many()
                .col_expr(Column::IsActive, sea_orm::sea_query::Expr::value(false))
                .filter(Column::Provider.ne(input.provider.as_str()))
                .exec(self.db())
                .await?;
        }

        let existing = Entity::find()
            .filter(Column::Provider.eq(input.provider.as_str()))
            .one(self.db())
            .await?;
        let m = match existing {
            Some(m) => {
                let mut am: ai_setting::ActiveModel = m.into();
                if encrypted.is_some() {
                    am.api_key = Set(encrypted);
                }
                am.model_name = Set(input.model_name);
                am.temperature = Set(input.temperature);
                am.max_tokens = Set(input.max_tokens);
                am.is_active = Set(input.is_active);
                am.updated_at = Set(now);
                am.update(self.db()).await?
            }
            None => {
                let am = ai_setting::ActiveModel {
                    id: Set(magazine_common::id::next_id()),
                    provider: Set(input.provider),
                    api_key: Set(encrypted),
                    model_name: Set(input.model_name),
                    temperature: Set(input.temperature),
                    max_tokens: Set(input.max_tokens),
                    is_active: Set(input.is_active),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                am.insert(self.db()).await?
            }
        };
        tracing::info!(provider = %m.provider, active = m.is_active, "AI settings saved");
        self.to_ai_setting(m)
    }
}
