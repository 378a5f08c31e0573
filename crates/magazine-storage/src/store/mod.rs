use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};
use std::path::Path;
use std::str::FromStr;

use crate::auth::SecretCipher;
use crate::error::{Result, StorageError};

pub mod ai_setting;
pub mod approved;
pub mod category;
pub mod dashboard;
pub mod draft;
pub mod keyword;
pub mod media;
pub mod scrape_job;
pub mod source;
pub mod user;

// ---- 公开过滤/更新类型（从各子模块重新导出）----
pub use approved::{ApprovedArticleFilter, ApprovedArticleUpdate};
pub use draft::{ApproveOverrides, DraftFilter, DraftUpdate, NewDraft};
pub use ai_setting::AiSettingInput;
pub use keyword::{KeywordConversion, KeywordRewriteFilter};
pub use media::NewMedia;
pub use source::{NewFacebookPost, NewSourceArticle};
pub use user::{NewUser, UserUpdate};

/// What a callback delivery did to the record it names.
#[derive(Debug, Clone)]
pub enum CallbackOutcome<T> {
    /// The record moved to the reported terminal state.
    Applied(T),
    /// Redelivery of a state the record is already in; nothing written.
    Duplicate(T),
}

impl<T> CallbackOutcome<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Applied(t) | Self::Duplicate(t) => t,
        }
    }
}

/// 内容数据库的统一访问层。
///
/// 所有方法均为 `async fn`，底层使用 SeaORM + SQLite。
pub struct ContentStore {
    pub(crate) db: DatabaseConnection,
    pub(crate) cipher: SecretCipher,
}

impl ContentStore {
    /// 连接并初始化数据库。
    ///
    /// - `db_url`：完整的数据库连接 URL，例如 `sqlite:///data/magazine.db?mode=rwc`
    /// - `data_dir`：本地数据目录，用于存放密钥文件
    ///
    /// 自动运行 `sea-orm-migration` 迁移，确保 Schema 最新。
    pub async fn new(db_url: &str, data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let db = Database::connect(db_url).await?;

        if db_url.starts_with("sqlite:") {
            db.execute_unprepared("PRAGMA journal_mode=WAL;").await?;
        }

        Migrator::up(&db, None).await?;

        let cipher = SecretCipher::load_or_create(data_dir)?;
        tracing::info!(db_url = %db_url, "Initialized content store");

        Ok(Self { db, cipher })
    }

    /// 返回底层数据库连接引用（供子模块及测试使用）。
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// Parse a status-like column into its closed enum.
pub(crate) fn parse_column<T: FromStr>(column: &'static str, raw: &str) -> Result<T> {
    raw.parse().map_err(|_| StorageError::UnexpectedValue {
        column,
        value: raw.to_owned(),
    })
}

/// Slugify `text`, falling back to `fallback` when nothing ascii survives.
///
/// ```
/// use magazine_storage::store::derive_slug;
///
/// assert_eq!(derive_slug("AI News: 2024!", "1"), "ai-news-2024");
/// assert_eq!(derive_slug("!!!", "42"), "42");
/// ```
pub fn derive_slug(text: &str, fallback: &str) -> String {
    let slug = slug::slugify(text);
    if slug.is_empty() {
        fallback.to_string()
    } else {
        slug
    }
}

/// Convert a unique index violation raised by a racing writer into a field error.
pub(crate) fn map_unique_violation(err: sea_orm::DbErr, field: &str) -> StorageError {
    match err.sql_err() {
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => {
            StorageError::field(field, "has already been taken")
        }
        _ => StorageError::Database(err),
    }
}
