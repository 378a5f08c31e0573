use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m001_initial_schema"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 按依赖顺序建表
        manager.get_connection().execute_unprepared(UP_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(DOWN_SQL)
            .await?;
        Ok(())
    }
}

// Slug and name uniqueness only applies to live rows, so soft-deleted
// records never block reuse.
const UP_SQL: &str = "
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'editor',
    is_active INTEGER NOT NULL DEFAULT 1,
    token_version INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS categories (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    slug TEXT NOT NULL,
    description TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT
);
CREATE UNIQUE INDEX IF NOT EXISTS uq_categories_name ON categories(name) WHERE deleted_at IS NULL;
CREATE UNIQUE INDEX IF NOT EXISTS uq_categories_slug ON categories(slug) WHERE deleted_at IS NULL;

CREATE TABLE IF NOT EXISTS articles (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    slug TEXT NOT NULL,
    content TEXT NOT NULL,
    source_url TEXT,
    source_name TEXT,
    source_icon TEXT,
    is_processed INTEGER NOT NULL DEFAULT 0,
    is_ai_rewritten INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_articles_is_processed ON articles(is_processed);

CREATE TABLE IF NOT EXISTS facebook_posts (
    id TEXT PRIMARY KEY NOT NULL,
    content TEXT NOT NULL,
    source_url TEXT,
    page_or_group_name TEXT,
    processed INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_facebook_posts_processed ON facebook_posts(processed);

CREATE TABLE IF NOT EXISTS keyword_rewrites (
    id TEXT PRIMARY KEY NOT NULL,
    keyword TEXT NOT NULL,
    created_by TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    source_url TEXT,
    source_title TEXT,
    source_content TEXT,
    rewritten_content TEXT,
    error_message TEXT,
    all_articles TEXT,
    completed_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_keyword_rewrites_status ON keyword_rewrites(status);

CREATE TABLE IF NOT EXISTS media (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    file_name TEXT NOT NULL,
    file_path TEXT NOT NULL,
    mime_type TEXT NOT NULL,
    size INTEGER NOT NULL,
    type TEXT NOT NULL,
    user_id TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_media_type ON media(type);

CREATE TABLE IF NOT EXISTS rewritten_articles (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    slug TEXT NOT NULL,
    content TEXT NOT NULL,
    meta_title TEXT,
    meta_description TEXT,
    meta_keywords TEXT,
    featured_image TEXT,
    user_id TEXT,
    category_id TEXT,
    original_article_id TEXT,
    facebook_post_id TEXT,
    keyword_rewrite_id TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    rejection_reason TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT
);
CREATE UNIQUE INDEX IF NOT EXISTS uq_rewritten_articles_slug ON rewritten_articles(slug) WHERE deleted_at IS NULL;
CREATE INDEX IF NOT EXISTS idx_rewritten_articles_status ON rewritten_articles(status);
CREATE INDEX IF NOT EXISTS idx_rewritten_articles_category ON rewritten_articles(category_id);

CREATE TABLE IF NOT EXISTS approved_articles (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    slug TEXT NOT NULL,
    content TEXT NOT NULL,
    meta_title TEXT,
    meta_description TEXT,
    meta_keywords TEXT,
    featured_image_id TEXT,
    user_id TEXT,
    category_id TEXT,
    original_article_id TEXT,
    ai_generated INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'published',
    published_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT
);
CREATE UNIQUE INDEX IF NOT EXISTS uq_approved_articles_slug ON approved_articles(slug) WHERE deleted_at IS NULL;
CREATE INDEX IF NOT EXISTS idx_approved_articles_status ON approved_articles(status, published_at DESC);
CREATE INDEX IF NOT EXISTS idx_approved_articles_category ON approved_articles(category_id);

CREATE TABLE IF NOT EXISTS ai_settings (
    id TEXT PRIMARY KEY NOT NULL,
    provider TEXT NOT NULL UNIQUE,
    api_key TEXT,
    model_name TEXT NOT NULL,
    temperature REAL,
    max_tokens INTEGER,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

const DOWN_SQL: &str = "
DROP TABLE IF EXISTS ai_settings;
DROP TABLE IF EXISTS approved_articles;
DROP TABLE IF EXISTS rewritten_articles;
DROP TABLE IF EXISTS media;
DROP TABLE IF EXISTS keyword_rewrites;
DROP TABLE IF EXISTS facebook_posts;
DROP TABLE IF EXISTS articles;
DROP TABLE IF EXISTS categories;
DROP TABLE IF EXISTS users;
";
