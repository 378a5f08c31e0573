use magazine_common::types::{
    DashboardSummary, DraftCounts, DraftStatus, KeywordRewriteCounts, PublishStatus, RewriteStatus,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

use crate::entities::{
    approved_article, article, category, facebook_post, keyword_rewrite, media, rewritten_article,
};
use crate::error::Result;
use crate::store::ContentStore;

impl ContentStore {
    async fn count_drafts_with(&self, status: DraftStatus) -> Result<u64> {
        Ok(rewritten_article::Entity::find()
            .filter(rewritten_article::Column::DeletedAt.is_null())
            .filter(rewritten_article::Column::Status.eq(status.as_str()))
            .count(self.db())
            .await?)
    }

    async fn count_published_with(&self, status: PublishStatus) -> Result<u64> {
        Ok(approved_article::Entity::find()
            .filter(approved_article::Column::DeletedAt.is_null())
            .filter(approved_article::Column::Status.eq(status.as_str()))
            .count(self.db())
            .await?)
    }

    async fn count_keywords_with(&self, status: RewriteStatus) -> Result<u64> {
        Ok(keyword_rewrite::Entity::find()
            .filter(keyword_rewrite::Column::DeletedAt.is_null())
            .filter(keyword_rewrite::Column::Status.eq(status.as_str()))
            .count(self.db())
            .await?)
    }

    pub async fn dashboard_summary(&self) -> Result<DashboardSummary> {
        Ok(DashboardSummary {
            drafts: DraftCounts {
                pending: self.count_drafts_with(DraftStatus::Pending).await?,
                approved: self.count_drafts_with(DraftStatus::Approved).await?,
                rejected: self.count_drafts_with(DraftStatus::Rejected).await?,
            },
            published_articles: self.count_published_with(PublishStatus::Published).await?,
            archived_articles: self.count_published_with(PublishStatus::Archived).await?,
            keyword_rewrites: KeywordRewriteCounts {
                pending: self.count_keywords_with(RewriteStatus::Pending).await?,
                processing: self.count_keywords_with(RewriteStatus::Processing).await?,
                completed: self.count_keywords_with(RewriteStatus::Completed).await?,
                failed: self.count_keywords_with(RewriteStatus::Failed).await?,
            },
            unprocessed_articles: article::Entity::find()
                .filter(article::Column::IsProcessed.eq(false))
                .count(self.db())
                .await?,
            unprocessed_facebook_posts: facebook_post::Entity::find()
                .filter(facebook_post::Column::Processed.eq(false))
                .count(self.db())
                .await?,
            categories: category::Entity::find()
                .filter(category::Column::DeletedAt.is_null())
                .count(self.db())
                .await?,
            media: media::Entity::find().count(self.db()).await?,
        })
    }
}
