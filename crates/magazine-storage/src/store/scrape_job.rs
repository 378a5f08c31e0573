use chrono::Utc;
use magazine_common::types::{ScrapeJob, ScrapeJobCallback, ScrapeJobStatus};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};

use crate::entities::scrape_job::{self, Column, Entity};
use crate::error::{Result, StorageError};
use crate::store::{parse_column, CallbackOutcome, ContentStore};

fn to_job(m: scrape_job::Model) -> Result<ScrapeJob> {
    Ok(ScrapeJob {
        status: parse_column("scrape_jobs.status", &m.status)?,
        id: m.id,
        target_url: m.target_url,
        max_posts: m.max_posts,
        posts_found: m.posts_found,
        error_message: m.error_message,
        created_by: m.created_by,
        started_at: m.started_at.map(|t| t.with_timezone(&Utc)),
        finished_at: m.finished_at.map(|t| t.with_timezone(&Utc)),
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    })
}

const NON_TERMINAL: [&str; 2] = ["pending", "running"];

impl ContentStore {
    async fn scrape_job_model(&self, id: &str) -> Result<scrape_job::Model> {
        Entity::find_by_id(id)
            .one(self.db())
            .await?
            .ok_or_else(|| StorageError::not_found("scrape_job", id))
    }

    pub async fn create_scrape_job(
        &self,
        target_url: &str,
        max_posts: i32,
        created_by: Option<&str>,
    ) -> Result<ScrapeJob> {
        let now = Utc::now().fixed_offset();
        let am = scrape_job::ActiveModel {
            id: Set(magazine_common::id::next_id()),
            target_url: Set(target_url.to_owned()),
            max_posts: Set(max_posts),
            status: Set(ScrapeJobStatus::Pending.as_str().to_owned()),
            posts_found: Set(None),
            error_message: Set(None),
            created_by: Set(created_by.map(str::to_owned)),
            started_at: Set(None),
            finished_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let m = am.insert(self.db()).await?;
        to_job(m)
    }

    pub async fn get_scrape_job(&self, id: &str) -> Result<Option<ScrapeJob>> {
        let m = Entity::find_by_id(id).one(self.db()).await?;
        m.map(to_job).transpose()
    }

    pub async fn list_scrape_jobs(
        &self,
        status: Option<ScrapeJobStatus>,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<ScrapeJob>> {
        let mut q = Entity::find();
        if let Some(s) = status {
            q = q.filter(Column::Status.eq(s.as_str()));
        }
        let rows = q
            .order_by(Column::CreatedAt, Order::Desc)
            .limit(limit)
            .offset(offset)
            .all(self.db())
            .await?;
        rows.into_iter().map(to_job).collect()
    }

    pub async fn count_scrape_jobs(&self, status: Option<ScrapeJobStatus>) -> Result<u64> {
        let mut q = Entity::find();
        if let Some(s) = status {
            q = q.filter(Column::Status.eq(s.as_str()));
        }
        Ok(q.count(self.db()).await?)
    }

    /// `pending -> running` once the scraper process has been spawned.
    pub async fn mark_scrape_job_running(&self, id: &str) -> Result<ScrapeJob> {
        let now = Utc::now().fixed_offset();
        Entity::update_many()
            .col_expr(Column::Status, Expr::value(ScrapeJobStatus::Running.as_str()))
            .col_expr(Column::StartedAt, Expr::value(now))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Id.eq(id))
            .filter(Column::Status.eq(ScrapeJobStatus::Pending.as_str()))
            .exec(self.db())
            .await?;
        to_job(self.scrape_job_model(id).await?)
    }

    /// Fail a job that has not finished yet. Returns `false` when the job
    /// was already terminal (e.g. the scraper reported before exiting).
    pub async fn fail_scrape_job(&self, id: &str, error_message: &str) -> Result<bool> {
        let now = Utc::now().fixed_offset();
        let res = Entity::update_many()
            .col_expr(Column::Status, Expr::value(ScrapeJobStatus::Failed.as_str()))
            .col_expr(Column::ErrorMessage, Expr::value(error_message))
            .col_expr(Column::FinishedAt, Expr::value(now))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Id.eq(id))
            .filter(Column::Status.is_in(NON_TERMINAL))
            .exec(self.db())
            .await?;
        Ok(res.rows_affected > 0)
    }

    /// Apply the scraper's completion report, with the same conditional
    /// write and redelivery rules as keyword rewrite callbacks.
    pub async fn apply_scrape_callback(
        &self,
        cb: &ScrapeJobCallback,
    ) -> Result<CallbackOutcome<ScrapeJob>> {
        if !cb.status.is_terminal() {
            return Err(StorageError::field("status", "must be either completed or failed"));
        }
        self.scrape_job_model(&cb.job_id).await?;

        let now = Utc::now().fixed_offset();
        let res = Entity::update_many()
            .col_expr(Column::Status, Expr::value(cb.status.as_str()))
            .col_expr(Column::PostsFound, Expr::value(cb.posts_found))
            .col_expr(Column::ErrorMessage, Expr::value(cb.error_message.clone()))
            .col_expr(Column::FinishedAt, Expr::value(now))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Id.eq(cb.job_id.as_str()))
            .filter(Column::Status.is_in(NON_TERMINAL))
            .exec(self.db())
            .await?;

        let m = self.scrape_job_model(&cb.job_id).await?;
        if res.rows_affected > 0 {
            return Ok(CallbackOutcome::Applied(to_job(m)?));
        }
        let current: ScrapeJobStatus = parse_column("scrape_jobs.status", &m.status)?;
        if current == cb.status {
            return Ok(CallbackOutcome::Duplicate(to_job(m)?));
        }
        Err(StorageError::Conflict(format!(
            "scrape job {} is already {}",
            cb.job_id, current
        )))
    }
}
