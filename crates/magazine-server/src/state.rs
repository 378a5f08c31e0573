use crate::config::ServerConfig;
use chrono::{DateTime, Utc};
use magazine_ai::{ArticleRewriter, ScrapeLauncher};
use magazine_storage::ContentStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ContentStore>,
    pub rewriter: Arc<dyn ArticleRewriter>,
    pub scraper: Arc<dyn ScrapeLauncher>,
    pub start_time: DateTime<Utc>,
    pub jwt_secret: Arc<String>,
    pub token_expire_secs: u64,
    pub config: Arc<ServerConfig>,
}
