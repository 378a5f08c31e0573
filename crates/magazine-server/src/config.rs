use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// CORS 允许的 origins 列表，为空时允许所有来源（开发模式）
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,

    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub ai_service: AiServiceConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub media: MediaConfig,
}

// ---- Seed file types (used by `init-categories` CLI subcommand) ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoriesSeedFile {
    #[serde(default)]
    pub categories: Vec<SeedCategory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedCategory {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// 完整连接 URL；为空时使用 `data_dir` 下的 SQLite 文件
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            data_dir: default_data_dir(),
        }
    }
}

impl DatabaseConfig {
    pub fn connection_url(&self) -> String {
        match &self.url {
            Some(url) if !url.trim().is_empty() => url.clone(),
            _ => format!(
                "sqlite://{}/magazine.db?mode=rwc",
                self.data_dir.trim_end_matches('/')
            ),
        }
    }

    /// Connection URL with any password replaced, for logging.
    pub fn redacted_url(&self) -> String {
        let url = self.connection_url();
        let Some((scheme, rest)) = url.split_once("://") else {
            return url;
        };
        match rest.split_once('@') {
            Some((userinfo, host)) => {
                let user = userinfo.split(':').next().unwrap_or_default();
                format!("{scheme}://{user}:***@{host}")
            }
            None => url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: Option<String>,
    #[serde(default = "default_token_expire_secs")]
    pub token_expire_secs: u64,
    #[serde(default = "default_admin_email")]
    pub default_admin_email: String,
    /// 为空时首次启动生成随机密码并打印到日志
    #[serde(default)]
    pub default_admin_password: Option<String>,
    #[serde(default = "default_admin_name")]
    pub default_admin_name: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_expire_secs: default_token_expire_secs(),
            default_admin_email: default_admin_email(),
            default_admin_password: None,
            default_admin_name: default_admin_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiServiceConfig {
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
    /// 本服务对外可访问的地址，用于拼接回调 URL
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    #[serde(default)]
    pub callback_secret: String,
    #[serde(default = "default_dispatch_timeout_secs")]
    pub dispatch_timeout_secs: u64,
    #[serde(default = "default_rewrite_timeout_secs")]
    pub rewrite_timeout_secs: u64,
}

impl Default for AiServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_ai_base_url(),
            public_base_url: default_public_base_url(),
            callback_secret: String::new(),
            dispatch_timeout_secs: default_dispatch_timeout_secs(),
            rewrite_timeout_secs: default_rewrite_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// 爬虫可执行文件；为空时新建的抓取任务直接标记失败
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub callback_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_storage_dir")]
    pub storage_dir: String,
    #[serde(default = "default_public_url_prefix")]
    pub public_url_prefix: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            public_url_prefix: default_public_url_prefix(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_http_port() -> u16 {
    8080
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_token_expire_secs() -> u64 {
    86400
}

fn default_admin_email() -> String {
    "admin@example.com".to_string()
}

fn default_admin_name() -> String {
    "Administrator".to_string()
}

fn default_ai_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_public_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_dispatch_timeout_secs() -> u64 {
    30
}

fn default_rewrite_timeout_secs() -> u64 {
    120
}

fn default_storage_dir() -> String {
    "data/media".to_string()
}

fn default_public_url_prefix() -> String {
    "/storage".to_string()
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn keyword_callback_url(&self) -> String {
        format!(
            "{}/v1/keyword-rewrites/callback",
            self.ai_service.public_base_url.trim_end_matches('/')
        )
    }

    pub fn scrape_callback_url(&self) -> String {
        format!(
            "{}/v1/scrape-jobs/callback",
            self.ai_service.public_base_url.trim_end_matches('/')
        )
    }

    /// Public URL prefix normalised to `/segment` without a trailing slash.
    pub fn media_url_prefix(&self) -> String {
        let trimmed = self.media.public_url_prefix.trim_matches('/');
        if trimmed.is_empty() {
            "/storage".to_string()
        } else {
            format!("/{trimmed}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.auth.token_expire_secs, 86400);
        assert_eq!(config.media.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(
            config.database.connection_url(),
            "sqlite://data/magazine.db?mode=rwc"
        );
    }

    #[test]
    fn sections_are_parsed() {
        let config: ServerConfig = toml::from_str(
            r#"
            http_port = 9000

            [ai_service]
            base_url = "http://ai.internal:5000"
            public_base_url = "https://cms.example.com/"
            callback_secret = "s3cret"

            [scraper]
            command = "python3"
            args = ["scraper.py"]

            [media]
            public_url_prefix = "uploads/"
            "#,
        )
        .unwrap();
        assert_eq!(config.http_port, 9000);
        assert_eq!(config.ai_service.callback_secret, "s3cret");
        assert_eq!(config.scraper.args, vec!["scraper.py".to_string()]);
        assert_eq!(
            config.keyword_callback_url(),
            "https://cms.example.com/v1/keyword-rewrites/callback"
        );
        assert_eq!(config.media_url_prefix(), "/uploads");
    }

    #[test]
    fn redacts_password() {
        let db = DatabaseConfig {
            url: Some("postgres://cms:hunter2@db:5432/cms".to_string()),
            data_dir: "data".to_string(),
        };
        assert_eq!(db.redacted_url(), "postgres://cms:***@db:5432/cms");
    }
}
