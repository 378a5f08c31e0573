pub mod models;
pub mod providers;
pub mod rewriter;
pub mod scraper;
pub mod signature;

pub use models::{RewriteOptions, RewriteOutput};
pub use providers::http::HttpRewriteService;
pub use rewriter::{ArticleRewriter, KeywordJob, RewriteInput};
pub use scraper::{ProcessExit, ProcessScrapeLauncher, ScrapeLaunch, ScrapeLauncher};
