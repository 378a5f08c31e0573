pub mod ai_setting;
pub mod approved_article;
pub mod article;
pub mod category;
pub mod facebook_post;
pub mod keyword_rewrite;
pub mod media;
pub mod rewritten_article;
pub mod scrape_job;
pub mod user;
