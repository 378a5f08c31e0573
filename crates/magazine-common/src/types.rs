use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

// ---- Status enums ----

/// Account role. Admins manage users and settings; editors manage content only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Editor,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Editor => "editor",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "editor" => Ok(Self::Editor),
            _ => Err(format!("unknown user role: {s}")),
        }
    }
}

/// Lifecycle of a keyword rewrite request.
///
/// # Examples
///
/// ```
/// use magazine_common::types::RewriteStatus;
///
/// let status: RewriteStatus = "processing".parse().unwrap();
/// assert_eq!(status, RewriteStatus::Processing);
/// assert!(!status.is_terminal());
/// assert!(RewriteStatus::Failed.is_terminal());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RewriteStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl RewriteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for RewriteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RewriteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("unknown rewrite status: {s}")),
        }
    }
}

/// Review status of a rewritten draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    Pending,
    Approved,
    Rejected,
}

impl DraftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DraftStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("unknown draft status: {s}")),
        }
    }
}

/// Visibility of a published article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    Published,
    Archived,
}

impl PublishStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }
}

impl std::fmt::Display for PublishStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PublishStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "published" => Ok(Self::Published),
            "archived" => Ok(Self::Archived),
            _ => Err(format!("unknown publish status: {s}")),
        }
    }
}

/// Kind of uploaded file; decides the storage sub-directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Document,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Document => "document",
        }
    }

    /// `image/*` mime types are images, everything else is a document.
    ///
    /// ```
    /// use magazine_common::types::MediaType;
    ///
    /// assert_eq!(MediaType::from_mime("image/png"), MediaType::Image);
    /// assert_eq!(MediaType::from_mime("application/pdf"), MediaType::Document);
    /// ```
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("image/") {
            Self::Image
        } else {
            Self::Document
        }
    }

    /// Directory name under the media storage root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Image => "images",
            Self::Document => "documents",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" => Ok(Self::Image),
            "document" => Ok(Self::Document),
            _ => Err(format!("unknown media type: {s}")),
        }
    }
}

/// Lifecycle of a scraper run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeJobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ScrapeJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for ScrapeJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ScrapeJobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("unknown scrape job status: {s}")),
        }
    }
}

// ---- Validation helpers ----

/// Accepts lowercase ascii slugs such as `ai-news-2024`.
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    let well_formed = !slug.is_empty()
        && slug.len() <= 255
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if well_formed {
        Ok(())
    } else {
        Err(ValidationError::new("slug")
            .with_message(Cow::from("must contain only lowercase letters, digits and dashes")))
    }
}

fn validate_terminal_rewrite_status(status: &RewriteStatus) -> Result<(), ValidationError> {
    if status.is_terminal() {
        Ok(())
    } else {
        Err(ValidationError::new("status")
            .with_message(Cow::from("must be either completed or failed")))
    }
}

fn validate_terminal_job_status(status: &ScrapeJobStatus) -> Result<(), ValidationError> {
    if status.is_terminal() {
        Ok(())
    } else {
        Err(ValidationError::new("status")
            .with_message(Cow::from("must be either completed or failed")))
    }
}

// ---- Users & auth ----

/// Stored account, including credentials. Never serialized to clients directly.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub is_active: bool,
    pub token_version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public view of an account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserInfo {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserInfo {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.clone(),
            name: u.name.clone(),
            email: u.email.clone(),
            role: u.role,
            is_active: u.is_active,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    /// Token lifetime in seconds.
    pub expires_in: u64,
    pub user: UserInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub current_password: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[serde(default)]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 8, max = 128))]
    pub password: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

// ---- Categories ----

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Derived from `name` when omitted.
    #[validate(custom(function = "validate_slug"))]
    #[serde(default)]
    pub slug: Option<String>,
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

// ---- Source records ----

/// Scraped article, input of the rewrite workflow.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SourceArticle {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub source_url: Option<String>,
    pub source_name: Option<String>,
    pub source_icon: Option<String>,
    pub is_processed: bool,
    pub is_ai_rewritten: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateSourceArticleRequest {
    #[validate(length(min = 1, max = 500))]
    pub title: String,
    #[validate(custom(function = "validate_slug"))]
    #[serde(default)]
    pub slug: Option<String>,
    #[validate(length(min = 1))]
    pub content: String,
    #[validate(url)]
    #[serde(default)]
    pub source_url: Option<String>,
    #[validate(length(max = 255))]
    #[serde(default)]
    pub source_name: Option<String>,
    #[validate(url)]
    #[serde(default)]
    pub source_icon: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FacebookPost {
    pub id: String,
    pub content: String,
    pub source_url: Option<String>,
    pub page_or_group_name: Option<String>,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateFacebookPostRequest {
    #[validate(length(min = 1))]
    pub content: String,
    #[validate(url)]
    #[serde(default)]
    pub source_url: Option<String>,
    #[validate(length(max = 255))]
    #[serde(default)]
    pub page_or_group_name: Option<String>,
}

/// Request body for rewriting a source article or Facebook post.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RewriteSourceRequest {
    #[validate(length(min = 1))]
    pub category_id: String,
}

// ---- Keyword rewrites ----

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct KeywordRewrite {
    pub id: String,
    pub keyword: String,
    pub created_by: Option<String>,
    pub status: RewriteStatus,
    pub source_url: Option<String>,
    pub source_title: Option<String>,
    pub source_content: Option<String>,
    pub rewritten_content: Option<String>,
    pub error_message: Option<String>,
    /// Raw search results returned by the rewrite service.
    #[schema(value_type = Option<Object>)]
    pub all_articles: Option<serde_json::Value>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Set once the rewrite has been turned into a draft or article.
    pub converted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SubmitKeywordRequest {
    #[validate(length(min = 1, max = 255))]
    pub keyword: String,
}

/// Payload posted back by the rewrite service once a keyword job finishes.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct KeywordRewriteCallback {
    #[validate(length(min = 1))]
    pub rewrite_id: String,
    #[validate(custom(function = "validate_terminal_rewrite_status"))]
    pub status: RewriteStatus,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub source_title: Option<String>,
    #[serde(default)]
    pub source_content: Option<String>,
    #[serde(default)]
    pub rewritten_content: Option<String>,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub error_message: Option<String>,
    #[schema(value_type = Option<Object>)]
    #[serde(default)]
    pub all_articles: Option<serde_json::Value>,
}

/// Lightweight status answer for client polling.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct KeywordRewriteStatusView {
    pub id: String,
    pub status: RewriteStatus,
    pub error_message: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    /// True once polling can stop.
    pub terminal: bool,
}

impl From<&KeywordRewrite> for KeywordRewriteStatusView {
    fn from(r: &KeywordRewrite) -> Self {
        Self {
            id: r.id.clone(),
            status: r.status,
            error_message: r.error_message.clone(),
            completed_at: r.completed_at,
            terminal: r.status.is_terminal(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ConvertKeywordRewriteRequest {
    #[validate(length(min = 1))]
    pub category_id: String,
    /// Defaults to the source title, then the keyword.
    #[validate(length(min = 1, max = 500))]
    #[serde(default)]
    pub title: Option<String>,
    #[validate(custom(function = "validate_slug"))]
    #[serde(default)]
    pub slug: Option<String>,
    /// Skip review and publish immediately.
    #[serde(default)]
    pub publish: Option<bool>,
}

// ---- Drafts ----

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RewrittenArticle {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub featured_image: Option<String>,
    pub user_id: Option<String>,
    pub category_id: Option<String>,
    pub original_article_id: Option<String>,
    pub facebook_post_id: Option<String>,
    pub keyword_rewrite_id: Option<String>,
    pub status: DraftStatus,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RewrittenArticle {
    /// Whether the draft was produced by the rewrite service rather than typed in by hand.
    pub fn is_ai_generated(&self) -> bool {
        self.original_article_id.is_some()
            || self.facebook_post_id.is_some()
            || self.keyword_rewrite_id.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateRewrittenArticleRequest {
    #[validate(length(min = 1, max = 500))]
    pub title: String,
    #[validate(custom(function = "validate_slug"))]
    #[serde(default)]
    pub slug: Option<String>,
    #[validate(length(min = 1))]
    pub content: String,
    #[validate(length(max = 255))]
    #[serde(default)]
    pub meta_title: Option<String>,
    #[validate(length(max = 500))]
    #[serde(default)]
    pub meta_description: Option<String>,
    #[validate(length(max = 500))]
    #[serde(default)]
    pub meta_keywords: Option<String>,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[validate(length(min = 1))]
    pub category_id: String,
    #[serde(default)]
    pub original_article_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateRewrittenArticleRequest {
    #[validate(length(min = 1, max = 500))]
    pub title: Option<String>,
    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,
    #[validate(length(min = 1))]
    pub content: Option<String>,
    #[validate(length(max = 255))]
    pub meta_title: Option<String>,
    #[validate(length(max = 500))]
    pub meta_description: Option<String>,
    #[validate(length(max = 500))]
    pub meta_keywords: Option<String>,
    pub featured_image: Option<String>,
    pub category_id: Option<String>,
    /// Move a rejected draft back to pending review.
    pub resubmit: Option<bool>,
}

/// Optional overrides applied while promoting a draft.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct ApproveArticleRequest {
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub featured_image_id: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct RejectArticleRequest {
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct BulkReviewRequest {
    #[validate(length(min = 1, max = 100))]
    pub ids: Vec<String>,
    pub action: ReviewAction,
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkReviewOutcome {
    pub id: String,
    pub ok: bool,
    pub error: Option<String>,
    /// Set when a draft was promoted.
    pub approved_article_id: Option<String>,
}

/// Result of converting a completed keyword rewrite.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", content = "article", rename_all = "snake_case")]
pub enum ConvertedArticle {
    /// A pending draft awaiting review.
    Draft(RewrittenArticle),
    /// Published directly, skipping review.
    Published(ApprovedArticle),
}

// ---- Published articles ----

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApprovedArticle {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub featured_image_id: Option<String>,
    pub user_id: Option<String>,
    pub category_id: Option<String>,
    pub original_article_id: Option<String>,
    pub ai_generated: bool,
    pub status: PublishStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateApprovedArticleRequest {
    #[validate(length(min = 1, max = 500))]
    pub title: Option<String>,
    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,
    #[validate(length(min = 1))]
    pub content: Option<String>,
    #[validate(length(max = 255))]
    pub meta_title: Option<String>,
    #[validate(length(max = 500))]
    pub meta_description: Option<String>,
    #[validate(length(max = 500))]
    pub meta_keywords: Option<String>,
    pub category_id: Option<String>,
    pub featured_image_id: Option<String>,
}

// ---- Media ----

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Media {
    pub id: String,
    pub name: String,
    pub file_name: String,
    /// Path relative to the media storage root, e.g. `images/2024/05/<uuid>.png`.
    pub file_path: String,
    pub mime_type: String,
    pub size: i64,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---- AI settings ----

/// Stored rewrite provider settings; `api_key` is decrypted.
#[derive(Debug, Clone)]
pub struct AiSetting {
    pub id: String,
    pub provider: String,
    pub api_key: Option<String>,
    pub model_name: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client-facing view of [`AiSetting`] with the key masked.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AiSettingView {
    pub id: String,
    pub provider: String,
    pub api_key_masked: Option<String>,
    pub model_name: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<i32>,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<&AiSetting> for AiSettingView {
    fn from(s: &AiSetting) -> Self {
        Self {
            id: s.id.clone(),
            provider: s.provider.clone(),
            api_key_masked: s.api_key.as_deref().map(mask_secret),
            model_name: s.model_name.clone(),
            temperature: s.temperature,
            max_tokens: s.max_tokens,
            is_active: s.is_active,
            updated_at: s.updated_at,
        }
    }
}

/// Keep the last four characters of a secret.
///
/// ```
/// use magazine_common::types::mask_secret;
///
/// assert_eq!(mask_secret("sk-abcdef1234"), "****1234");
/// assert_eq!(mask_secret("abc"), "****");
/// ```
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpsertAiSettingRequest {
    #[validate(length(min = 1, max = 50))]
    pub provider: String,
    /// Omit to keep the stored key.
    #[validate(length(min = 1, max = 500))]
    #[serde(default)]
    pub api_key: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub model_name: String,
    #[validate(range(min = 0.0, max = 2.0))]
    #[serde(default)]
    pub temperature: Option<f64>,
    #[validate(range(min = 1, max = 32768))]
    #[serde(default)]
    pub max_tokens: Option<i32>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

// ---- Scrape jobs ----

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScrapeJob {
    pub id: String,
    pub target_url: String,
    pub max_posts: i32,
    pub status: ScrapeJobStatus,
    pub posts_found: Option<i32>,
    pub error_message: Option<String>,
    pub created_by: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateScrapeJobRequest {
    #[validate(url)]
    pub target_url: String,
    #[validate(range(min = 1, max = 500))]
    #[serde(default)]
    pub max_posts: Option<i32>,
}

/// Completion report posted by the scraper process.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ScrapeJobCallback {
    #[validate(length(min = 1))]
    pub job_id: String,
    #[validate(custom(function = "validate_terminal_job_status"))]
    pub status: ScrapeJobStatus,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub posts_found: Option<i32>,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub error_message: Option<String>,
}

// ---- Dashboard ----

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct DraftCounts {
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct KeywordRewriteCounts {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct DashboardSummary {
    pub drafts: DraftCounts,
    pub published_articles: u64,
    pub archived_articles: u64,
    pub keyword_rewrites: KeywordRewriteCounts,
    pub unprocessed_articles: u64,
    pub unprocessed_facebook_posts: u64,
    pub categories: u64,
    pub media: u64,
}
