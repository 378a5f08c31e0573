//! Persistence layer for the magazine backend.
//!
//! All data lives in one SQLite database accessed through SeaORM. The
//! [`store::ContentStore`] facade owns the connection and exposes one group
//! of async methods per table. Status columns are stored as plain strings and
//! parsed into the typed enums of `magazine_common::types` on the way out.

pub mod auth;
pub mod entities;
pub mod error;
pub mod store;

#[cfg(test)]
mod tests;

pub use error::{FieldErrors, Result, StorageError};
pub use store::{
    AiSettingInput, ApproveOverrides, ApprovedArticleFilter, ApprovedArticleUpdate,
    CallbackOutcome, ContentStore, DraftFilter, DraftUpdate, KeywordConversion,
    KeywordRewriteFilter, NewDraft, NewFacebookPost, NewMedia, NewSourceArticle, NewUser,
    UserUpdate,
};
