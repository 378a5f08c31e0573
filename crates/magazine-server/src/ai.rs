//! Keyword rewrites and source rewrites backed by the external AI service.

pub mod api;
