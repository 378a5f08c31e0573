//! Facebook scrape jobs: process launch plus persisted job tracking.

pub mod api;
