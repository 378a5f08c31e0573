pub mod ai;
pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod logging;
pub mod middleware;
pub mod openapi;
pub mod scrape;
pub mod seed;
pub mod state;
