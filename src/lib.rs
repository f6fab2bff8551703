pub mod analytics;
pub mod api;
pub mod config;
pub mod format;
pub mod models;
pub mod seed;
pub mod storage;
