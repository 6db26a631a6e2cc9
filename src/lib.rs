pub mod cache;
pub mod commands;
pub mod config;
pub mod db;
pub mod detect;
pub mod i18n;
pub mod metrics;
pub mod pipeline;
pub mod provider;
pub mod rate_limit;
pub mod retry;
pub mod scheduler;
pub mod server;
pub mod telegram;
