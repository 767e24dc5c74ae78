//! Reelwatch Engine - Orchestration layer
//!
//! Async adapters around the pure core (feed client, notifier, retention
//! purge) and the pipeline that sequences them for one run.

pub mod config;
pub mod feed;
pub mod notify;
pub mod pipeline;
pub mod retention;

pub use config::AppConfig;
pub use feed::{FeedSource, HttpFeedClient};
pub use notify::{dispatch_all, Notifier, NotifyReport, TelegramNotifier};
pub use pipeline::{Pipeline, PipelineSettings, RunReport, RunStage};
pub use retention::{purge, RetentionReport};
