//! # burnline-core
//!
//! Core library for burnline - temporal analytics for a project tracker.
//!
//! This library provides:
//! - Domain types for stories, sprints, objectives and the activity log
//! - A SQLite-backed data source
//! - Burndown, progress and overview analytics reconstructed from the log
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Model
//!
//! Only current state is stored, plus an append-only log of field changes
//! (sprint, objective and status). Any past day's state is derived by
//! undoing the logged changes made since then.
//!
//! ## Example
//!
//! ```rust,no_run
//! use burnline_core::analytics::AnalyticsService;
//! use burnline_core::{Config, Database};
//! use std::sync::Arc;
//!
//! let config = Config::load().expect("failed to load config");
//! let db = Database::open(&config.resolved_database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//!
//! let service = AnalyticsService::new(Arc::new(db), config.analytics.clone());
//! let progress = service.compute_progress_chart("objective-1", 30);
//! ```

// Re-export commonly used items at the crate root
pub use analytics::AnalyticsService;
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod types;
