//! Database layer for burnline
//!
//! This module provides the storage layer using SQLite with:
//! - Schema migrations
//! - Seed upserts for current state and the activity log
//! - The [`crate::analytics::AnalyticsSource`] queries

pub mod repo;
pub mod schema;

pub use repo::Database;
