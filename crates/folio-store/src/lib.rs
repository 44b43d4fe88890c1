//! # folio-store
//!
//! SQLite persistence for Folio: users, blogs and projects.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection`, runs migrations on open, and provides typed CRUD
//! helpers for every domain model. Blog search is served by an FTS5 index
//! kept in sync by triggers.

pub mod blogs;
pub mod database;
pub mod migrations;
pub mod models;
pub mod projects;
pub mod users;

mod error;

pub use blogs::BlogQuery;
pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
pub use projects::ProjectQuery;
