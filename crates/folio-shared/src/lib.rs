//! # folio-shared
//!
//! Domain vocabulary shared by the Folio store and server crates: typed ids,
//! validated request payloads, slug derivation, pagination arithmetic,
//! password hashing, bearer tokens and Markdown rendering. Nothing in here
//! performs I/O.

pub mod constants;
pub mod content;
pub mod error;
pub mod markdown;
pub mod pagination;
pub mod password;
pub mod slug;
pub mod token;
pub mod types;

pub use error::{PasswordError, TokenError, ValidationError};
pub use types::UserId;
