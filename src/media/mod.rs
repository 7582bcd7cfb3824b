//! Content identity and validation
//!
//! Everything in here is pure and synchronous: it runs on the fully buffered
//! payload before any backend is touched.

pub mod hasher;
pub mod validator;

pub use hasher::{content_key, is_content_key};
pub use validator::{validate, MediaType};

/// Content key: lowercase hex SHA-256 of the raw bytes
pub type MediaKey = String;
