//! HTTP middleware.

pub mod internal_key;

pub use internal_key::{INTERNAL_KEY_HEADER, require_internal_key};
