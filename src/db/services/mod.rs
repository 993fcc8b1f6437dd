//! Data access for the relational and document stores.
//!
//! Functions here speak `sea_orm::DbErr` only; translating failures into
//! user-facing outcomes happens in `crate::services`.

pub mod cached_article_service;
pub mod preference_service;
pub mod saved_article_service;
pub mod user_service;

pub use cached_article_service::*;
pub use preference_service::*;
pub use saved_article_service::*;
pub use user_service::*;
