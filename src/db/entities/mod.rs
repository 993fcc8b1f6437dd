//! SeaORM entities.
//!
//! `user`, `preference` and `user_preference` live in the relational store;
//! `cached_article` and `saved_article` are document tables and may live in a
//! separate database.

pub mod user;
pub mod preference;
pub mod user_preference;
pub mod cached_article;
pub mod saved_article;
