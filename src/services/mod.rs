pub mod aggregator;
pub mod auth_service;
pub mod preference_service;
pub mod saved_article_service;
