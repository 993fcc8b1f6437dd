pub mod article_routes;
pub mod preference_routes;
