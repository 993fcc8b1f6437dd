use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A provider article cached for one user under the search term it was fetched with.
///
/// Lives in the document store, so it carries no foreign key to `users`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cached_articles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i32,
    pub search_term: String,
    pub article_key: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub article: Json,
    pub cached_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
