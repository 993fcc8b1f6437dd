use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "preferences")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)] // ids are fixed reference data
    #[serde(rename = "preference_id")]
    pub id: i32,
    #[sea_orm(unique)]
    #[serde(rename = "preference_name")]
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_preference::Entity")]
    UserPreferences,
}

impl Related<super::user_preference::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserPreferences.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        super::user_preference::Relation::User.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::user_preference::Relation::Preference.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
