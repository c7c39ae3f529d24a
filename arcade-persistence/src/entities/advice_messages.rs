use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "advice_messages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub thread_id: Uuid,
    pub role: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::advice_threads::Entity",
        from = "Column::ThreadId",
        to = "super::advice_threads::Column::Id",
        on_delete = "Cascade"
    )]
    AdviceThreads,
}

impl Related<super::advice_threads::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AdviceThreads.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
