use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::{NotSet, Set};

use crate::media::DEFAULT_AVATAR;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = true)]
    pub id: i64,

    #[sea_orm(unique)]
    pub user_id: i64,

    /// Stored media path.
    pub avatar: String,

    #[sea_orm(column_type = "Text")]
    pub bio: String,

    /// Whether anyone besides the owner may see the portfolio.
    pub is_public: bool,

    pub facebook_link: String,
    pub github_link: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub const BIO_MAX_CHARS: usize = 500;

/// Fresh profile row for a user that was just created.
pub fn default_for(user_id: i64) -> ActiveModel {
    ActiveModel {
        id: NotSet,
        user_id: Set(user_id),
        avatar: Set(DEFAULT_AVATAR.to_string()),
        bio: Set(String::new()),
        is_public: Set(true),
        facebook_link: Set(String::new()),
        github_link: Set(String::new()),
    }
}
