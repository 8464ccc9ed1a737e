use serde::{Deserialize, Serialize};

use crate::media::MediaStorage;
use crate::models::{profile, user};
use crate::serializers::user_auth::UserPublic;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProfileOut {
    pub avatar: String,
    pub avatar_url: String,
    pub bio: String,
    pub is_public: bool,
    pub facebook_link: String,
    pub github_link: String,
}

impl ProfileOut {
    pub fn new(p: &profile::Model, media: &MediaStorage) -> Self {
        Self {
            avatar: p.avatar.clone(),
            avatar_url: media.url(&p.avatar),
            bio: p.bio.clone(),
            is_public: p.is_public,
            facebook_link: p.facebook_link.clone(),
            github_link: p.github_link.clone(),
        }
    }
}

/// What third parties see about a portfolio owner. No email.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OwnerOut {
    pub username: String,
    pub display_name: String,
    pub first_name: String,
    pub last_name: String,
    pub profile: Option<ProfileOut>,
}

impl OwnerOut {
    pub fn new(u: &user::Model, p: Option<&profile::Model>, media: &MediaStorage) -> Self {
        Self {
            username: u.username.clone(),
            display_name: u.display_name(),
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            profile: p.map(|p| ProfileOut::new(p, media)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileEditOut {
    pub user: UserPublic,
    pub profile: ProfileOut,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
