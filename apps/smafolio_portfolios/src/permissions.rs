use smafolio_core::auth::{AuthUser, Viewer};
use smafolio_core::error::AppError;
use smafolio_core::models::{profile, user};

use crate::models::portfolio_item;

/// Only the owner may change or delete an item.
pub fn is_owner(actor: &AuthUser, item: &portfolio_item::Model) -> bool {
    actor.id == item.owner_id
}

/// `Forbidden` unless `actor` owns `item`; `action` completes "you do not
/// have permission to ...".
pub fn ensure_owner(
    actor: &AuthUser,
    item: &portfolio_item::Model,
    action: &'static str,
) -> Result<(), AppError> {
    if is_owner(actor, item) {
        Ok(())
    } else {
        Err(AppError::Forbidden(action))
    }
}

/// Public profiles are visible to everyone, private ones only to their
/// owner. A user without a profile row is treated as public.
pub fn is_visible_to(viewer: &Viewer, owner: &user::Model, profile: Option<&profile::Model>) -> bool {
    profile.map_or(true, |p| p.is_public) || viewer.id() == Some(owner.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn owner() -> user::Model {
        let now = Utc::now();
        user::Model {
            id: 1,
            email: "nok@example.com".into(),
            username: "nok".into(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn profile(is_public: bool) -> profile::Model {
        profile::Model {
            id: 1,
            user_id: 1,
            avatar: "avatars/default.png".into(),
            bio: String::new(),
            is_public,
            facebook_link: String::new(),
            github_link: String::new(),
        }
    }

    fn item(owner_id: i64) -> portfolio_item::Model {
        let now = Utc::now();
        portfolio_item::Model {
            id: 9,
            owner_id,
            title: "t".into(),
            description: "d".into(),
            category_id: None,
            cover_image: "portfolio_covers/c.jpg".into(),
            video_link: None,
            event_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn actor(id: i64) -> AuthUser {
        AuthUser {
            id,
            username: format!("user{id}"),
        }
    }

    #[test]
    fn private_profile_is_hidden_from_everyone_but_the_owner() {
        let private = profile(false);
        assert!(!is_visible_to(&Viewer(None), &owner(), Some(&private)));
        assert!(!is_visible_to(&Viewer(Some(actor(2))), &owner(), Some(&private)));
        assert!(is_visible_to(&Viewer(Some(actor(1))), &owner(), Some(&private)));
    }

    #[test]
    fn public_or_missing_profile_is_visible() {
        assert!(is_visible_to(&Viewer(None), &owner(), Some(&profile(true))));
        assert!(is_visible_to(&Viewer(None), &owner(), None));
    }

    #[test]
    fn only_owner_passes_the_ownership_check() {
        assert!(is_owner(&actor(1), &item(1)));
        assert!(matches!(
            ensure_owner(&actor(2), &item(1), "edit this item"),
            Err(AppError::Forbidden("edit this item"))
        ));
    }
}
