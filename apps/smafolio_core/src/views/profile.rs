use axum::{
    extract::{Multipart, State},
    Json,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    Set, TransactionTrait,
};
use tracing::info;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::forms::{FormData, ProfileForm};
use crate::media::{verify, UploadDir};
use crate::models::user::{self, Column as UserCol, Entity as User};
use crate::models::profile::{self, Column as ProfileCol, Entity as Profile};
use crate::serializers::profile::{ProfileEditOut, ProfileOut};
use crate::serializers::user_auth::UserPublic;
use crate::AppState;

pub async fn edit_profile_form(
    State(state): State<AppState>,
    actor: AuthUser,
) -> Result<Json<ProfileEditOut>, AppError> {
    let (found, prof) = load_user_and_profile(&state.db, actor.id).await?;
    Ok(Json(ProfileEditOut {
        user: UserPublic::from(&found),
        profile: ProfileOut::new(&prof, &state.media),
        message: None,
    }))
}

pub async fn edit_profile(
    State(state): State<AppState>,
    actor: AuthUser,
    multipart: Multipart,
) -> Result<Json<ProfileEditOut>, AppError> {
    let form = FormData::from_multipart(multipart).await?;
    update_profile(&state, actor.id, ProfileForm::from_form_data(&form))
        .await
        .map(Json)
}

/// Apply a profile edit for `user_id`. Nothing is written unless the whole
/// form is valid.
pub async fn update_profile(
    state: &AppState,
    user_id: i64,
    form: ProfileForm,
) -> Result<ProfileEditOut, AppError> {
    let mut errors = form.check();
    if !errors.contains("username") {
        let taken = User::find()
            .filter(UserCol::Username.eq(&form.username))
            .filter(UserCol::Id.ne(user_id))
            .one(&state.db)
            .await?
            .is_some();
        if taken {
            errors.add("username", "A user with that username already exists.");
        }
    }
    errors.into_result()?;

    if let Some(upload) = form.avatar.clone() {
        tokio::task::spawn_blocking(move || verify(&upload))
            .await
            .map_err(AppError::internal)??;
    }
    let avatar = match &form.avatar {
        Some(upload) => Some(state.media.save(UploadDir::Avatars, upload).await?),
        None => None,
    };

    let txn = state.db.begin().await?;
    let (found, prof) = load_user_and_profile(&txn, user_id).await?;

    let mut um = found.into_active_model();
    um.username = Set(form.username.clone());
    um.first_name = Set(form.first_name.clone());
    um.last_name = Set(form.last_name.clone());
    um.updated_at = Set(Utc::now());
    let saved_user = um.update(&txn).await?;

    let mut pm = prof.into_active_model();
    pm.bio = Set(form.bio.clone());
    pm.is_public = Set(form.is_public);
    pm.facebook_link = Set(form.facebook_link.clone());
    pm.github_link = Set(form.github_link.clone());
    if let Some(path) = avatar {
        pm.avatar = Set(path);
    }
    let saved_profile = pm.update(&txn).await?;
    txn.commit().await?;

    info!(user_id, is_public = saved_profile.is_public, "profile updated");

    Ok(ProfileEditOut {
        user: UserPublic::from(&saved_user),
        profile: ProfileOut::new(&saved_profile, &state.media),
        message: Some("Your profile has been updated.".into()),
    })
}

/// The user and their profile; a profile that went missing is recreated
/// with defaults.
async fn load_user_and_profile<C: ConnectionTrait>(
    db: &C,
    user_id: i64,
) -> Result<(user::Model, profile::Model), AppError> {
    let found = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(AppError::Unauthenticated)?;
    let prof = match Profile::find()
        .filter(ProfileCol::UserId.eq(user_id))
        .one(db)
        .await?
    {
        Some(p) => p,
        None => profile::default_for(user_id).insert(db).await?,
    };
    Ok((found, prof))
}
