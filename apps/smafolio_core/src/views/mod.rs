pub mod home;
pub mod profile;
pub mod user_auth;
