#![allow(dead_code)]

use std::time::Duration;

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{header, Request, Response},
    Router,
};
use chrono::Duration as ChronoDuration;
use http_body_util::BodyExt;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, Set};
use serde_json::Value;
use tempfile::TempDir;
use uuid::Uuid;

use smafolio_core::auth::issue_access_jwt;
use smafolio_core::models::{profile, user};
use smafolio_core::{ensure_schema, AppState, JwtCfg, Settings};

pub const HOST: &str = "testserver";

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    _media: TempDir,
}

pub async fn setup() -> TestApp {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1)
        .min_connections(1)
        .idle_timeout(Duration::from_secs(3600))
        .sqlx_logging(false);
    let db = Database::connect(opts).await.unwrap();
    ensure_schema(&db).await.unwrap();

    let media = tempfile::tempdir().unwrap();
    let settings = Settings {
        secret_key: "test-secret".into(),
        debug: true,
        allowed_hosts: vec![HOST.into()],
        database_url: "sqlite::memory:".into(),
        media_root: media.path().to_path_buf(),
        media_url: "/media/".into(),
        port: 0,
        max_upload_bytes: 10 * 1024 * 1024,
        export_fonts: Vec::new(),
    };
    let jwt_cfg = JwtCfg {
        access_ttl: ChronoDuration::minutes(5),
        refresh_ttl: ChronoDuration::days(1),
        cookie_secure: false,
        cookie_domain: None,
        cookie_name: "smafolio_refresh".into(),
        janitor_interval_secs: 3600,
        revoked_retention_secs: 3600,
    };
    let state = AppState::new(db, settings, jwt_cfg);
    let router = Router::new()
        .merge(smafolio_core::urls::router())
        .merge(smafolio_portfolios::router())
        .merge(smafolio_portfolios::public_router())
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .with_state(state.clone());
    TestApp {
        state,
        router,
        _media: media,
    }
}

/// A user with a profile, and an access token for them.
pub async fn create_user(state: &AppState, username: &str, is_public: bool) -> (user::Model, String) {
    let now = chrono::Utc::now();
    let created = user::ActiveModel {
        email: Set(format!("{username}@example.com")),
        username: Set(username.to_string()),
        first_name: Set(String::new()),
        last_name: Set(String::new()),
        password_hash: Set("unused".into()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .unwrap();
    let mut prof = profile::default_for(created.id);
    prof.is_public = Set(is_public);
    prof.insert(&state.db).await.unwrap();
    let token = issue_access_jwt(created.id, &created.username, state, Uuid::new_v4()).unwrap();
    (created, token)
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri).header(header::HOST, HOST);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_empty(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::HOST, HOST)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::HOST, HOST)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(resp: Response<Body>) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Hand-assembled `multipart/form-data` body.
#[derive(Default)]
pub struct MultipartBody {
    body: Vec<u8>,
}

impl MultipartBody {
    pub const BOUNDARY: &'static str = "----smafolio-test-boundary";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                Self::BOUNDARY
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                Self::BOUNDARY
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn request(mut self, uri: &str, token: &str) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", Self::BOUNDARY).as_bytes());
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::HOST, HOST)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", Self::BOUNDARY),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    use image::{ImageFormat, Rgba, RgbaImage};
    let img = RgbaImage::from_pixel(width, height, Rgba([20, 120, 200, 255]));
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}
