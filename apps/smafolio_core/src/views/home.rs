use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct Health {
    ok: bool,
    service: &'static str,
}

pub async fn healthz() -> Json<Health> {
    Json(Health {
        ok: true,
        service: "smafolio",
    })
}

#[derive(Serialize)]
pub struct Landing {
    pub name: &'static str,
    pub tagline: &'static str,
    pub signup: &'static str,
    pub login: &'static str,
    pub dashboard: &'static str,
}

/// Landing payload: where a visitor goes next.
pub async fn home() -> Json<Landing> {
    Json(Landing {
        name: "Smafolio",
        tagline: "Collect your activities and awards in one shareable portfolio.",
        signup: "/accounts/signup/",
        login: "/accounts/login/",
        dashboard: "/dashboard/",
    })
}
