use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::state::AppState;

pub mod admin;
pub mod health;
pub mod jobs;
pub mod users;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = build_cors(state.config.cors_allowed_origin.as_deref());
    // Multipart framing on top of the largest accepted file.
    let body_limit = state.config.max_upload_bytes + 64 * 1024;

    let user_routes = Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/me", get(users::me))
        .route("/profile", put(users::update_profile))
        .route("/upload", post(users::upload_file))
        .route("/dashboard", get(users::dashboard))
        .route("/applications", get(users::my_applications));

    let job_routes = Router::new()
        .route("/", get(jobs::list_jobs).post(jobs::create_job))
        .route("/public/search", get(jobs::search_jobs))
        .route("/applied/me", get(jobs::applied_jobs))
        .route(
            "/:id",
            get(jobs::get_job)
                .put(jobs::update_job)
                .delete(jobs::delete_job),
        )
        .route("/:id/apply", post(jobs::apply_to_job))
        .route("/:id/applicants", get(jobs::list_applicants));

    let admin_routes = Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/users", get(admin::list_users))
        .route("/users/:id/status", put(admin::update_user_status))
        .route("/users/:id", delete(admin::delete_user))
        .route("/jobs", get(admin::list_jobs))
        .route("/jobs/:id/toggle", put(admin::toggle_job_status))
        .route("/jobs/:id", delete(admin::delete_job))
        .route("/applications", get(admin::list_applications))
        .route("/applications/:id", delete(admin::delete_application));

    Router::new()
        .nest("/api/user", user_routes)
        .nest("/api/jobs", job_routes)
        .nest("/api/admin", admin_routes)
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(body_limit))
}

fn build_cors(origins: Option<&str>) -> CorsLayer {
    let allow_origin = match origins {
        Some(origins) => {
            let headers: Vec<HeaderValue> = origins
                .split(',')
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .filter_map(|value| match value.parse::<HeaderValue>() {
                    Ok(header) => Some(header),
                    Err(_) => {
                        warn!(origin = %value, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(headers)
        }
        None => AllowOrigin::mirror_request(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub(crate) fn to_iso(dt: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).to_rfc3339()
}
