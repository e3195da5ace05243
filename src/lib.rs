use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::Router;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod config;

pub mod account;
pub mod achievement;
pub mod auth;
pub mod report;
pub mod store;

#[cfg(test)]
mod tests;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),
    #[error("missing token")]
    MissingToken,
    #[error("invalid token format")]
    InvalidTokenFormat,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("invalid username or password")]
    BadCredentials,
    #[error("account is inactive")]
    AccountInactive,

    #[error("role missing in context")]
    RoleMissing,
    #[error("forbidden: role not allowed")]
    RoleNotAllowed,
    #[error("no permissions found")]
    NoPermissions,
    #[error("permission denied: needed '{0}'")]
    PermissionDenied(String),
    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("only draft achievements can be {0}")]
    DraftOnly(&'static str),
    #[error("achievement must be in 'submitted' status to be {0}")]
    SubmittedOnly(&'static str),
    #[error("rejection note is required")]
    NoteRequired,

    #[error("payload too large")]
    PayloadTooLarge,

    #[error("token encoding failed: {0}")]
    Token(jsonwebtoken::errors::Error),
    #[error("storage errored: {0}")]
    Storage(String),
}

impl Error {
    pub fn to_status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_)
            | Error::DraftOnly(_)
            | Error::SubmittedOnly(_)
            | Error::NoteRequired => StatusCode::BAD_REQUEST,
            Error::MissingToken
            | Error::InvalidTokenFormat
            | Error::InvalidToken
            | Error::BadCredentials => StatusCode::UNAUTHORIZED,
            Error::AccountInactive
            | Error::RoleMissing
            | Error::RoleNotAllowed
            | Error::NoPermissions
            | Error::PermissionDenied(_)
            | Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Token(_) | Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        #[derive(Serialize)]
        struct ErrorInfo {
            error: String,
        }

        let status = self.to_status_code();
        // Internal failures keep their detail in the log, not on the wire.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("internal error: {self}");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, axum::Json(ErrorInfo { error: message })).into_response()
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    #[inline]
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Token(err)
    }
}

/// [`axum::Json`] with the rejection rewritten into the crate error so
/// malformed bodies produce the same `{ "error": _ }` shape as
/// everything else.
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<S, B, T> axum::extract::FromRequest<S, B> for JsonBody<T>
where
    axum::Json<T>: axum::extract::FromRequest<S, B, Rejection = JsonRejection>,
    S: Send + Sync,
    B: Send + 'static,
{
    type Rejection = Error;

    async fn from_request(req: axum::http::Request<B>, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::from_request(req, state)
            .await
            .map_err(|_| Error::Validation("invalid request body".to_string()))?;
        Ok(Self(value))
    }
}

/// Everything a request handler needs, built once at startup.
pub struct AppState {
    pub config: config::Config,
    pub tokens: auth::token::TokenCodec,
    pub identity: Arc<dyn store::IdentityStore>,
    pub references: Arc<dyn store::ReferenceStore>,
    pub details: Arc<dyn store::DetailStore>,
}

/// Construct the full router.
///
/// Lives outside `main` so the tests can drive the exact production
/// routing table with `tower::ServiceExt::oneshot`.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        // authentication
        .route("/auth/login", post(auth::handle::login))
        .route("/auth/refresh", post(auth::handle::refresh))
        .route("/auth/logout", post(auth::handle::logout))
        .route("/auth/profile", get(auth::handle::profile))
        // user management
        .route(
            "/users",
            get(account::handle::list_users).post(account::handle::create_user),
        )
        .route(
            "/users/:id",
            get(account::handle::get_user)
                .put(account::handle::update_user)
                .delete(account::handle::delete_user),
        )
        .route("/users/:id/role", put(account::handle::assign_role))
        // achievements
        .route(
            "/achievements",
            get(achievement::handle::list_achievements)
                .post(achievement::handle::create_achievement),
        )
        .route(
            "/achievements/:id",
            get(achievement::handle::achievement_detail)
                .put(achievement::handle::update_achievement)
                .delete(achievement::handle::delete_achievement),
        )
        .route(
            "/achievements/:id/history",
            get(achievement::handle::achievement_history),
        )
        .route(
            "/achievements/:id/submit",
            post(achievement::handle::submit_achievement),
        )
        .route(
            "/achievements/:id/attachments",
            post(achievement::handle::upload_attachment),
        )
        .route(
            "/achievements/:id/verify",
            post(achievement::handle::verify_achievement),
        )
        .route(
            "/achievements/:id/reject",
            post(achievement::handle::reject_achievement),
        )
        // student and lecturer directory
        .route("/students", get(account::handle::list_students))
        .route("/students/:id", get(account::handle::get_student))
        .route(
            "/students/:id/achievements",
            get(account::handle::student_achievements),
        )
        .route("/students/:id/advisor", put(account::handle::update_advisor))
        .route("/lecturers", get(account::handle::list_lecturers))
        .route(
            "/lecturers/:id/advisees",
            get(account::handle::lecturer_advisees),
        )
        // reports
        .route("/reports/statistics", get(report::handle::global_statistics))
        .route("/reports/student/:id", get(report::handle::student_report));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
