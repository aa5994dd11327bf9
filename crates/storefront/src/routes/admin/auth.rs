//! Admin login and logout.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{CspNonce, OptionalAdmin, clear_current_admin, set_current_admin};
use crate::services::auth::{AdminAuthService, AuthError};
use crate::state::AppState;

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/login.html")]
pub struct LoginTemplate {
    pub email: String,
    pub error: Option<String>,
    pub configured: bool,
    pub nonce: String,
}

/// Display the login form.
#[instrument(skip_all)]
pub async fn login_page(
    State(state): State<AppState>,
    OptionalAdmin(admin): OptionalAdmin,
    CspNonce(nonce): CspNonce,
) -> Response {
    if admin.is_some() {
        return Redirect::to("/admin/products").into_response();
    }

    LoginTemplate {
        email: String::new(),
        error: None,
        configured: state.config().admin.is_configured(),
        nonce,
    }
    .into_response()
}

/// Verify credentials and store the login marker.
#[instrument(skip(state, session, nonce))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let config = &state.config().admin;

    match AdminAuthService::new(config).login(&form.email, &form.password) {
        Ok(admin) => {
            set_current_admin(&session, &admin).await?;
            set_sentry_user(admin.email.as_str());
            tracing::info!(email = %admin.email, "Admin signed in");
            Ok(Redirect::to("/admin/products").into_response())
        }
        Err(
            e @ (AuthError::InvalidCredentials
            | AuthError::InvalidEmail(_)
            | AuthError::NotConfigured),
        ) => {
            tracing::warn!(error = %e, "Admin login rejected");
            let error = if matches!(e, AuthError::NotConfigured) {
                "Admin login is not configured"
            } else {
                "Invalid email or password"
            };
            let page = LoginTemplate {
                email: form.email,
                error: Some(error.to_string()),
                configured: config.is_configured(),
                nonce,
            };
            Ok((StatusCode::UNAUTHORIZED, page).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Clear the login marker.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<Redirect> {
    clear_current_admin(&session).await?;
    clear_sentry_user();
    Ok(Redirect::to("/admin/login"))
}
