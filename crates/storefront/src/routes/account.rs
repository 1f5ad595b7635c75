//! Account route handlers.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::db::RepositoryError;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{PageContext, RequireAuth, clear_session, push_flash, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

/// Profile form data.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub name: String,
    pub email: String,
}

/// Dashboard page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/dashboard.html")]
pub struct DashboardTemplate {
    pub page: PageContext,
    pub user: CurrentUser,
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/profile.html")]
pub struct ProfileTemplate {
    pub page: PageContext,
    pub user: User,
}

/// Display the account overview from the session identity.
pub async fn dashboard(RequireAuth(user): RequireAuth, page: PageContext) -> impl IntoResponse {
    DashboardTemplate { page, user }
}

/// Display the profile form with the stored account details.
#[instrument(skip_all, fields(user_id = %current.id))]
pub async fn profile_page(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    session: Session,
    page: PageContext,
) -> Result<Response> {
    let Some(user) = state.store().get_user(current.id).await? else {
        // The account behind this session is gone.
        tracing::warn!("Session user no longer exists; signing out");
        clear_session(&session).await?;
        return Ok(Redirect::to("/login").into_response());
    };

    Ok(ProfileTemplate { page, user }.into_response())
}

/// Overwrite name and email, then refresh the session identity.
#[instrument(skip_all, fields(user_id = %current.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    session: Session,
    Form(form): Form<ProfileForm>,
) -> Result<Redirect> {
    let user = AuthService::new(state.store())
        .update_profile(current.id, &form.name, &form.email)
        .await
        .map_err(|e| match e {
            AuthError::Repository(RepositoryError::NotFound) => {
                AppError::NotFound("User".to_string())
            }
            other => other.into(),
        })?;

    set_current_user(&session, &CurrentUser::from(user)).await?;
    push_flash(&session, "Profile updated.").await?;
    Ok(Redirect::to("/dashboard"))
}
