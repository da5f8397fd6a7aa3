//! Authentication route handlers.
//!
//! Signup and login issue a server-side session; the cookie itself is managed
//! by the tower-sessions layer.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_sessions::Session;
use tracing::instrument;

use tamarind_core::{Email, Phone, UserId, UserRole};

use crate::db::users::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::user::{NewAddress, User};
use crate::models::CurrentUser;
use crate::services::auth::AuthService;
use crate::state::AppState;

// =============================================================================
// Request / Response Types
// =============================================================================

/// Signup request body.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub phone: String,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Add-address request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddAddressRequest {
    pub label: Option<String>,
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
}

/// Public view of a user: never includes the password hash.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub phone: Phone,
    pub role: UserRole,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            role: user.role,
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Create an account and log the new user in.
#[instrument(skip(state, session, body))]
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<SignupRequest>,
) -> Result<impl IntoResponse> {
    let auth = AuthService::new(state.pool());
    let user = auth
        .signup(&body.name, &body.email, &body.password, &body.phone)
        .await?;

    persist_session(&session, &user).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Signed up",
            "user": UserResponse::from(&user),
        })),
    ))
}

/// Password login.
#[instrument(skip(state, session, body))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let auth = AuthService::new(state.pool());
    let user = auth.login(&body.email, &body.password).await?;

    persist_session(&session, &user).await?;

    Ok(Json(json!({
        "message": "Logged in",
        "user": UserResponse::from(&user),
    })))
}

/// Clear the session.
#[instrument(skip(session))]
pub async fn logout(RequireAuth(_user): RequireAuth, session: Session) -> Result<impl IntoResponse> {
    clear_current_user(&session)
        .await
        .map_err(|e| AppError::Internal(format!("failed to clear session: {e}")))?;

    Ok(Json(json!({ "message": "Logged out" })))
}

/// Current user with their saved addresses.
#[instrument(skip(state))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<impl IntoResponse> {
    let user = AuthService::new(state.pool()).get_user(current.id).await?;
    let addresses = UserRepository::new(state.pool())
        .list_addresses(current.id)
        .await?;

    Ok(Json(json!({
        "user": UserResponse::from(&user),
        "addresses": addresses,
    })))
}

/// Save a shipping address for the current user.
#[instrument(skip(state, body))]
pub async fn add_address(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Json(body): Json<AddAddressRequest>,
) -> Result<impl IntoResponse> {
    let address = NewAddress {
        label: trimmed(body.label),
        line1: require_field(body.line1)?,
        line2: trimmed(body.line2),
        city: require_field(body.city)?,
        state: require_field(body.state)?,
        zip: require_field(body.zip)?,
        country: trimmed(body.country),
        phone: trimmed(body.phone),
    };

    let users = UserRepository::new(state.pool());
    users.add_address(current.id, &address).await?;
    let addresses = users.list_addresses(current.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Address added",
            "addresses": addresses,
        })),
    ))
}

// =============================================================================
// Helpers
// =============================================================================

/// Store the user identity in the session.
async fn persist_session(session: &Session, user: &User) -> Result<()> {
    let current = CurrentUser::from(user);
    set_current_user(session, &current)
        .await
        .map_err(|e| AppError::Internal(format!("failed to persist session: {e}")))
}

/// Trim an optional field, dropping it entirely when blank.
fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A required address field: present and non-blank.
fn require_field(value: Option<String>) -> Result<String> {
    trimmed(value).ok_or_else(|| AppError::BadRequest("Address fields are required".to_string()))
}
