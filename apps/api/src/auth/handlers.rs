use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::extractor::CurrentUser;
use super::password::{hash_password, verify_password};
use super::users::{self, NewUser};
use crate::db::is_unique_violation;
use crate::errors::AppError;
use crate::models::user::UserRow;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// POST /api/v1/auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserRow>), AppError> {
    let username = req.username.trim();
    let email = req.email.trim();
    if username.is_empty() {
        return Err(AppError::Validation("username must not be empty".to_string()));
    }
    if !email.contains('@') {
        return Err(AppError::Validation("email is not a valid address".to_string()));
    }
    if req.password.is_empty() {
        return Err(AppError::Validation("password must not be empty".to_string()));
    }

    if users::find_by_username(&state.db, username).await?.is_some() {
        return Err(AppError::conflict("Username already registered", None));
    }
    if users::email_taken(&state.db, email).await? {
        return Err(AppError::conflict("Email already registered", None));
    }

    let hashed_password = hash_password(&req.password)?;
    let new_user = NewUser {
        username,
        email,
        hashed_password: &hashed_password,
        full_name: req.full_name.as_deref().map(str::trim).filter(|s| !s.is_empty()),
    };
    let user = users::insert_user(&state.db, &new_user).await.map_err(|e| {
        if is_unique_violation(&e) {
            AppError::conflict("Username or email already registered", None)
        } else {
            AppError::Database(e)
        }
    })?;

    info!("Registered user {} (id {})", user.username, user.id);
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/v1/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let user = users::find_by_username(&state.db, req.username.trim())
        .await?
        .filter(|user| verify_password(&req.password, &user.hashed_password))
        .ok_or_else(|| AppError::Unauthorized("Incorrect username or password".to_string()))?;

    if !user.is_active {
        return Err(AppError::Validation("Inactive user".to_string()));
    }

    Ok(Json(TokenResponse {
        access_token: state.tokens.issue(user.id)?,
        token_type: "bearer".to_string(),
    }))
}

/// GET /api/v1/auth/me
pub async fn handle_me(CurrentUser(user): CurrentUser) -> Json<UserRow> {
    Json(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_state;

    fn register_request(username: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: "hunter22".to_string(),
            full_name: Some("Test User".to_string()),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let (state, _dir) = test_state().await;
        let (status, Json(user)) =
            handle_register(State(state.clone()), Json(register_request("ada", "ada@example.com")))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert!(user.is_active);
        assert!(!user.is_superuser);

        let Json(token) = handle_login(
            State(state.clone()),
            Json(LoginRequest {
                username: "ada".to_string(),
                password: "hunter22".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(token.token_type, "bearer");
        assert_eq!(state.tokens.verify(&token.access_token).unwrap(), user.id);
    }

    #[tokio::test]
    async fn test_duplicate_username_and_email_conflict() {
        let (state, _dir) = test_state().await;
        handle_register(State(state.clone()), Json(register_request("ada", "ada@example.com")))
            .await
            .unwrap();

        let dup_name =
            handle_register(State(state.clone()), Json(register_request("ada", "other@example.com")))
                .await;
        assert!(matches!(dup_name, Err(AppError::Conflict { .. })));

        let dup_email =
            handle_register(State(state.clone()), Json(register_request("bob", "ada@example.com")))
                .await;
        assert!(matches!(dup_email, Err(AppError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_wrong_password_unauthorized() {
        let (state, _dir) = test_state().await;
        handle_register(State(state.clone()), Json(register_request("ada", "ada@example.com")))
            .await
            .unwrap();
        let result = handle_login(
            State(state),
            Json(LoginRequest {
                username: "ada".to_string(),
                password: "wrong".to_string(),
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_register_validates_email() {
        let (state, _dir) = test_state().await;
        let result =
            handle_register(State(state), Json(register_request("ada", "not-an-email"))).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
