use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use uuid::Uuid;

use crate::{
    dto::auth::{Claims, LoginRequest, LoginResponse, RegisterRequest},
    error::{AppError, AppResult},
    mail::{EmailMessage, notify},
    models::{Role, User},
    response::{ApiResponse, Meta},
    state::{AppState, JwtSettings},
};

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

fn verify_password(password: &str, stored_hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn issue_token(jwt: &JwtSettings, user: &User) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(jwt.ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user.username.clone(),
        uid: user.id.to_string(),
        role: user.role.as_str().to_string(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<User>> {
    let RegisterRequest {
        username,
        email,
        password,
    } = payload;
    let username = username.trim().to_string();
    let email = email.trim().to_string();

    if username.is_empty() || email.is_empty() || password.is_empty() {
        return Err(AppError::BadRequest(
            "username, email and password are required".into(),
        ));
    }
    if !email.contains('@') {
        return Err(AppError::BadRequest("email is not valid".into()));
    }

    if state.store.users.find_by_username(&username).await?.is_some() {
        return Err(AppError::BadRequest("Username is already taken".into()));
    }

    let user = state
        .store
        .users
        .save(User {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash: hash_password(&password)?,
            role: Role::User,
            created_at: Utc::now(),
        })
        .await?;

    tracing::info!(user_id = %user.id, username = %user.username, "user registered");

    notify(
        state.mailer.as_ref(),
        EmailMessage::new(
            &user.email,
            "Welcome to the Storefront",
            format!(
                "Hello {},\n\nThank you for registering with us!",
                user.username
            ),
        ),
    )
    .await;

    Ok(ApiResponse::success(
        "User registered successfully",
        user,
        Some(Meta::empty()),
    ))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { username, password } = payload;
    let invalid = || AppError::Unauthorized("Invalid username or password".into());

    let user = state
        .store
        .users
        .find_by_username(username.trim())
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&password, &user.password_hash)? {
        return Err(invalid());
    }

    let token = issue_token(&state.jwt, &user)?;
    tracing::info!(user_id = %user.id, "user logged in");

    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse {
            token: format!("Bearer {}", token),
        },
        Some(Meta::empty()),
    ))
}
