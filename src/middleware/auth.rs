use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use crate::{
    dto::auth::Claims, error::AppError, models::Role, state::AppState, state::JwtSettings,
};

/// Actions gated by role. Every role check in the services goes through
/// [`AuthUser::require`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ManageCatalog,
    ManageDiscounts,
    ManageOrders,
    ModerateReviews,
    /// Read or cancel orders owned by someone else.
    ActOnAnyOrder,
}

impl Role {
    pub fn allows(&self, permission: Permission) -> bool {
        match self {
            Role::Admin => true,
            Role::User => match permission {
                Permission::ManageCatalog
                | Permission::ManageDiscounts
                | Permission::ManageOrders
                | Permission::ModerateReviews
                | Permission::ActOnAnyOrder => false,
            },
        }
    }
}

/// Caller identity rebuilt from the bearer token's claims.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    pub fn can(&self, permission: Permission) -> bool {
        self.role.allows(permission)
    }

    pub fn require(&self, permission: Permission) -> Result<(), AppError> {
        if self.can(permission) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "role {} may not {:?}",
                self.role, permission
            )))
        }
    }

    /// Owners always pass; anyone else needs `permission`.
    pub fn require_owner_or(&self, owner_id: Uuid, permission: Permission) -> Result<(), AppError> {
        if self.user_id == owner_id {
            return Ok(());
        }
        self.require(permission)
    }
}

pub fn decode_token(jwt: &JwtSettings, token: &str) -> Result<AuthUser, AppError> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

    let claims = decoded.claims;
    let user_id = Uuid::parse_str(&claims.uid)
        .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;
    let role = claims
        .role
        .parse::<Role>()
        .map_err(|_| AppError::Unauthorized("Invalid role in token".into()))?;

    Ok(AuthUser {
        user_id,
        username: claims.sub,
        role,
    })
}

fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(auth_header) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".into()))?;
    Ok(Some(token.trim()))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;
        decode_token(&state.jwt, token)
    }
}

/// Like [`AuthUser`] but lets anonymous callers through. A token that is
/// present but invalid is still rejected.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => decode_token(&state.jwt, token).map(|user| MaybeAuthUser(Some(user))),
            None => Ok(MaybeAuthUser(None)),
        }
    }
}
