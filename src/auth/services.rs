use tracing::{info, warn};

use crate::{
    auth::{
        dto::{LoginRequest, SignupRequest},
        jwt::JwtKeys,
        password::{hash_password_blocking, verify_password_blocking},
        repo::UserStore,
        repo_types::{NewUser, Role},
        validation::{validate_login, validate_signup},
    },
    error::{AppError, StoreError},
};

pub async fn admin_exists(users: &dyn UserStore) -> Result<bool, AppError> {
    Ok(users.admin_exists().await?)
}

/// Creates an account and returns a fresh token for it.
///
/// The duplicate-email and existing-admin lookups only produce early, friendly
/// errors; the store insert enforces both rules again atomically.
pub async fn signup(
    users: &dyn UserStore,
    keys: &JwtKeys,
    req: SignupRequest,
) -> Result<String, AppError> {
    let input = validate_signup(req).map_err(AppError::Validation)?;

    if users.find_by_email(&input.email).await?.is_some() {
        warn!(email = %input.email, "email already registered");
        return Err(StoreError::DuplicateEmail.into());
    }
    if input.role == Role::Admin && users.admin_exists().await? {
        warn!(email = %input.email, "admin signup rejected, admin exists");
        return Err(StoreError::AdminExists.into());
    }

    let password_hash = hash_password_blocking(input.password).await?;
    let user = users
        .insert(NewUser {
            email: input.email,
            password_hash,
            role: input.role,
            first_name: input.first_name,
            last_name: input.last_name,
            phone_number: input.phone_number,
        })
        .await?;

    let token = keys.issue(&user)?;
    info!(user_id = %user.id, email = %user.email, role = %user.role, "user signed up");
    Ok(token)
}

pub async fn login(
    users: &dyn UserStore,
    keys: &JwtKeys,
    req: LoginRequest,
) -> Result<String, AppError> {
    let (email, password) = validate_login(req).map_err(AppError::Validation)?;

    let Some(user) = users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password_blocking(password, user.password_hash.clone()).await? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let token = keys.issue(&user)?;
    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(token)
}
