use identity::{
    hash_password, mint_session_token, verify_password, verify_session_token, IdentityError,
    MIN_PASSWORD_LEN,
};
use shared::{
    domain::{AuthProvider, UserId},
    error::{ApiError, ErrorCode},
    protocol::{GoogleSignInRequest, SessionResponse, SignInRequest, SignUpRequest},
};
use storage::{NewUser, StoredUser};
use tracing::{info, warn};

use crate::{internal, ApiContext};

fn normalize_email(email: &str) -> Result<String, ApiError> {
    let email = email.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(ApiError::new(ErrorCode::Validation, "invalid email address"));
    }
    Ok(email)
}

fn invalid_credentials() -> ApiError {
    ApiError::new(ErrorCode::Unauthorized, "invalid email or password")
}

fn rejected_session(err: IdentityError) -> ApiError {
    ApiError::new(ErrorCode::Unauthorized, err.to_string())
}

async fn issue_session(ctx: &ApiContext, user: &StoredUser) -> Result<SessionResponse, ApiError> {
    let minted = mint_session_token(&ctx.identity, user.user_id)
        .map_err(|e| ApiError::new(ErrorCode::Internal, format!("token mint failed: {e}")))?;
    ctx.storage
        .record_session(&minted.session_id, user.user_id, minted.expires_at)
        .await
        .map_err(internal)?;
    info!(user_id = user.user_id.0, provider = ?user.provider, "session issued");
    Ok(SessionResponse {
        token: minted.token,
        expires_at: minted.expires_at,
        user: user.summary(),
    })
}

async fn load_user(ctx: &ApiContext, user_id: UserId) -> Result<StoredUser, ApiError> {
    ctx.storage
        .get_user(user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::new(ErrorCode::Internal, "user vanished after creation"))
}

pub async fn sign_up(ctx: &ApiContext, req: SignUpRequest) -> Result<SessionResponse, ApiError> {
    let email = normalize_email(&req.email)?;
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::new(
            ErrorCode::Validation,
            format!("password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    if ctx
        .storage
        .find_user_by_email(&email)
        .await
        .map_err(internal)?
        .is_some()
    {
        return Err(ApiError::new(ErrorCode::Conflict, "email already registered"));
    }

    let password_hash = hash_password(&req.password)
        .map_err(|e| ApiError::new(ErrorCode::Internal, e.to_string()))?;
    let display_name = req
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());
    let user_id = ctx
        .storage
        .create_user(NewUser {
            email: &email,
            display_name,
            password_hash: Some(&password_hash),
            provider: AuthProvider::Password,
            provider_subject: None,
        })
        .await
        .map_err(internal)?;

    let user = load_user(ctx, user_id).await?;
    issue_session(ctx, &user).await
}

pub async fn sign_in(ctx: &ApiContext, req: SignInRequest) -> Result<SessionResponse, ApiError> {
    let email = normalize_email(&req.email).map_err(|_| invalid_credentials())?;
    let user = ctx
        .storage
        .find_user_by_email(&email)
        .await
        .map_err(internal)?
        .ok_or_else(invalid_credentials)?;
    let Some(stored_hash) = user.password_hash.as_deref() else {
        return Err(invalid_credentials());
    };
    if !verify_password(&req.password, stored_hash) {
        warn!(user_id = user.user_id.0, "password sign-in rejected");
        return Err(invalid_credentials());
    }
    issue_session(ctx, &user).await
}

/// Signs in with a Google ID token, creating the account on first use. An
/// existing account with the same verified email is reused.
pub async fn google_sign_in(
    ctx: &ApiContext,
    req: GoogleSignInRequest,
) -> Result<SessionResponse, ApiError> {
    let identity = ctx
        .federated
        .verify(&req.id_token)
        .await
        .map_err(|e| match e {
            IdentityError::FederatedUnavailable(msg) => ApiError::new(ErrorCode::Upstream, msg),
            other => ApiError::new(ErrorCode::Unauthorized, other.to_string()),
        })?;

    if let Some(user) = ctx
        .storage
        .find_user_by_provider(AuthProvider::Google, &identity.subject)
        .await
        .map_err(internal)?
    {
        return issue_session(ctx, &user).await;
    }

    let email = normalize_email(&identity.email)?;
    if let Some(user) = ctx
        .storage
        .find_user_by_email(&email)
        .await
        .map_err(internal)?
    {
        return issue_session(ctx, &user).await;
    }

    let user_id = ctx
        .storage
        .create_user(NewUser {
            email: &email,
            display_name: identity.display_name.as_deref(),
            password_hash: None,
            provider: AuthProvider::Google,
            provider_subject: Some(&identity.subject),
        })
        .await
        .map_err(internal)?;
    info!(user_id = user_id.0, "account created from google sign-in");

    let user = load_user(ctx, user_id).await?;
    issue_session(ctx, &user).await
}

/// Resolves a bearer token to its user; revoked or expired sessions fail.
pub async fn authenticate(ctx: &ApiContext, token: &str) -> Result<UserId, ApiError> {
    let claims = verify_session_token(&ctx.identity, token).map_err(rejected_session)?;
    let user_id = claims.user_id().map_err(rejected_session)?;
    let active = ctx
        .storage
        .session_is_active(&claims.jti, user_id)
        .await
        .map_err(internal)?;
    if !active {
        return Err(ApiError::new(
            ErrorCode::Unauthorized,
            "session revoked or expired",
        ));
    }
    Ok(user_id)
}

pub async fn sign_out(ctx: &ApiContext, token: &str) -> Result<(), ApiError> {
    let claims = verify_session_token(&ctx.identity, token).map_err(rejected_session)?;
    let revoked = ctx
        .storage
        .revoke_session(&claims.jti)
        .await
        .map_err(internal)?;
    if revoked {
        info!(session_id = %claims.jti, "session revoked");
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/auth_tests.rs"]
mod tests;
