use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, Key, PrivateCookieJar};

use crate::{error::AppError, models::user::User, services::users, state::AppState};

pub const SESSION_COOKIE: &str = "folio_session";

pub fn hash_password(plain: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|err| AppError::Other(anyhow::anyhow!("password hashing failed: {err}")))?;
    Ok(hash.to_string())
}

/// False on mismatch or a malformed stored hash; a wrong password is never
/// an error.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

/// Identity resolved from the session cookie for the current request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
}

impl From<&User> for AuthenticatedUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<AuthenticatedUser>);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // The key type has to be spelled out: both Key and AppState satisfy
        // FromRef<AppState>, so inference cannot pick one.
        let jar: PrivateCookieJar<Key> = PrivateCookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::Unauthorized)?;
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Ok(Self(None));
        };
        // The cookie holds the username; a stale cookie for a deleted user
        // resolves to anonymous.
        let user = users::find_by_username(&state.db, cookie.value()).await?;
        Ok(Self(user.as_ref().map(AuthenticatedUser::from)))
    }
}

impl CurrentUser {
    pub fn require_user(&self) -> Result<&AuthenticatedUser, AppError> {
        self.0.as_ref().ok_or(AppError::Unauthorized)
    }
}

/// Checks the credentials against the users table. `last_login` is written
/// only after the password has been verified.
pub async fn authenticate(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<User, AppError> {
    let Some(user) = users::find_by_username(&state.db, username).await? else {
        return Err(AppError::BadCredentials);
    };
    if !verify_password(password, &user.password_hash) {
        return Err(AppError::BadCredentials);
    }
    users::touch_last_login(&state.db, user.id).await?;
    Ok(user)
}

pub fn apply_session_cookie(jar: PrivateCookieJar, username: &str) -> PrivateCookieJar {
    let cookie = Cookie::build((SESSION_COOKIE, username.to_string()))
        .path("/")
        .http_only(true)
        .build();
    jar.add(cookie)
}

pub fn clear_session_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let hash = hash_password("li201338").expect("hashing should succeed");
        assert!(verify_password("li201338", &hash));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hash = hash_password("correct-horse-battery-staple").expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash));
    }

    #[test]
    fn verify_is_false_for_malformed_hash() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn hashes_are_salted() {
        let first = hash_password("same-input").expect("hashing should succeed");
        let second = hash_password("same-input").expect("hashing should succeed");
        assert_ne!(first, second);
    }
}
