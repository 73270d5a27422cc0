//! Passwords, login sessions and the request identity.

use actix_web::cookie::{time, Cookie, SameSite};
use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use futures::future::LocalBoxFuture;
use textnonce::TextNonce;

use super::error::{Error, Result};
use super::models::{User, UserRecord};
use super::permissions::Permission;
use super::state::AppState;
use super::store;

pub const SESSION_COOKIE: &str = "sessionid";

const TOKEN_LENGTH: usize = 32;

/// A well-formed hash with the default Argon2 parameters that no password
/// produces.
const PLACEHOLDER_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Check a password against a stored PHC hash.
///
/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Unreadable password hash: {}", e);
            false
        }
    }
}

/// The user whose password is `password`, if any.
///
/// Unknown users are checked against a placeholder hash so the time taken
/// does not reveal which usernames exist.
pub fn authenticate(record: Option<UserRecord>, password: &str) -> Option<UserRecord> {
    match record {
        Some(record) if verify_password(password, &record.password_hash) => Some(record),
        Some(_) => None,
        None => {
            verify_password(password, PLACEHOLDER_HASH);
            None
        }
    }
}

pub fn new_session_token() -> Result<String> {
    TextNonce::sized_urlsafe(TOKEN_LENGTH)
        .map(TextNonce::into_string)
        .map_err(Error::TokenError)
}

pub fn session_cookie(token: &str, max_age_hours: i64, secure: bool) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token.to_owned())
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(max_age_hours))
        .finish()
}

pub fn expired_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

/// The user behind the request's session cookie, if any.
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<User>);

impl Viewer {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }

    pub fn id(&self) -> Option<i32> {
        self.0.as_ref().map(|u| u.id)
    }

    /// The logged-in user, or `NotAuthenticated`.
    pub fn require_login(&self) -> Result<&User> {
        self.user().ok_or(Error::NotAuthenticated)
    }

    /// The logged-in user holding `perm`.
    pub fn require_perm(&self, perm: Permission) -> Result<&User> {
        let user = self.require_login()?;

        if user.has_perm(perm) {
            Ok(user)
        } else {
            info!("{} denied {}", user.username, perm);
            Err(Error::PermissionDenied)
        }
    }
}

impl FromRequest for Viewer {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Viewer>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = req.cookie(SESSION_COOKIE).map(|c| c.value().to_owned());
        let state = req.app_data::<web::Data<AppState>>().cloned();

        Box::pin(async move {
            let token = match token {
                Some(token) if !token.is_empty() => token,
                _ => return Ok(Viewer(None)),
            };
            let state = state.ok_or_else(|| Error::Config("application state missing".into()))?;

            let now = Utc::now();
            let user = store::execute(&state.store, move |s| s.session_user(&token, now)).await?;

            Ok(Viewer(user))
        })
    }
}
