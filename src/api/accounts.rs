use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{Duration, Utc};

use super::{redirect, reverse, Body};
use crate::auth::{self, Viewer, SESSION_COOKIE};
use crate::error::{Error, Result};
use crate::models::Profile;
use crate::state::AppState;
use crate::store::execute;
use crate::validation::{check_text, FieldErrors};

#[derive(Deserialize)]
pub struct LoginForm {
    username: Option<String>,
    password: Option<String>,
}

pub async fn login(state: web::Data<AppState>, body: Body) -> Result<HttpResponse> {
    let form: LoginForm = body.parse()?;

    let mut errors = FieldErrors::new();
    check_text(&mut errors, "username", form.username.as_deref());
    check_text(&mut errors, "password", form.password.as_deref());
    errors.finish(())?;

    let username = form.username.unwrap_or_default();
    let password = form.password.unwrap_or_default();
    let ttl_hours = state.settings.session_ttl_hours;
    let ttl = Duration::try_hours(ttl_hours)
        .ok_or_else(|| Error::Config(format!("session TTL of {} hours is too long", ttl_hours)))?;

    let session = execute(&state.store, move |s| {
        let record = match auth::authenticate(s.find_user_by_username(&username)?, &password) {
            Some(record) => record,
            None => return Ok(None),
        };

        let token = auth::new_session_token()?;
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .ok_or_else(|| Error::Config("session expiry is out of range".into()))?;
        s.create_session(&token, record.id, expires_at)?;

        Ok(s.session_user(&token, Utc::now())?.map(|user| (token, user)))
    })
    .await?;

    match session {
        Some((token, user)) => {
            info!("{} logged in", user.username);

            Ok(HttpResponse::Ok()
                .cookie(auth::session_cookie(
                    &token,
                    ttl_hours,
                    state.settings.secure_cookies,
                ))
                .json(user))
        }
        None => {
            warn!("Failed login attempt");

            Err(Error::Validation(FieldErrors::single(
                "non_field_errors",
                "Please enter a correct username and password.",
            )))
        }
    }
}

pub async fn logout(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        let token = cookie.value().to_owned();
        execute(&state.store, move |s| s.delete_session(&token)).await?;
    }

    Ok(HttpResponse::NoContent()
        .cookie(auth::expired_session_cookie())
        .finish())
}

/// The logged-in user's starred and rated beers.
///
/// Anonymous visitors are redirected to the login page.
pub async fn profile(
    req: HttpRequest,
    state: web::Data<AppState>,
    viewer: Viewer,
) -> Result<HttpResponse> {
    let user = match viewer.0 {
        Some(user) => user,
        None => {
            let login = reverse::<&str>(&req, "login", &[])?;
            return Ok(redirect(&format!("{}?next={}", login, req.path())));
        }
    };

    let user_id = user.id;
    let (starred_beers, rated_beers) = execute(&state.store, move |s| {
        Ok((s.starred_beers(user_id)?, s.rated_beers(user_id)?))
    })
    .await?;

    Ok(HttpResponse::Ok().json(Profile {
        user,
        starred_beers,
        rated_beers,
    }))
}
