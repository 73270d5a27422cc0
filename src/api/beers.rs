use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::Value;

use super::{created, reverse, Body};
use crate::auth::Viewer;
use crate::error::{Error, Result};
use crate::models::NewBeer;
use crate::permissions::{Action, Model, Permission};
use crate::state::AppState;
use crate::store::{execute, Store};
use crate::validation::{check_text, FieldErrors, Rating};

#[derive(Debug, Deserialize)]
pub struct BeerForm {
    name: Option<String>,
    bar: Option<Value>,
    brewery: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct RatingForm {
    rating: Option<Value>,
}

/// Read a primary key from a JSON number or a form string.
fn parse_pk(errors: &mut FieldErrors, field: &str, value: Option<&Value>) -> i32 {
    let pk = match value {
        None | Some(Value::Null) => {
            errors.add(field, "This field is required.");
            return 0;
        }
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };

    match pk.filter(|&pk| pk > 0 && pk <= i64::from(i32::MAX)) {
        Some(pk) => pk as i32,
        None => {
            errors.add(field, "Incorrect type. Expected pk value.");
            0
        }
    }
}

fn validate(form: BeerForm) -> Result<NewBeer> {
    let mut errors = FieldErrors::new();
    check_text(&mut errors, "name", form.name.as_deref());
    let bar_id = parse_pk(&mut errors, "bar", form.bar.as_ref());
    let brewery_id = parse_pk(&mut errors, "brewery", form.brewery.as_ref());

    errors.finish(NewBeer {
        name: form.name.unwrap_or_default(),
        bar_id,
        brewery_id,
    })
}

/// Fail with 404 unless the beer exists.
fn existing_beer(store: &dyn Store, id: i32) -> Result<()> {
    if store.beer_exists(id)? {
        Ok(())
    } else {
        Err(Error::NotFound)
    }
}

pub async fn list(state: web::Data<AppState>, viewer: Viewer) -> Result<HttpResponse> {
    let user_id = viewer.id();
    let beers = execute(&state.store, move |s| s.list_beers(user_id)).await?;

    Ok(HttpResponse::Ok().json(beers))
}

pub async fn create(
    req: HttpRequest,
    state: web::Data<AppState>,
    viewer: Viewer,
    body: Body,
) -> Result<HttpResponse> {
    viewer.require_perm(Permission::new(Action::Add, Model::Beer))?;
    let new_beer = validate(body.parse()?)?;

    let beer = execute(&state.store, move |s| {
        let mut errors = FieldErrors::new();
        if s.get_bar(new_beer.bar_id)?.is_none() {
            errors.add(
                "bar",
                format!("Invalid pk \"{}\" - object does not exist.", new_beer.bar_id),
            );
        }
        if s.get_brewery(new_beer.brewery_id)?.is_none() {
            errors.add(
                "brewery",
                format!(
                    "Invalid pk \"{}\" - object does not exist.",
                    new_beer.brewery_id
                ),
            );
        }
        errors.finish(())?;

        s.create_beer(&new_beer)
    })
    .await?;
    info!("Created beer {} ({})", beer.id, beer.name);

    Ok(created(
        reverse(&req, "beer-detail", &[beer.id.to_string()])?,
        &beer,
    ))
}

pub async fn detail(
    state: web::Data<AppState>,
    viewer: Viewer,
    id: web::Path<i32>,
) -> Result<HttpResponse> {
    let id = id.into_inner();
    let user_id = viewer.id();

    let detail = execute(&state.store, move |s| s.beer_detail(id, user_id))
        .await?
        .ok_or(Error::NotFound)?;

    Ok(HttpResponse::Ok().json(detail))
}

pub async fn star(
    state: web::Data<AppState>,
    viewer: Viewer,
    id: web::Path<i32>,
) -> Result<HttpResponse> {
    let user_id = viewer.require_login()?.id;
    let id = id.into_inner();

    execute(&state.store, move |s| {
        existing_beer(s, id)?;
        s.star_beer(user_id, id)
    })
    .await?;

    Ok(HttpResponse::NoContent().finish())
}

pub async fn unstar(
    state: web::Data<AppState>,
    viewer: Viewer,
    id: web::Path<i32>,
) -> Result<HttpResponse> {
    let user_id = viewer.require_login()?.id;
    let id = id.into_inner();

    execute(&state.store, move |s| {
        existing_beer(s, id)?;
        s.unstar_beer(user_id, id)
    })
    .await?;

    Ok(HttpResponse::NoContent().finish())
}

pub async fn rate(
    state: web::Data<AppState>,
    viewer: Viewer,
    id: web::Path<i32>,
    body: Body,
) -> Result<HttpResponse> {
    let user_id = viewer.require_login()?.id;
    let id = id.into_inner();
    let rating = Rating::from_field(body.parse::<RatingForm>()?.rating.as_ref())?;

    execute(&state.store, move |s| {
        existing_beer(s, id)?;
        s.rate_beer(user_id, id, rating)
    })
    .await?;

    Ok(HttpResponse::NoContent().finish())
}

pub async fn unrate(
    state: web::Data<AppState>,
    viewer: Viewer,
    id: web::Path<i32>,
) -> Result<HttpResponse> {
    let user_id = viewer.require_login()?.id;
    let id = id.into_inner();

    execute(&state.store, move |s| {
        existing_beer(s, id)?;
        s.unrate_beer(user_id, id)
    })
    .await?;

    Ok(HttpResponse::NoContent().finish())
}
