use actix_web::{web, HttpRequest, HttpResponse};

use super::{created, reverse, Body};
use crate::auth::Viewer;
use crate::error::{Error, Result};
use crate::models::BreweryChanges;
use crate::permissions::{Action, Model, Permission};
use crate::state::AppState;
use crate::store::execute;
use crate::validation::{check_present_text, check_text, FieldErrors};

#[derive(Debug, Deserialize)]
pub struct BreweryForm {
    name: Option<String>,
    location: Option<String>,
}

/// Validated name and location.
fn validate(form: BreweryForm) -> Result<(String, String)> {
    let mut errors = FieldErrors::new();
    check_text(&mut errors, "name", form.name.as_deref());
    check_text(&mut errors, "location", form.location.as_deref());
    errors.finish(())?;

    Ok((
        form.name.unwrap_or_default(),
        form.location.unwrap_or_default(),
    ))
}

fn validate_changes(changes: BreweryChanges) -> Result<BreweryChanges> {
    let mut errors = FieldErrors::new();
    if let Some(name) = &changes.name {
        check_present_text(&mut errors, "name", name);
    }
    if let Some(location) = &changes.location {
        check_present_text(&mut errors, "location", location);
    }

    errors.finish(changes)
}

pub async fn list(state: web::Data<AppState>) -> Result<HttpResponse> {
    let breweries = execute(&state.store, |s| s.list_breweries()).await?;

    Ok(HttpResponse::Ok().json(breweries))
}

pub async fn retrieve(state: web::Data<AppState>, id: web::Path<i32>) -> Result<HttpResponse> {
    let id = id.into_inner();
    let brewery = execute(&state.store, move |s| s.get_brewery(id))
        .await?
        .ok_or(Error::NotFound)?;

    Ok(HttpResponse::Ok().json(brewery))
}

pub async fn create(
    req: HttpRequest,
    state: web::Data<AppState>,
    viewer: Viewer,
    body: Body,
) -> Result<HttpResponse> {
    viewer.require_perm(Permission::new(Action::Add, Model::Brewery))?;
    let (name, location) = validate(body.parse()?)?;

    let brewery = execute(&state.store, move |s| s.create_brewery(&name, &location)).await?;
    info!("Created brewery {} ({})", brewery.id, brewery.name);

    Ok(created(
        reverse(&req, "brewery-detail", &[brewery.id.to_string()])?,
        &brewery,
    ))
}

async fn apply(
    state: web::Data<AppState>,
    id: i32,
    changes: BreweryChanges,
) -> Result<HttpResponse> {
    let brewery = execute(&state.store, move |s| s.update_brewery(id, &changes))
        .await?
        .ok_or(Error::NotFound)?;

    Ok(HttpResponse::Ok().json(brewery))
}

pub async fn update(
    state: web::Data<AppState>,
    viewer: Viewer,
    id: web::Path<i32>,
    body: Body,
) -> Result<HttpResponse> {
    viewer.require_perm(Permission::new(Action::Change, Model::Brewery))?;
    let (name, location) = validate(body.parse()?)?;
    let changes = BreweryChanges {
        name: Some(name),
        location: Some(location),
    };

    apply(state, id.into_inner(), changes).await
}

pub async fn partial_update(
    state: web::Data<AppState>,
    viewer: Viewer,
    id: web::Path<i32>,
    body: Body,
) -> Result<HttpResponse> {
    viewer.require_perm(Permission::new(Action::Change, Model::Brewery))?;
    let changes = validate_changes(body.parse()?)?;

    apply(state, id.into_inner(), changes).await
}

pub async fn destroy(
    state: web::Data<AppState>,
    viewer: Viewer,
    id: web::Path<i32>,
) -> Result<HttpResponse> {
    viewer.require_perm(Permission::new(Action::Delete, Model::Brewery))?;
    let id = id.into_inner();

    if !execute(&state.store, move |s| s.delete_brewery(id)).await? {
        return Err(Error::NotFound);
    }
    info!("Deleted brewery {}", id);

    Ok(HttpResponse::NoContent().finish())
}
