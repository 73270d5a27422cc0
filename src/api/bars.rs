use actix_web::{web, HttpRequest, HttpResponse};

use super::{created, reverse, Body};
use crate::auth::Viewer;
use crate::error::{Error, Result};
use crate::models::BarChanges;
use crate::permissions::{Action, Model, Permission};
use crate::state::AppState;
use crate::store::execute;
use crate::validation::{check_present_text, check_text, FieldErrors};

#[derive(Debug, Deserialize)]
pub struct BarForm {
    name: Option<String>,
}

fn validate(form: BarForm) -> Result<String> {
    let mut errors = FieldErrors::new();
    check_text(&mut errors, "name", form.name.as_deref());
    errors.finish(())?;

    Ok(form.name.unwrap_or_default())
}

fn validate_changes(changes: BarChanges) -> Result<BarChanges> {
    let mut errors = FieldErrors::new();
    if let Some(name) = &changes.name {
        check_present_text(&mut errors, "name", name);
    }

    errors.finish(changes)
}

pub async fn list(state: web::Data<AppState>) -> Result<HttpResponse> {
    let bars = execute(&state.store, |s| s.list_bars()).await?;

    Ok(HttpResponse::Ok().json(bars))
}

pub async fn retrieve(state: web::Data<AppState>, id: web::Path<i32>) -> Result<HttpResponse> {
    let id = id.into_inner();
    let bar = execute(&state.store, move |s| s.get_bar(id))
        .await?
        .ok_or(Error::NotFound)?;

    Ok(HttpResponse::Ok().json(bar))
}

pub async fn create(
    req: HttpRequest,
    state: web::Data<AppState>,
    viewer: Viewer,
    body: Body,
) -> Result<HttpResponse> {
    viewer.require_perm(Permission::new(Action::Add, Model::Bar))?;
    let name = validate(body.parse()?)?;

    let bar = execute(&state.store, move |s| s.create_bar(&name)).await?;
    info!("Created bar {} ({})", bar.id, bar.name);

    Ok(created(reverse(&req, "bar-detail", &[bar.id.to_string()])?, &bar))
}

async fn apply(state: web::Data<AppState>, id: i32, changes: BarChanges) -> Result<HttpResponse> {
    let bar = execute(&state.store, move |s| s.update_bar(id, &changes))
        .await?
        .ok_or(Error::NotFound)?;

    Ok(HttpResponse::Ok().json(bar))
}

pub async fn update(
    state: web::Data<AppState>,
    viewer: Viewer,
    id: web::Path<i32>,
    body: Body,
) -> Result<HttpResponse> {
    viewer.require_perm(Permission::new(Action::Change, Model::Bar))?;
    let name = validate(body.parse()?)?;

    apply(state, id.into_inner(), BarChanges { name: Some(name) }).await
}

pub async fn partial_update(
    state: web::Data<AppState>,
    viewer: Viewer,
    id: web::Path<i32>,
    body: Body,
) -> Result<HttpResponse> {
    viewer.require_perm(Permission::new(Action::Change, Model::Bar))?;
    let changes = validate_changes(body.parse()?)?;

    apply(state, id.into_inner(), changes).await
}

pub async fn destroy(
    state: web::Data<AppState>,
    viewer: Viewer,
    id: web::Path<i32>,
) -> Result<HttpResponse> {
    viewer.require_perm(Permission::new(Action::Delete, Model::Bar))?;
    let id = id.into_inner();

    if !execute(&state.store, move |s| s.delete_bar(id)).await? {
        return Err(Error::NotFound);
    }
    info!("Deleted bar {}", id);

    Ok(HttpResponse::NoContent().finish())
}
