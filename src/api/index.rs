use actix_web::{HttpRequest, HttpResponse};

use super::{redirect, reverse};
use crate::error::Result;

/// The site root sends visitors to the beer list.
pub async fn index(req: HttpRequest) -> Result<HttpResponse> {
    let location = reverse::<&str>(&req, "beer-list", &[])?;

    Ok(redirect(&location))
}
