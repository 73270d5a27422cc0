//! Route table and shared handler plumbing.

use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::web::{self, Bytes};
use actix_web::{FromRequest, HttpMessage, HttpRequest, HttpResponse};
use futures::future::LocalBoxFuture;
use serde::de::DeserializeOwned;

use super::error::{Error, Result};

pub mod accounts;
pub mod bars;
pub mod beers;
pub mod breweries;
pub mod index;

/// A request body, read but not yet parsed.
///
/// Handlers check the caller before calling [`Body::parse`], so an anonymous
/// write is refused whatever it sent.
pub struct Body {
    bytes: Bytes,
    form: bool,
}

impl Body {
    /// Decode the body as URL-encoded form data or, otherwise, as JSON.
    ///
    /// An empty body decodes as an empty object.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        if self.form {
            let text = std::str::from_utf8(&self.bytes)
                .map_err(|e| Error::BadRequest(format!("Form parse error - {}", e)))?;

            return web::Query::<T>::from_query(text)
                .map(web::Query::into_inner)
                .map_err(|e| Error::BadRequest(format!("Form parse error - {}", e)));
        }

        let json: &[u8] = if self.bytes.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &self.bytes
        };

        serde_json::from_slice(json)
            .map_err(|e| Error::BadRequest(format!("JSON parse error - {}", e)))
    }
}

impl FromRequest for Body {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, std::result::Result<Body, actix_web::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let form = req.content_type() == "application/x-www-form-urlencoded";
        let bytes = Bytes::from_request(req, payload);

        Box::pin(async move {
            Ok(Body {
                bytes: bytes.await?,
                form,
            })
        })
    }
}

/// The path of a named route.
pub fn reverse<I: AsRef<str>>(req: &HttpRequest, name: &str, elements: &[I]) -> Result<String> {
    req.url_for(name, elements)
        .map(|url| url.path().to_owned())
        .map_err(|e| Error::Route(format!("{}: {:?}", name, e)))
}

/// `201 Created` with a `Location` header for the new object.
pub fn created<T: serde::Serialize>(location: String, body: &T) -> HttpResponse {
    HttpResponse::Created()
        .insert_header((header::LOCATION, location))
        .json(body)
}

pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/")
            .name("index")
            .route(web::get().to(index::index)),
    )
    .service(
        web::resource("/bars/")
            .name("bar-list")
            .route(web::get().to(bars::list))
            .route(web::post().to(bars::create)),
    )
    .service(
        web::resource("/bars/{id}/")
            .name("bar-detail")
            .route(web::get().to(bars::retrieve))
            .route(web::put().to(bars::update))
            .route(web::patch().to(bars::partial_update))
            .route(web::delete().to(bars::destroy)),
    )
    .service(
        web::resource("/breweries/")
            .name("brewery-list")
            .route(web::get().to(breweries::list))
            .route(web::post().to(breweries::create)),
    )
    .service(
        web::resource("/breweries/{id}/")
            .name("brewery-detail")
            .route(web::get().to(breweries::retrieve))
            .route(web::put().to(breweries::update))
            .route(web::patch().to(breweries::partial_update))
            .route(web::delete().to(breweries::destroy)),
    )
    .service(
        web::resource("/beers/")
            .name("beer-list")
            .route(web::get().to(beers::list))
            .route(web::post().to(beers::create)),
    )
    .service(
        web::resource("/beers/{id}/")
            .name("beer-detail")
            .route(web::get().to(beers::detail)),
    )
    .service(
        web::resource("/beers/{id}/star/")
            .name("beer-star")
            .route(web::put().to(beers::star))
            .route(web::delete().to(beers::unstar)),
    )
    .service(
        web::resource("/beers/{id}/rating/")
            .name("beer-rating")
            .route(web::put().to(beers::rate))
            .route(web::delete().to(beers::unrate)),
    )
    .service(
        web::resource("/accounts/login/")
            .name("login")
            .route(web::post().to(accounts::login)),
    )
    .service(
        web::resource("/accounts/logout/")
            .name("logout")
            .route(web::post().to(accounts::logout)),
    )
    .service(
        web::resource("/accounts/profile/")
            .name("profile")
            .route(web::get().to(accounts::profile)),
    );
}
