//! Fixtures shared by the integration tests.
//!
//! Every test gets a fresh in-memory store, so ids start at 1.

#![allow(dead_code)]

use actix_web::cookie::Cookie;
use actix_web::web;
use chrono::{Duration, Utc};

use beerfest::models::{Bar, Beer, Brewery, NewBeer, User};
use beerfest::permissions::{Model, Permission};
use beerfest::store::memory::MemoryStore;
use beerfest::validation::Rating;
use beerfest::{AppState, Settings};

/// Build the application service around a fixture's state.
macro_rules! app {
    ($fest:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($fest.state.clone())
                .wrap(actix_web::middleware::NormalizePath::new(
                    actix_web::middleware::TrailingSlash::Always,
                ))
                .configure(beerfest::api::configure),
        )
        .await
    };
}

pub struct Fest {
    pub state: web::Data<AppState>,
}

impl Fest {
    pub fn new() -> Fest {
        Fest {
            state: web::Data::new(AppState::new(MemoryStore::new(), Settings::default())),
        }
    }

    pub fn create_user(&self, username: &str) -> User {
        self.state
            .store
            .create_user(username, "unusable", false)
            .unwrap()
    }

    /// A user holding every permission on `model`.
    pub fn create_admin(&self, username: &str, model: Model) -> User {
        let user = self.create_user(username);
        for perm in model.all().iter() {
            self.grant(&user, *perm);
        }
        user
    }

    pub fn grant(&self, user: &User, perm: Permission) {
        self.state.store.grant_permission(user.id, perm).unwrap();
    }

    /// A session cookie logging `user` in.
    pub fn login(&self, user: &User) -> Cookie<'static> {
        let token = format!("session-{}", user.id);
        self.state
            .store
            .create_session(&token, user.id, Utc::now() + Duration::hours(1))
            .unwrap();

        Cookie::new(beerfest::auth::SESSION_COOKIE, token)
    }

    pub fn create_bar(&self, name: &str) -> Bar {
        self.state.store.create_bar(name).unwrap()
    }

    pub fn create_brewery(&self, name: &str) -> Brewery {
        self.state.store.create_brewery(name, "Testville").unwrap()
    }

    pub fn create_beer(&self, bar: &Bar, brewery: &Brewery, name: &str) -> Beer {
        self.state
            .store
            .create_beer(&NewBeer {
                name: name.to_owned(),
                bar_id: bar.id,
                brewery_id: brewery.id,
            })
            .unwrap()
    }

    /// One bar, one brewery and a beer per name.
    pub fn create_beers(&self, names: &[&str]) -> Vec<Beer> {
        let bar = self.create_bar("Test Bar");
        let brewery = self.create_brewery("Test Brew Co");

        names
            .iter()
            .map(|name| self.create_beer(&bar, &brewery, name))
            .collect()
    }

    pub fn star_beer(&self, user: &User, beer: &Beer) {
        self.state.store.star_beer(user.id, beer.id).unwrap();
    }

    pub fn rate_beer(&self, user: &User, beer: &Beer, rating: i64) {
        self.state
            .store
            .rate_beer(user.id, beer.id, Rating::new(rating).unwrap())
            .unwrap();
    }

    pub fn is_starred(&self, user: &User, beer: &Beer) -> bool {
        self.state
            .store
            .starred_beers(user.id)
            .unwrap()
            .iter()
            .any(|b| b.id == beer.id)
    }

    pub fn rating(&self, user: &User, beer: &Beer) -> Option<i16> {
        self.state
            .store
            .rated_beers(user.id)
            .unwrap()
            .into_iter()
            .find(|b| b.id == beer.id)
            .map(|b| b.rating)
    }
}
