//! Persistence operations used by the HTTP layer and the command line.
//!
//! [`Store`] is synchronous; handlers reach it through [`execute`], which
//! moves the call onto actix-web's blocking thread pool.

use std::sync::Arc;

use actix_web::web;
use chrono::{DateTime, Utc};

use super::error::Result;
use super::models::{
    Bar, BarChanges, Beer, BeerDetail, BeerListing, Brewery, BreweryChanges, NewBeer, RatedBeer,
    User, UserRecord,
};
use super::permissions::Permission;
use super::validation::Rating;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

pub trait Store: Send + Sync {
    /*************************************/
    /** Users, permissions, sessions    **/
    /*************************************/

    fn create_user(&self, username: &str, password_hash: &str, is_superuser: bool)
        -> Result<User>;

    fn find_user_by_username(&self, username: &str) -> Result<Option<UserRecord>>;

    /// Grant a permission; granting one already held has no effect.
    fn grant_permission(&self, user_id: i32, perm: Permission) -> Result<()>;

    fn create_session(&self, token: &str, user_id: i32, expires_at: DateTime<Utc>) -> Result<()>;

    /// The user owning an unexpired session.
    fn session_user(&self, token: &str, now: DateTime<Utc>) -> Result<Option<User>>;

    fn delete_session(&self, token: &str) -> Result<()>;

    /// Remove sessions that expired before `now`, returning how many went.
    fn purge_sessions(&self, now: DateTime<Utc>) -> Result<usize>;

    /*************************************/
    /** Bars                            **/
    /*************************************/

    fn list_bars(&self) -> Result<Vec<Bar>>;

    fn get_bar(&self, id: i32) -> Result<Option<Bar>>;

    fn create_bar(&self, name: &str) -> Result<Bar>;

    fn update_bar(&self, id: i32, changes: &BarChanges) -> Result<Option<Bar>>;

    /// Delete a bar and, with it, its beers. `false` if it did not exist.
    fn delete_bar(&self, id: i32) -> Result<bool>;

    /*************************************/
    /** Breweries                       **/
    /*************************************/

    fn list_breweries(&self) -> Result<Vec<Brewery>>;

    fn get_brewery(&self, id: i32) -> Result<Option<Brewery>>;

    fn create_brewery(&self, name: &str, location: &str) -> Result<Brewery>;

    fn update_brewery(&self, id: i32, changes: &BreweryChanges) -> Result<Option<Brewery>>;

    fn delete_brewery(&self, id: i32) -> Result<bool>;

    /*************************************/
    /** Beers                           **/
    /*************************************/

    fn create_beer(&self, beer: &NewBeer) -> Result<Beer>;

    fn beer_exists(&self, id: i32) -> Result<bool>;

    /// Every beer ordered by id, annotated with `starred` when a viewer is given.
    fn list_beers(&self, viewer: Option<i32>) -> Result<Vec<BeerListing>>;

    fn beer_detail(&self, id: i32, viewer: Option<i32>) -> Result<Option<BeerDetail>>;

    /*************************************/
    /** Stars and ratings               **/
    /*************************************/

    fn star_beer(&self, user_id: i32, beer_id: i32) -> Result<()>;

    fn unstar_beer(&self, user_id: i32, beer_id: i32) -> Result<()>;

    /// Create or replace the user's rating of a beer.
    fn rate_beer(&self, user_id: i32, beer_id: i32, rating: Rating) -> Result<()>;

    fn unrate_beer(&self, user_id: i32, beer_id: i32) -> Result<()>;

    fn starred_beers(&self, user_id: i32) -> Result<Vec<BeerListing>>;

    fn rated_beers(&self, user_id: i32) -> Result<Vec<RatedBeer>>;
}

pub type SharedStore = Arc<dyn Store>;

/// Run `query` against the store on the blocking thread pool.
pub async fn execute<F, T>(store: &SharedStore, query: F) -> Result<T>
where
    F: FnOnce(&dyn Store) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let store = store.clone();

    web::block(move || query(store.as_ref())).await?
}
