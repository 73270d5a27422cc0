use std::collections::HashSet;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use super::error::{Error, Result};
use super::models::{
    parse_codenames, Bar, BarChanges, Beer, BeerDetail, BeerListing, BeerRow, Brewery,
    BreweryChanges, NewBar, NewBeer, NewBeerRating, NewBrewery, NewLoginSession, NewStarBeer,
    NewUser, NewUserPermission, RatedBeer, User, UserRecord,
};
use super::permissions::Permission;
use super::store::Store;
use super::validation::{self, Rating};

pub type Pool = r2d2::Pool<r2d2::ConnectionManager<PgConnection>>;
pub type Connection = r2d2::PooledConnection<r2d2::ConnectionManager<PgConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub fn create_pool(database_url: &str, max_size: u32) -> Result<Pool> {
    let manager = r2d2::ConnectionManager::<PgConnection>::new(database_url);

    Ok(r2d2::Pool::builder().max_size(max_size).build(manager)?)
}

/// Apply any migrations not yet run, returning the versions applied.
pub fn run_migrations(pool: &Pool) -> Result<Vec<String>> {
    let mut conn = pool.get()?;

    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| Error::MigrationError(e.to_string()))?;

    Ok(applied.iter().map(|v| v.to_string()).collect())
}

/// [`Store`] backed by PostgreSQL through a connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    pub fn new(pool: Pool) -> PgStore {
        PgStore { pool }
    }

    fn conn(&self) -> Result<Connection> {
        Ok(self.pool.get()?)
    }
}

fn user_permissions(conn: &mut PgConnection, uid: i32) -> Result<HashSet<Permission>> {
    use super::schema::user_permission::dsl::*;

    let codenames = user_permission
        .filter(user_id.eq(uid))
        .select(codename)
        .load::<String>(conn)?;

    Ok(parse_codenames(codenames))
}

/// Load beer listings ordered by id, optionally restricted to `only`.
fn load_listings(conn: &mut PgConnection, only: Option<Vec<i32>>) -> Result<Vec<BeerListing>> {
    use super::schema::{bar, beer, brewery};

    let mut query = beer::table
        .inner_join(bar::table)
        .inner_join(brewery::table)
        .select((
            beer::id,
            beer::name,
            bar::id,
            bar::name,
            brewery::id,
            brewery::name,
            brewery::location,
        ))
        .order(beer::id.asc())
        .into_boxed::<diesel::pg::Pg>();

    if let Some(ids) = only {
        query = query.filter(beer::id.eq_any(ids));
    }

    let rows = query.load::<BeerRow>(conn)?;

    Ok(rows.into_iter().map(BeerListing::from_row).collect())
}

fn starred_ids(conn: &mut PgConnection, uid: i32) -> Result<HashSet<i32>> {
    use super::schema::star_beer::dsl::*;

    let ids = star_beer
        .filter(user_id.eq(uid))
        .select(beer_id)
        .load::<i32>(conn)?;

    Ok(ids.into_iter().collect())
}

impl Store for PgStore {
    fn create_user(&self, name: &str, hash: &str, superuser: bool) -> Result<User> {
        use super::schema::users::dsl::*;

        let new_user = NewUser {
            username: name,
            password_hash: hash,
            is_superuser: superuser,
        };

        let record = diesel::insert_into(users)
            .values(&new_user)
            .get_result::<UserRecord>(&mut self.conn()?)?;

        Ok(record.into_user(HashSet::new()))
    }

    fn find_user_by_username(&self, name: &str) -> Result<Option<UserRecord>> {
        use super::schema::users::dsl::*;

        Ok(users
            .filter(username.eq(name))
            .first::<UserRecord>(&mut self.conn()?)
            .optional()?)
    }

    fn grant_permission(&self, uid: i32, perm: Permission) -> Result<()> {
        use super::schema::user_permission::dsl::*;

        diesel::insert_into(user_permission)
            .values(&NewUserPermission {
                user_id: uid,
                codename: perm.codename(),
            })
            .on_conflict_do_nothing()
            .execute(&mut self.conn()?)?;

        Ok(())
    }

    fn create_session(&self, token: &str, uid: i32, expires: DateTime<Utc>) -> Result<()> {
        use super::schema::login_session::dsl::*;

        diesel::insert_into(login_session)
            .values(&NewLoginSession {
                id: token,
                user_id: uid,
                expires_at: expires,
            })
            .execute(&mut self.conn()?)?;

        Ok(())
    }

    fn session_user(&self, token: &str, now: DateTime<Utc>) -> Result<Option<User>> {
        use super::schema::{login_session, users};

        let mut conn = self.conn()?;

        let record = users::table
            .inner_join(login_session::table)
            .filter(login_session::id.eq(token))
            .filter(login_session::expires_at.gt(now))
            .select((
                users::id,
                users::username,
                users::password_hash,
                users::is_superuser,
                users::date_joined,
            ))
            .first::<UserRecord>(&mut conn)
            .optional()?;

        match record {
            Some(record) => {
                let perms = user_permissions(&mut conn, record.id)?;
                Ok(Some(record.into_user(perms)))
            }
            None => Ok(None),
        }
    }

    fn delete_session(&self, token: &str) -> Result<()> {
        use super::schema::login_session::dsl::*;

        diesel::delete(login_session.filter(id.eq(token))).execute(&mut self.conn()?)?;

        Ok(())
    }

    fn purge_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        use super::schema::login_session::dsl::*;

        Ok(diesel::delete(login_session.filter(expires_at.le(now))).execute(&mut self.conn()?)?)
    }

    fn list_bars(&self) -> Result<Vec<Bar>> {
        use super::schema::bar::dsl::*;

        Ok(bar.order(id.asc()).load::<Bar>(&mut self.conn()?)?)
    }

    fn get_bar(&self, bar_id: i32) -> Result<Option<Bar>> {
        use super::schema::bar::dsl::*;

        Ok(bar.find(bar_id).first::<Bar>(&mut self.conn()?).optional()?)
    }

    fn create_bar(&self, bar_name: &str) -> Result<Bar> {
        use super::schema::bar::dsl::*;

        Ok(diesel::insert_into(bar)
            .values(&NewBar { name: bar_name })
            .get_result(&mut self.conn()?)?)
    }

    fn update_bar(&self, bar_id: i32, changes: &BarChanges) -> Result<Option<Bar>> {
        use super::schema::bar::dsl::*;

        if changes.name.is_none() {
            return self.get_bar(bar_id);
        }

        Ok(diesel::update(bar.find(bar_id))
            .set(changes)
            .get_result::<Bar>(&mut self.conn()?)
            .optional()?)
    }

    fn delete_bar(&self, bar_id: i32) -> Result<bool> {
        use super::schema::bar::dsl::*;

        let deleted = diesel::delete(bar.find(bar_id)).execute(&mut self.conn()?)?;

        Ok(deleted > 0)
    }

    fn list_breweries(&self) -> Result<Vec<Brewery>> {
        use super::schema::brewery::dsl::*;

        Ok(brewery.order(id.asc()).load::<Brewery>(&mut self.conn()?)?)
    }

    fn get_brewery(&self, brewery_id: i32) -> Result<Option<Brewery>> {
        use super::schema::brewery::dsl::*;

        Ok(brewery
            .find(brewery_id)
            .first::<Brewery>(&mut self.conn()?)
            .optional()?)
    }

    fn create_brewery(&self, brewery_name: &str, brewery_location: &str) -> Result<Brewery> {
        use super::schema::brewery::dsl::*;

        Ok(diesel::insert_into(brewery)
            .values(&NewBrewery {
                name: brewery_name,
                location: brewery_location,
            })
            .get_result(&mut self.conn()?)?)
    }

    fn update_brewery(&self, brewery_id: i32, changes: &BreweryChanges) -> Result<Option<Brewery>> {
        use super::schema::brewery::dsl::*;

        if changes.name.is_none() && changes.location.is_none() {
            return self.get_brewery(brewery_id);
        }

        Ok(diesel::update(brewery.find(brewery_id))
            .set(changes)
            .get_result::<Brewery>(&mut self.conn()?)
            .optional()?)
    }

    fn delete_brewery(&self, brewery_id: i32) -> Result<bool> {
        use super::schema::brewery::dsl::*;

        let deleted = diesel::delete(brewery.find(brewery_id)).execute(&mut self.conn()?)?;

        Ok(deleted > 0)
    }

    fn create_beer(&self, new_beer: &NewBeer) -> Result<Beer> {
        use super::schema::beer::dsl::*;

        Ok(diesel::insert_into(beer)
            .values(new_beer)
            .get_result(&mut self.conn()?)?)
    }

    fn beer_exists(&self, beer_id: i32) -> Result<bool> {
        use super::schema::beer::dsl::*;

        Ok(diesel::select(diesel::dsl::exists(beer.find(beer_id)))
            .get_result::<bool>(&mut self.conn()?)?)
    }

    fn list_beers(&self, viewer: Option<i32>) -> Result<Vec<BeerListing>> {
        let mut conn = self.conn()?;
        let mut listings = load_listings(&mut conn, None)?;

        if let Some(uid) = viewer {
            let starred = starred_ids(&mut conn, uid)?;
            for listing in listings.iter_mut() {
                listing.starred = Some(starred.contains(&listing.id));
            }
        }

        Ok(listings)
    }

    fn beer_detail(&self, beer_id: i32, viewer: Option<i32>) -> Result<Option<BeerDetail>> {
        use super::schema::{beer_rating, star_beer};

        let mut conn = self.conn()?;

        let listing = match load_listings(&mut conn, Some(vec![beer_id]))?.pop() {
            Some(listing) => listing,
            None => return Ok(None),
        };

        let stars = star_beer::table
            .filter(star_beer::beer_id.eq(beer_id))
            .select(star_beer::user_id)
            .load::<i32>(&mut conn)?;

        let ratings = beer_rating::table
            .filter(beer_rating::beer_id.eq(beer_id))
            .select((beer_rating::user_id, beer_rating::rating))
            .load::<(i32, i16)>(&mut conn)?;

        let values: Vec<i16> = ratings.iter().map(|&(_, r)| r).collect();

        Ok(Some(BeerDetail {
            beer: listing,
            starred: viewer.map_or(false, |uid| stars.contains(&uid)),
            num_stars: stars.len() as i64,
            rating: viewer.and_then(|uid| {
                ratings
                    .iter()
                    .find(|&&(user, _)| user == uid)
                    .map(|&(_, r)| r)
            }),
            avg_rating: validation::average(&values),
        }))
    }

    fn star_beer(&self, uid: i32, bid: i32) -> Result<()> {
        use super::schema::star_beer::dsl::*;

        diesel::insert_into(star_beer)
            .values(&NewStarBeer {
                user_id: uid,
                beer_id: bid,
            })
            .on_conflict((user_id, beer_id))
            .do_nothing()
            .execute(&mut self.conn()?)?;

        Ok(())
    }

    fn unstar_beer(&self, uid: i32, bid: i32) -> Result<()> {
        use super::schema::star_beer::dsl::*;

        diesel::delete(star_beer.filter(user_id.eq(uid)).filter(beer_id.eq(bid)))
            .execute(&mut self.conn()?)?;

        Ok(())
    }

    fn rate_beer(&self, uid: i32, bid: i32, value: Rating) -> Result<()> {
        use super::schema::beer_rating::dsl::*;

        diesel::insert_into(beer_rating)
            .values(&NewBeerRating {
                user_id: uid,
                beer_id: bid,
                rating: value.value(),
            })
            .on_conflict((user_id, beer_id))
            .do_update()
            .set(rating.eq(value.value()))
            .execute(&mut self.conn()?)?;

        Ok(())
    }

    fn unrate_beer(&self, uid: i32, bid: i32) -> Result<()> {
        use super::schema::beer_rating::dsl::*;

        diesel::delete(beer_rating.filter(user_id.eq(uid)).filter(beer_id.eq(bid)))
            .execute(&mut self.conn()?)?;

        Ok(())
    }

    fn starred_beers(&self, uid: i32) -> Result<Vec<BeerListing>> {
        let mut conn = self.conn()?;
        let ids: Vec<i32> = starred_ids(&mut conn, uid)?.into_iter().collect();

        let mut listings = load_listings(&mut conn, Some(ids))?;
        for listing in listings.iter_mut() {
            listing.starred = Some(true);
        }

        Ok(listings)
    }

    fn rated_beers(&self, uid: i32) -> Result<Vec<RatedBeer>> {
        use super::schema::{beer, beer_rating};

        Ok(beer_rating::table
            .inner_join(beer::table)
            .filter(beer_rating::user_id.eq(uid))
            .select((beer::id, beer::name, beer_rating::rating))
            .order(beer::id.asc())
            .load::<RatedBeer>(&mut self.conn()?)?)
    }
}
