//! In-memory [`Store`] for tests.
//!
//! Mirrors the PostgreSQL store's semantics: sequential ids starting at 1,
//! cascading deletes, and unique (user, beer) stars and ratings.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::Store;
use crate::error::{Error, Result};
use crate::models::{
    parse_codenames, Bar, BarChanges, Beer, BeerDetail, BeerListing, Brewery, BreweryChanges,
    NewBeer, RatedBeer, User, UserRecord,
};
use crate::permissions::Permission;
use crate::validation::{self, Rating};

#[derive(Default)]
struct Tables {
    next_id: BTreeMap<&'static str, i32>,
    bars: BTreeMap<i32, Bar>,
    breweries: BTreeMap<i32, Brewery>,
    beers: BTreeMap<i32, Beer>,
    users: BTreeMap<i32, UserRecord>,
    permissions: BTreeSet<(i32, String)>,
    sessions: BTreeMap<String, (i32, DateTime<Utc>)>,
    stars: BTreeSet<(i32, i32)>,
    ratings: BTreeMap<(i32, i32), i16>,
}

impl Tables {
    fn next_id(&mut self, table: &'static str) -> i32 {
        let id = self.next_id.entry(table).or_insert(0);
        *id += 1;
        *id
    }

    fn listing(&self, beer: &Beer) -> Result<BeerListing> {
        let bar = self.bars.get(&beer.bar_id).ok_or(Error::NotFound)?;
        let brewery = self.breweries.get(&beer.brewery_id).ok_or(Error::NotFound)?;

        Ok(BeerListing {
            id: beer.id,
            name: beer.name.clone(),
            bar: bar.clone(),
            brewery: brewery.clone(),
            starred: None,
        })
    }

    fn remove_beers_where<F: Fn(&Beer) -> bool>(&mut self, doomed: F) {
        let ids: HashSet<i32> = self
            .beers
            .values()
            .filter(|b| doomed(b))
            .map(|b| b.id)
            .collect();

        self.beers.retain(|id, _| !ids.contains(id));
        self.stars.retain(|(_, beer)| !ids.contains(beer));
        self.ratings.retain(|(_, beer), _| !ids.contains(beer));
    }

    fn user(&self, record: &UserRecord) -> User {
        let codenames = self
            .permissions
            .iter()
            .filter(|(uid, _)| *uid == record.id)
            .map(|(_, codename)| codename.clone());

        record.clone().into_user(parse_codenames(codenames))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| Error::Poisoned)
    }
}

impl Store for MemoryStore {
    fn create_user(&self, username: &str, password_hash: &str, is_superuser: bool) -> Result<User> {
        let mut t = self.lock()?;

        if t.users.values().any(|u| u.username == username) {
            return Err(Error::BadRequest(
                "A user with that username already exists.".to_owned(),
            ));
        }

        let id = t.next_id("users");
        let record = UserRecord {
            id,
            username: username.to_owned(),
            password_hash: password_hash.to_owned(),
            is_superuser,
            date_joined: Utc::now(),
        };
        t.users.insert(id, record.clone());

        Ok(record.into_user(HashSet::new()))
    }

    fn find_user_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        let t = self.lock()?;

        Ok(t.users.values().find(|u| u.username == username).cloned())
    }

    fn grant_permission(&self, user_id: i32, perm: Permission) -> Result<()> {
        let mut t = self.lock()?;

        if !t.users.contains_key(&user_id) {
            return Err(Error::NotFound);
        }
        t.permissions.insert((user_id, perm.codename()));

        Ok(())
    }

    fn create_session(&self, token: &str, user_id: i32, expires_at: DateTime<Utc>) -> Result<()> {
        let mut t = self.lock()?;

        if !t.users.contains_key(&user_id) {
            return Err(Error::NotFound);
        }
        t.sessions.insert(token.to_owned(), (user_id, expires_at));

        Ok(())
    }

    fn session_user(&self, token: &str, now: DateTime<Utc>) -> Result<Option<User>> {
        let t = self.lock()?;

        Ok(t.sessions
            .get(token)
            .filter(|(_, expires_at)| *expires_at > now)
            .and_then(|(user_id, _)| t.users.get(user_id))
            .map(|record| t.user(record)))
    }

    fn delete_session(&self, token: &str) -> Result<()> {
        self.lock()?.sessions.remove(token);

        Ok(())
    }

    fn purge_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut t = self.lock()?;
        let before = t.sessions.len();
        t.sessions.retain(|_, (_, expires_at)| *expires_at > now);

        Ok(before - t.sessions.len())
    }

    fn list_bars(&self) -> Result<Vec<Bar>> {
        Ok(self.lock()?.bars.values().cloned().collect())
    }

    fn get_bar(&self, id: i32) -> Result<Option<Bar>> {
        Ok(self.lock()?.bars.get(&id).cloned())
    }

    fn create_bar(&self, name: &str) -> Result<Bar> {
        let mut t = self.lock()?;
        let id = t.next_id("bar");
        let bar = Bar {
            id,
            name: name.to_owned(),
        };
        t.bars.insert(id, bar.clone());

        Ok(bar)
    }

    fn update_bar(&self, id: i32, changes: &BarChanges) -> Result<Option<Bar>> {
        let mut t = self.lock()?;

        Ok(t.bars.get_mut(&id).map(|bar| {
            if let Some(name) = &changes.name {
                bar.name = name.clone();
            }
            bar.clone()
        }))
    }

    fn delete_bar(&self, id: i32) -> Result<bool> {
        let mut t = self.lock()?;

        if t.bars.remove(&id).is_none() {
            return Ok(false);
        }
        t.remove_beers_where(|b| b.bar_id == id);

        Ok(true)
    }

    fn list_breweries(&self) -> Result<Vec<Brewery>> {
        Ok(self.lock()?.breweries.values().cloned().collect())
    }

    fn get_brewery(&self, id: i32) -> Result<Option<Brewery>> {
        Ok(self.lock()?.breweries.get(&id).cloned())
    }

    fn create_brewery(&self, name: &str, location: &str) -> Result<Brewery> {
        let mut t = self.lock()?;
        let id = t.next_id("brewery");
        let brewery = Brewery {
            id,
            name: name.to_owned(),
            location: location.to_owned(),
        };
        t.breweries.insert(id, brewery.clone());

        Ok(brewery)
    }

    fn update_brewery(&self, id: i32, changes: &BreweryChanges) -> Result<Option<Brewery>> {
        let mut t = self.lock()?;

        Ok(t.breweries.get_mut(&id).map(|brewery| {
            if let Some(name) = &changes.name {
                brewery.name = name.clone();
            }
            if let Some(location) = &changes.location {
                brewery.location = location.clone();
            }
            brewery.clone()
        }))
    }

    fn delete_brewery(&self, id: i32) -> Result<bool> {
        let mut t = self.lock()?;

        if t.breweries.remove(&id).is_none() {
            return Ok(false);
        }
        t.remove_beers_where(|b| b.brewery_id == id);

        Ok(true)
    }

    fn create_beer(&self, beer: &NewBeer) -> Result<Beer> {
        let mut t = self.lock()?;

        // Foreign keys.
        if !t.bars.contains_key(&beer.bar_id) || !t.breweries.contains_key(&beer.brewery_id) {
            return Err(Error::NotFound);
        }

        let id = t.next_id("beer");
        let created = Beer {
            id,
            name: beer.name.clone(),
            bar_id: beer.bar_id,
            brewery_id: beer.brewery_id,
        };
        t.beers.insert(id, created.clone());

        Ok(created)
    }

    fn beer_exists(&self, id: i32) -> Result<bool> {
        Ok(self.lock()?.beers.contains_key(&id))
    }

    fn list_beers(&self, viewer: Option<i32>) -> Result<Vec<BeerListing>> {
        let t = self.lock()?;

        t.beers
            .values()
            .map(|beer| {
                let mut listing = t.listing(beer)?;
                listing.starred = viewer.map(|uid| t.stars.contains(&(uid, beer.id)));
                Ok(listing)
            })
            .collect()
    }

    fn beer_detail(&self, id: i32, viewer: Option<i32>) -> Result<Option<BeerDetail>> {
        let t = self.lock()?;

        let beer = match t.beers.get(&id) {
            Some(beer) => beer,
            None => return Ok(None),
        };

        let ratings: Vec<i16> = t
            .ratings
            .iter()
            .filter(|((_, beer_id), _)| *beer_id == id)
            .map(|(_, &rating)| rating)
            .collect();

        Ok(Some(BeerDetail {
            beer: t.listing(beer)?,
            starred: viewer.map_or(false, |uid| t.stars.contains(&(uid, id))),
            num_stars: t.stars.iter().filter(|(_, beer_id)| *beer_id == id).count() as i64,
            rating: viewer.and_then(|uid| t.ratings.get(&(uid, id)).copied()),
            avg_rating: validation::average(&ratings),
        }))
    }

    fn star_beer(&self, user_id: i32, beer_id: i32) -> Result<()> {
        let mut t = self.lock()?;

        if !t.beers.contains_key(&beer_id) || !t.users.contains_key(&user_id) {
            return Err(Error::NotFound);
        }
        t.stars.insert((user_id, beer_id));

        Ok(())
    }

    fn unstar_beer(&self, user_id: i32, beer_id: i32) -> Result<()> {
        self.lock()?.stars.remove(&(user_id, beer_id));

        Ok(())
    }

    fn rate_beer(&self, user_id: i32, beer_id: i32, rating: Rating) -> Result<()> {
        let mut t = self.lock()?;

        if !t.beers.contains_key(&beer_id) || !t.users.contains_key(&user_id) {
            return Err(Error::NotFound);
        }
        t.ratings.insert((user_id, beer_id), rating.value());

        Ok(())
    }

    fn unrate_beer(&self, user_id: i32, beer_id: i32) -> Result<()> {
        self.lock()?.ratings.remove(&(user_id, beer_id));

        Ok(())
    }

    fn starred_beers(&self, user_id: i32) -> Result<Vec<BeerListing>> {
        let t = self.lock()?;

        t.beers
            .values()
            .filter(|beer| t.stars.contains(&(user_id, beer.id)))
            .map(|beer| {
                let mut listing = t.listing(beer)?;
                listing.starred = Some(true);
                Ok(listing)
            })
            .collect()
    }

    fn rated_beers(&self, user_id: i32) -> Result<Vec<RatedBeer>> {
        let t = self.lock()?;

        Ok(t.beers
            .values()
            .filter_map(|beer| {
                t.ratings.get(&(user_id, beer.id)).map(|&rating| RatedBeer {
                    id: beer.id,
                    name: beer.name.clone(),
                    rating,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn store_with_beer() -> (MemoryStore, User, Beer) {
        let store = MemoryStore::new();
        let user = store.create_user("test", "hash", false).unwrap();
        let bar = store.create_bar("Test Bar").unwrap();
        let brewery = store.create_brewery("Test Brew Co", "Testville").unwrap();
        let beer = store
            .create_beer(&NewBeer {
                name: "IPA".to_owned(),
                bar_id: bar.id,
                brewery_id: brewery.id,
            })
            .unwrap();

        (store, user, beer)
    }

    #[test]
    fn ids_start_at_one_per_table() {
        let store = MemoryStore::new();
        assert_eq!(store.create_bar("A").unwrap().id, 1);
        assert_eq!(store.create_bar("B").unwrap().id, 2);
        assert_eq!(store.create_brewery("C", "D").unwrap().id, 1);
    }

    #[test]
    fn deleting_a_bar_cascades_to_beers_stars_and_ratings() {
        let (store, user, beer) = store_with_beer();
        store.star_beer(user.id, beer.id).unwrap();
        store
            .rate_beer(user.id, beer.id, Rating::new(4).unwrap())
            .unwrap();

        assert!(store.delete_bar(beer.bar_id).unwrap());

        assert!(!store.beer_exists(beer.id).unwrap());
        assert!(store.starred_beers(user.id).unwrap().is_empty());
        assert!(store.rated_beers(user.id).unwrap().is_empty());
        assert!(!store.delete_bar(beer.bar_id).unwrap());
    }

    #[test]
    fn sessions_expire() {
        let (store, user, _) = store_with_beer();
        let now = Utc::now();
        store
            .create_session("live", user.id, now + Duration::hours(1))
            .unwrap();
        store
            .create_session("dead", user.id, now - Duration::hours(1))
            .unwrap();

        assert_eq!(store.session_user("live", now).unwrap().unwrap().id, user.id);
        assert!(store.session_user("dead", now).unwrap().is_none());
        assert_eq!(store.purge_sessions(now).unwrap(), 1);
        assert!(store.session_user("live", now).unwrap().is_some());
    }

    #[test]
    fn duplicate_usernames_are_rejected() {
        let store = MemoryStore::new();
        store.create_user("test", "hash", false).unwrap();
        assert!(store.create_user("test", "hash", false).is_err());
    }
}
