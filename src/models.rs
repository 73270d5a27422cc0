use std::collections::HashSet;

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::permissions::{Action, Model, Permission};
use super::schema::*;

#[derive(Debug, Clone, PartialEq, Serialize, Queryable, Identifiable)]
#[diesel(table_name = bar)]
pub struct Bar {
    pub id: i32,
    pub name: String,
}

#[derive(Insertable)]
#[diesel(table_name = bar)]
pub struct NewBar<'a> {
    pub name: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, AsChangeset)]
#[diesel(table_name = bar)]
pub struct BarChanges {
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Queryable, Identifiable)]
#[diesel(table_name = brewery)]
pub struct Brewery {
    pub id: i32,
    pub name: String,
    pub location: String,
}

#[derive(Insertable)]
#[diesel(table_name = brewery)]
pub struct NewBrewery<'a> {
    pub name: &'a str,
    pub location: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, AsChangeset)]
#[diesel(table_name = brewery)]
pub struct BreweryChanges {
    pub name: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Queryable, Identifiable)]
#[diesel(table_name = beer)]
pub struct Beer {
    pub id: i32,
    pub name: String,
    #[serde(rename = "bar")]
    pub bar_id: i32,
    #[serde(rename = "brewery")]
    pub brewery_id: i32,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = beer)]
pub struct NewBeer {
    pub name: String,
    pub bar_id: i32,
    pub brewery_id: i32,
}

#[derive(Insertable)]
#[diesel(table_name = star_beer)]
pub struct NewStarBeer {
    pub user_id: i32,
    pub beer_id: i32,
}

#[derive(Insertable)]
#[diesel(table_name = beer_rating)]
pub struct NewBeerRating {
    pub user_id: i32,
    pub beer_id: i32,
    pub rating: i16,
}

/// A stored user, including credentials. Never serialized.
#[derive(Debug, Clone, Queryable)]
pub struct UserRecord {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub password_hash: &'a str,
    pub is_superuser: bool,
}

#[derive(Insertable)]
#[diesel(table_name = user_permission)]
pub struct NewUserPermission {
    pub user_id: i32,
    pub codename: String,
}

#[derive(Insertable)]
#[diesel(table_name = login_session)]
pub struct NewLoginSession<'a> {
    pub id: &'a str,
    pub user_id: i32,
    pub expires_at: DateTime<Utc>,
}

/// An authenticated user together with their model permissions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub is_superuser: bool,
    #[serde(skip)]
    pub permissions: HashSet<Permission>,
}

impl User {
    pub fn has_perm(&self, perm: Permission) -> bool {
        self.is_superuser || self.permissions.contains(&perm)
    }

    pub fn can(&self, action: Action, model: Model) -> bool {
        self.has_perm(Permission::new(action, model))
    }
}

impl UserRecord {
    pub fn into_user(self, permissions: HashSet<Permission>) -> User {
        User {
            id: self.id,
            username: self.username,
            is_superuser: self.is_superuser,
            permissions,
        }
    }
}

/// Parse stored codenames, skipping any the application no longer knows.
pub fn parse_codenames<I: IntoIterator<Item = String>>(codenames: I) -> HashSet<Permission> {
    codenames
        .into_iter()
        .filter_map(|c| match c.parse() {
            Ok(perm) => Some(perm),
            Err(e) => {
                warn!("{}", e);
                None
            }
        })
        .collect()
}

/// A beer as shown in listings, with its bar and brewery expanded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeerListing {
    pub id: i32,
    pub name: String,
    pub bar: Bar,
    pub brewery: Brewery,

    /// Whether the viewing user starred this beer; absent for anonymous viewers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starred: Option<bool>,
}

/// Row shape of the beer/bar/brewery join.
pub type BeerRow = (i32, String, i32, String, i32, String, String);

impl BeerListing {
    pub fn from_row(row: BeerRow) -> BeerListing {
        let (id, name, bar_id, bar_name, brewery_id, brewery_name, location) = row;
        BeerListing {
            id,
            name,
            bar: Bar {
                id: bar_id,
                name: bar_name,
            },
            brewery: Brewery {
                id: brewery_id,
                name: brewery_name,
                location,
            },
            starred: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeerDetail {
    pub beer: BeerListing,
    pub starred: bool,
    pub num_stars: i64,
    pub rating: Option<i16>,
    pub avg_rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Queryable)]
pub struct RatedBeer {
    pub id: i32,
    pub name: String,
    pub rating: i16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub user: User,
    pub starred_beers: Vec<BeerListing>,
    pub rated_beers: Vec<RatedBeer>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(is_superuser: bool, perms: &[&str]) -> User {
        User {
            id: 1,
            username: "test".to_owned(),
            is_superuser,
            permissions: parse_codenames(perms.iter().map(|p| p.to_string())),
        }
    }

    #[test]
    fn superusers_hold_every_permission() {
        let admin = user(true, &[]);
        assert!(admin.can(Action::Delete, Model::Beer));
        assert!(admin.can(Action::Add, Model::Bar));
    }

    #[test]
    fn plain_users_hold_granted_permissions_only() {
        let u = user(false, &["change_bar", "bogus"]);
        assert!(u.can(Action::Change, Model::Bar));
        assert!(!u.can(Action::Delete, Model::Bar));
        assert!(!u.can(Action::Change, Model::Brewery));
        assert_eq!(u.permissions.len(), 1);
    }

    #[test]
    fn anonymous_listing_omits_starred() {
        let listing = BeerListing::from_row((
            1,
            "IPA".into(),
            2,
            "Test Bar".into(),
            3,
            "Test Brew Co".into(),
            "Testville".into(),
        ));
        let json = serde_json::to_value(&listing).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "id": 1,
                "name": "IPA",
                "bar": {"id": 2, "name": "Test Bar"},
                "brewery": {"id": 3, "name": "Test Brew Co", "location": "Testville"},
            })
        );
    }
}
