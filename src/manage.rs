//! Account administration behind the `createuser` and `grant` commands.

use super::auth;
use super::error::{Error, Result};
use super::models::User;
use super::permissions::Permission;
use super::store::Store;
use super::validation;

pub fn create_user(
    store: &dyn Store,
    username: &str,
    password: &str,
    superuser: bool,
) -> Result<User> {
    validation::check_username(username)?;
    if password.is_empty() {
        return Err(Error::BadRequest("Password may not be blank.".into()));
    }
    if store.find_user_by_username(username)?.is_some() {
        return Err(Error::BadRequest(format!("User {} already exists.", username)));
    }

    let hash = auth::hash_password(password)?;
    let user = store.create_user(username, &hash, superuser)?;
    info!("Created user {} (id {})", user.username, user.id);

    Ok(user)
}

/// Grant permissions by codename, returning those granted.
///
/// Every codename is checked before anything is granted.
pub fn grant(store: &dyn Store, username: &str, codenames: &[String]) -> Result<Vec<Permission>> {
    let perms = codenames
        .iter()
        .map(|c| c.parse::<Permission>().map_err(Error::BadRequest))
        .collect::<Result<Vec<_>>>()?;

    let user = store
        .find_user_by_username(username)?
        .ok_or_else(|| Error::BadRequest(format!("No user named {}.", username)))?;

    for perm in &perms {
        store.grant_permission(user.id, *perm)?;
        info!("Granted {} to {}", perm, user.username);
    }

    Ok(perms)
}
