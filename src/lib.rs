#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate derive_more;
#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod manage;
pub mod models;
pub mod permissions;
pub mod schema;
pub mod state;
pub mod store;
pub mod validation;

pub use self::config::Settings;
pub use self::error::{Error, Result};
pub use self::state::AppState;
