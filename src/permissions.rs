//! Model-level permissions.
//!
//! A permission pairs an [`Action`] with a [`Model`] and is stored by its
//! codename, e.g. `change_bar`.

use std::str::FromStr;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    #[display(fmt = "add")]
    Add,
    #[display(fmt = "change")]
    Change,
    #[display(fmt = "delete")]
    Delete,
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Model {
    #[display(fmt = "bar")]
    Bar,
    #[display(fmt = "brewery")]
    Brewery,
    #[display(fmt = "beer")]
    Beer,
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[display(fmt = "{}_{}", action, model)]
pub struct Permission {
    pub action: Action,
    pub model: Model,
}

impl Model {
    /// All three permissions on this model.
    pub fn all(self) -> [Permission; 3] {
        [
            Permission::new(Action::Add, self),
            Permission::new(Action::Change, self),
            Permission::new(Action::Delete, self),
        ]
    }
}

impl Permission {
    pub const fn new(action: Action, model: Model) -> Permission {
        Permission { action, model }
    }

    pub fn codename(&self) -> String {
        self.to_string()
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Permission, String> {
        let mut parts = s.splitn(2, '_');
        let action = match parts.next() {
            Some("add") => Action::Add,
            Some("change") => Action::Change,
            Some("delete") => Action::Delete,
            _ => return Err(format!("Unknown permission \"{}\"", s)),
        };
        let model = match parts.next() {
            Some("bar") => Model::Bar,
            Some("brewery") => Model::Brewery,
            Some("beer") => Model::Beer,
            _ => return Err(format!("Unknown permission \"{}\"", s)),
        };

        Ok(Permission::new(action, model))
    }
}
