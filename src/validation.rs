use std::collections::BTreeMap;

use regex::Regex;
use serde_json::Value;

use super::error::{Error, Result};

pub const MAX_NAME_LENGTH: usize = 200;
pub const MAX_USERNAME_LENGTH: usize = 150;

lazy_static! {
    static ref USERNAME_RE: Regex = Regex::new(r"^[\w.@+-]+$").unwrap();
    static ref TRAILING_ZEROS_RE: Regex = Regex::new(r"\.0*\s*$").unwrap();
}

/// Validation messages keyed by field name.
///
/// Serializes as `{"field": ["message", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> FieldErrors {
        FieldErrors::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> FieldErrors {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_insert_with(Vec::new)
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(value)` when no errors were recorded.
    pub fn finish<T>(self, value: T) -> Result<T> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(Error::Validation(self))
        }
    }
}

/// A beer rating, always within `Rating::MIN..=Rating::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Rating(i16);

impl Rating {
    pub const MIN: i16 = 1;
    pub const MAX: i16 = 5;

    pub fn new(value: i64) -> std::result::Result<Rating, String> {
        if value < i64::from(Rating::MIN) {
            Err(format!(
                "Ensure this value is greater than or equal to {}.",
                Rating::MIN
            ))
        } else if value > i64::from(Rating::MAX) {
            Err(format!(
                "Ensure this value is less than or equal to {}.",
                Rating::MAX
            ))
        } else {
            Ok(Rating(value as i16))
        }
    }

    /// Parse a rating out of a loosely typed request field.
    ///
    /// Integers and integer strings are accepted, which covers both JSON and
    /// form bodies. So are values with a zero fraction, such as `3.0`.
    pub fn from_field(value: Option<&Value>) -> Result<Rating> {
        let number = match value {
            None | Some(Value::Null) => {
                return Err(Error::Validation(FieldErrors::single(
                    "rating",
                    "This field is required.",
                )))
            }
            Some(Value::Number(n)) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            Some(Value::String(s)) => TRAILING_ZEROS_RE
                .replace(s, "")
                .trim()
                .parse::<i64>()
                .ok(),
            Some(_) => None,
        };

        let number = number.ok_or_else(|| {
            Error::Validation(FieldErrors::single("rating", "A valid integer is required."))
        })?;

        Rating::new(number).map_err(|msg| Error::Validation(FieldErrors::single("rating", msg)))
    }

    pub fn value(self) -> i16 {
        self.0
    }
}

/// Check a required text field, recording any problem in `errors`.
pub fn check_text(errors: &mut FieldErrors, field: &str, value: Option<&str>) {
    match value {
        None => errors.add(field, "This field is required."),
        Some(v) => check_present_text(errors, field, v),
    }
}

/// Check a text field that was supplied (e.g. in a partial update).
pub fn check_present_text(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, "This field may not be blank.");
    } else if value.chars().count() > MAX_NAME_LENGTH {
        errors.add(
            field,
            format!(
                "Ensure this field has no more than {} characters.",
                MAX_NAME_LENGTH
            ),
        );
    }
}

pub fn check_username(username: &str) -> Result<()> {
    let mut errors = FieldErrors::new();

    if username.is_empty() {
        errors.add("username", "This field may not be blank.");
    } else if username.chars().count() > MAX_USERNAME_LENGTH {
        errors.add(
            "username",
            format!(
                "Ensure this field has no more than {} characters.",
                MAX_USERNAME_LENGTH
            ),
        );
    } else if !USERNAME_RE.is_match(username) {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }

    errors.finish(())
}

/// Mean of a set of ratings, `None` when there are none.
pub fn average(ratings: &[i16]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }

    let total: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
    Some(total as f64 / ratings.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rating_error(value: Value) -> Vec<String> {
        match Rating::from_field(Some(&value)) {
            Err(Error::Validation(errors)) => errors.get("rating").unwrap().to_vec(),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn rating_bounds() {
        assert!(Rating::new(0).is_err());
        assert_eq!(Rating::new(1).unwrap().value(), 1);
        assert_eq!(Rating::new(5).unwrap().value(), 5);
        assert!(Rating::new(6).is_err());
        assert!(Rating::new(-3).is_err());
    }

    #[test]
    fn rating_from_json_and_form_values() {
        assert_eq!(Rating::from_field(Some(&json!(4))).unwrap().value(), 4);
        assert_eq!(Rating::from_field(Some(&json!("2"))).unwrap().value(), 2);
        assert_eq!(Rating::from_field(Some(&json!(5.0))).unwrap().value(), 5);
        assert_eq!(Rating::from_field(Some(&json!("5.0"))).unwrap().value(), 5);
        assert_eq!(Rating::from_field(Some(&json!(" 3.00 "))).unwrap().value(), 3);
    }

    #[test]
    fn rating_field_messages() {
        assert_eq!(
            rating_error(json!(0)),
            vec!["Ensure this value is greater than or equal to 1."]
        );
        assert_eq!(
            rating_error(json!(9)),
            vec!["Ensure this value is less than or equal to 5."]
        );
        assert_eq!(rating_error(json!("five")), vec!["A valid integer is required."]);
        assert_eq!(rating_error(json!(2.5)), vec!["A valid integer is required."]);
        assert_eq!(rating_error(json!("2.5")), vec!["A valid integer is required."]);
        assert_eq!(
            rating_error(json!(7.0)),
            vec!["Ensure this value is less than or equal to 5."]
        );
        assert_eq!(rating_error(Value::Null), vec!["This field is required."]);
    }

    #[test]
    fn text_checks() {
        let mut errors = FieldErrors::new();
        check_text(&mut errors, "name", Some("The Test Bar"));
        assert!(errors.is_empty());

        check_text(&mut errors, "name", None);
        check_text(&mut errors, "location", Some("   "));
        check_present_text(&mut errors, "other", &"x".repeat(MAX_NAME_LENGTH + 1));

        assert_eq!(errors.get("name").unwrap(), &["This field is required.".to_owned()]);
        assert_eq!(
            errors.get("location").unwrap(),
            &["This field may not be blank.".to_owned()]
        );
        assert!(errors.get("other").is_some());
    }

    #[test]
    fn field_errors_serialize_as_map() {
        let mut errors = FieldErrors::new();
        errors.add("rating", "bad");
        errors.add("rating", "worse");

        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            json!({"rating": ["bad", "worse"]})
        );
    }

    #[test]
    fn usernames() {
        assert!(check_username("ms.test+beer@fest").is_ok());
        assert!(check_username("").is_err());
        assert!(check_username("has space").is_err());
        assert!(check_username(&"a".repeat(151)).is_err());
    }

    #[test]
    fn averages() {
        assert_eq!(average(&[]), None);
        assert_eq!(average(&[4, 1]), Some(2.5));
        assert_eq!(average(&[5]), Some(5.0));
    }
}
