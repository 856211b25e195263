//! Insert form parsing and validation.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::Serialize;

use crate::http::RequestContext;

pub const FIELD_NAME: &str = "name";
pub const FIELD_DATE_EXPIRY: &str = "date-expiry";

const NAME_PATTERN_SOURCE: &str = r#"^[a-zA-Z0-9 \-_"',.]+$"#;

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(NAME_PATTERN_SOURCE).expect("name pattern compiles"));

/// Accepted shapes of a local date-time, most precise first.
const LOCAL_DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Raw form fields of `POST /`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertForm {
    pub name: Option<String>,
    pub date_expiry: Option<String>,
}

impl InsertForm {
    pub fn from_request(ctx: &RequestContext) -> Self {
        Self {
            name: ctx.param(FIELD_NAME).map(str::to_string),
            date_expiry: ctx.param(FIELD_DATE_EXPIRY).map(str::to_string),
        }
    }
}

/// One failed constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Form field the message refers to.
    #[serde(rename = "path")]
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Validates an insert form. Pluggable so tests and deployments can
/// tighten or relax rules.
pub trait FormValidator: Send + Sync {
    fn validate(&self, form: &InsertForm) -> Vec<Violation>;
}

/// Default rules: a non-blank name from a restricted alphabet and an
/// ISO-8601 local date-time expiry.
#[derive(Debug, Clone, Copy, Default)]
pub struct InsertFormValidator;

impl FormValidator for InsertFormValidator {
    fn validate(&self, form: &InsertForm) -> Vec<Violation> {
        let mut violations = Vec::new();

        // Each rule reports on its own; an empty name breaks both.
        match form.name.as_deref() {
            None => violations.push(Violation::new(FIELD_NAME, "must not be blank")),
            Some(name) => {
                if name.trim().is_empty() {
                    violations.push(Violation::new(FIELD_NAME, "must not be blank"));
                }
                if !NAME_PATTERN.is_match(name) {
                    violations.push(Violation::new(
                        FIELD_NAME,
                        format!("must match \"{}\"", NAME_PATTERN_SOURCE),
                    ));
                }
            }
        }

        match form.date_expiry.as_deref() {
            None => violations.push(Violation::new(FIELD_DATE_EXPIRY, "must not be null")),
            Some(value) if parse_local_date_time(value).is_none() => violations.push(
                Violation::new(FIELD_DATE_EXPIRY, "must be an ISO-8601 local date-time"),
            ),
            Some(_) => {}
        }

        violations
    }
}

/// Parse `YYYY-MM-DDTHH:MM[:SS[.fraction]]`.
pub fn parse_local_date_time(value: &str) -> Option<NaiveDateTime> {
    LOCAL_DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}
