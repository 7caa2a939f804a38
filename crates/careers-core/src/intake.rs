//! Candidate-submitted application payloads and their validation.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::application::{Application, ApplicationDocument, ApplicationStatus};

const MAX_NAME_LEN: usize = 100;
const MAX_EMAIL_LEN: usize = 254;
const MAX_COVER_LETTER_LEN: usize = 10_000;

/// Raw intake payload as received from the public form. The position id is
/// kept as text so a malformed id is reported against its own field.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApplicationSubmission {
    #[serde(default)]
    pub position_id: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub portfolio_url: Option<String>,
    #[serde(default)]
    pub resume_url: Option<String>,
    #[serde(default)]
    pub cover_letter: Option<String>,
    #[serde(default)]
    pub documents: Vec<ApplicationDocument>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("{field} is required")]
    MissingField { field: &'static str },
    #[error("email '{value}' is not a valid address")]
    InvalidEmail { value: String },
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("position id '{value}' is not a valid identifier")]
    InvalidPositionId { value: String },
    #[error("position {position_id} is not accepting applications")]
    PositionUnavailable { position_id: Uuid },
}

impl ValidationError {
    /// The form field the failure belongs to.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingField { field } | ValidationError::TooLong { field, .. } => {
                *field
            }
            ValidationError::InvalidEmail { .. } => "email",
            ValidationError::InvalidPositionId { .. }
            | ValidationError::PositionUnavailable { .. } => "position_id",
        }
    }
}

/// A submission whose required fields are present and well-formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSubmission {
    pub position_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub linkedin_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub resume_url: Option<String>,
    pub cover_letter: Option<String>,
    pub documents: Vec<ApplicationDocument>,
    pub source: Option<String>,
}

impl ApplicationSubmission {
    /// Checks required fields in form order and normalises the payload.
    pub fn validate(self) -> Result<ValidatedSubmission, ValidationError> {
        let first_name = required(self.first_name, "first_name", MAX_NAME_LEN)?;
        let last_name = required(self.last_name, "last_name", MAX_NAME_LEN)?;
        let email = required(self.email, "email", MAX_EMAIL_LEN)?;
        let position_id = optional(self.position_id)
            .ok_or(ValidationError::MissingField { field: "position_id" })?;
        let position_id = Uuid::parse_str(&position_id)
            .map_err(|_| ValidationError::InvalidPositionId { value: position_id })?;
        if !is_valid_email(&email) {
            return Err(ValidationError::InvalidEmail { value: email });
        }

        let cover_letter = optional(self.cover_letter);
        if cover_letter
            .as_ref()
            .is_some_and(|letter| letter.chars().count() > MAX_COVER_LETTER_LEN)
        {
            return Err(ValidationError::TooLong {
                field: "cover_letter",
                max: MAX_COVER_LETTER_LEN,
            });
        }

        let documents = self
            .documents
            .into_iter()
            .filter_map(|doc| {
                let url = doc.url.trim().to_string();
                if url.is_empty() {
                    return None;
                }
                let name = match doc.name.trim() {
                    "" => "document".to_string(),
                    name => name.to_string(),
                };
                Some(ApplicationDocument { name, url })
            })
            .collect();

        Ok(ValidatedSubmission {
            position_id,
            first_name,
            last_name,
            email: email.to_ascii_lowercase(),
            phone: optional(self.phone),
            linkedin_url: optional(self.linkedin_url),
            portfolio_url: optional(self.portfolio_url),
            resume_url: optional(self.resume_url),
            cover_letter,
            documents,
            source: optional(self.source),
        })
    }
}

impl ValidatedSubmission {
    pub fn into_application(self, now: DateTime<Utc>) -> Application {
        Application {
            id: Uuid::new_v4(),
            position_id: self.position_id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            linkedin_url: self.linkedin_url,
            portfolio_url: self.portfolio_url,
            resume_url: self.resume_url,
            cover_letter: self.cover_letter,
            documents: self.documents,
            source: self.source,
            status: ApplicationStatus::Submitted,
            applied_at: now,
            last_activity_at: now,
        }
    }
}

fn required(
    value: Option<String>,
    field: &'static str,
    max: usize,
) -> Result<String, ValidationError> {
    let value = optional(value).ok_or(ValidationError::MissingField { field })?;
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(value)
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `local@domain.tld` with no whitespace and a single `@`.
pub fn is_valid_email(value: &str) -> bool {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"))
        .is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> ApplicationSubmission {
        ApplicationSubmission {
            position_id: Some(Uuid::new_v4().to_string()),
            first_name: Some(" Grace ".into()),
            last_name: Some("Hopper".into()),
            email: Some("Grace.Hopper@Example.com".into()),
            ..Default::default()
        }
    }

    #[test]
    fn email_pattern_is_basic_address_shape() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("first.last+tag@sub.example.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("spa ce@example.com"));
    }

    #[test]
    fn validate_normalises_fields() {
        let validated = submission().validate().expect("valid submission");
        assert_eq!(validated.first_name, "Grace");
        assert_eq!(validated.email, "grace.hopper@example.com");
        assert!(validated.phone.is_none());
    }

    #[test]
    fn missing_fields_are_reported_by_name() {
        let mut blank_first = submission();
        blank_first.first_name = Some("   ".into());
        assert_eq!(
            blank_first.validate().unwrap_err(),
            ValidationError::MissingField { field: "first_name" }
        );

        let mut no_last = submission();
        no_last.last_name = None;
        assert_eq!(no_last.validate().unwrap_err().field(), "last_name");

        let mut no_email = submission();
        no_email.email = None;
        assert_eq!(no_email.validate().unwrap_err().field(), "email");

        let mut no_position = submission();
        no_position.position_id = None;
        assert_eq!(
            no_position.validate().unwrap_err(),
            ValidationError::MissingField { field: "position_id" }
        );
    }

    #[test]
    fn malformed_position_id_is_reported_on_its_field() {
        let mut bad = submission();
        bad.position_id = Some("abc".into());
        let err = bad.validate().unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidPositionId {
                value: "abc".into()
            }
        );
        assert_eq!(err.field(), "position_id");

        let mut padded = submission();
        let id = Uuid::new_v4();
        padded.position_id = Some(format!(" {id} "));
        assert_eq!(padded.validate().unwrap().position_id, id);
    }

    #[test]
    fn malformed_email_is_rejected() {
        let mut bad = submission();
        bad.email = Some("not-an-email".into());
        let err = bad.validate().unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidEmail {
                value: "not-an-email".into()
            }
        );
        assert_eq!(err.field(), "email");
    }

    #[test]
    fn oversized_cover_letter_is_rejected() {
        let mut long = submission();
        long.cover_letter = Some("x".repeat(MAX_COVER_LETTER_LEN + 1));
        assert_eq!(
            long.validate().unwrap_err(),
            ValidationError::TooLong {
                field: "cover_letter",
                max: MAX_COVER_LETTER_LEN
            }
        );
    }

    #[test]
    fn blank_document_links_are_dropped() {
        let mut with_docs = submission();
        with_docs.documents = vec![
            ApplicationDocument {
                name: " ".into(),
                url: "https://files.example.com/cv.pdf".into(),
            },
            ApplicationDocument {
                name: "portfolio".into(),
                url: "  ".into(),
            },
        ];
        let validated = with_docs.validate().unwrap();
        assert_eq!(
            validated.documents,
            vec![ApplicationDocument {
                name: "document".into(),
                url: "https://files.example.com/cv.pdf".into(),
            }]
        );
    }

    #[test]
    fn validated_submission_starts_submitted() {
        let now = Utc::now();
        let app = submission().validate().unwrap().into_application(now);
        assert_eq!(app.status, ApplicationStatus::Submitted);
        assert_eq!(app.applied_at, now);
        assert_eq!(app.last_activity_at, now);
    }
}
