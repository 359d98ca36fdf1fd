//! Submission validation.
//!
//! Raw form input is turned into a record or a [`Rejection`] naming the first
//! rule it broke. Rejections are values, not errors: the caller decides
//! whether to show them.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::records::{format_timestamp, FeedbackRecord, TicketRecord};

/// Lowest accepted rating.
pub const MIN_RATING: i64 = 1;

/// Highest accepted rating.
pub const MAX_RATING: i64 = 5;

/// Why a submission was not recorded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// No rating field was sent.
    #[error("rating is missing")]
    MissingRating,

    /// The rating is not an integer.
    #[error("rating is not a whole number: {0:?}")]
    RatingNotInteger(String),

    /// The rating is outside 1..=5.
    #[error("rating {0} is outside 1..=5")]
    RatingOutOfRange(i64),

    /// The description is empty after trimming.
    #[error("description must not be empty")]
    EmptyDescription,

    /// The problem is empty after trimming.
    #[error("problem must not be empty")]
    EmptyProblem,

    /// No housing block was selected.
    #[error("housing block is missing")]
    MissingHousing,

    /// The housing block is not in the reference list.
    #[error("unknown housing block: {0:?}")]
    UnknownHousing(String),

    /// The room is empty after trimming.
    #[error("room must not be empty")]
    EmptyRoom,
}

/// Fields posted by the feedback form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackForm {
    /// Rating as typed; parsed as an integer.
    pub rating: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
}

/// Fields posted by the ticket form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketForm {
    /// What is broken.
    pub problem: Option<String>,
    /// Selected housing block, compared exactly.
    pub housing: Option<String>,
    /// Room identifier.
    pub room: Option<String>,
    /// Availability, never validated.
    pub time_available: Option<String>,
}

fn trimmed(field: Option<&String>) -> &str {
    field.map_or("", |s| s.trim())
}

/// Parse a rating: surrounding whitespace is ignored, a leading sign is
/// allowed, and digits may be grouped with single underscores (`0_3`).
///
/// # Errors
///
/// Returns a [`Rejection`] when the value is missing, not an integer, or out
/// of range.
pub fn parse_rating(raw: Option<&str>) -> Result<u8, Rejection> {
    let raw = raw.ok_or(Rejection::MissingRating)?;
    let value =
        parse_integer(raw.trim()).ok_or_else(|| Rejection::RatingNotInteger(raw.to_string()))?;
    if !(MIN_RATING..=MAX_RATING).contains(&value) {
        return Err(Rejection::RatingOutOfRange(value));
    }
    u8::try_from(value).map_err(|_| Rejection::RatingOutOfRange(value))
}

/// ASCII decimal integer with optional sign and `_` digit separators.
fn parse_integer(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if digits.is_empty() || digits.starts_with('_') || digits.ends_with('_') || digits.contains("__")
    {
        return None;
    }
    let digits: String = digits.chars().filter(|c| *c != '_').collect();
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: i64 = digits.parse().ok()?;
    Some(if negative { -value } else { value })
}

/// First value posted under `key`.
fn first_value(pairs: &[(String, String)], key: &str) -> Option<String> {
    pairs
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.clone())
}

impl FeedbackForm {
    /// Build the form from posted fields. A repeated key keeps its first
    /// value; unknown keys are ignored.
    #[must_use]
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            rating: first_value(pairs, "rating"),
            description: first_value(pairs, "description"),
        }
    }

    /// Validate the form into a record stamped with `at`.
    ///
    /// # Errors
    ///
    /// Returns the first [`Rejection`] found.
    pub fn validate(&self, at: DateTime<Utc>) -> Result<FeedbackRecord, Rejection> {
        let rating = parse_rating(self.rating.as_deref())?;
        let description = trimmed(self.description.as_ref());
        if description.is_empty() {
            return Err(Rejection::EmptyDescription);
        }
        Ok(FeedbackRecord {
            timestamp: format_timestamp(at),
            rating,
            description: description.to_string(),
        })
    }
}

impl TicketForm {
    /// Build the form from posted fields. A repeated key keeps its first
    /// value; unknown keys are ignored.
    #[must_use]
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            problem: first_value(pairs, "problem"),
            housing: first_value(pairs, "housing"),
            room: first_value(pairs, "room"),
            time_available: first_value(pairs, "time_available"),
        }
    }

    /// Validate the form against the current housing-block list.
    ///
    /// # Errors
    ///
    /// Returns the first [`Rejection`] found.
    pub fn validate(
        &self,
        housing_blocks: &[String],
        at: DateTime<Utc>,
    ) -> Result<TicketRecord, Rejection> {
        let problem = trimmed(self.problem.as_ref());
        if problem.is_empty() {
            return Err(Rejection::EmptyProblem);
        }

        let housing = self.housing.as_ref().ok_or(Rejection::MissingHousing)?;
        if !housing_blocks.iter().any(|block| block == housing) {
            return Err(Rejection::UnknownHousing(housing.clone()));
        }

        let room = trimmed(self.room.as_ref());
        if room.is_empty() {
            return Err(Rejection::EmptyRoom);
        }

        Ok(TicketRecord {
            timestamp: format_timestamp(at),
            problem: problem.to_string(),
            housing: housing.clone(),
            room: room.to_string(),
            time_available: trimmed(self.time_available.as_ref()).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::default_housing_blocks;

    fn feedback(rating: &str, description: &str) -> FeedbackForm {
        FeedbackForm {
            rating: Some(rating.to_string()),
            description: Some(description.to_string()),
        }
    }

    fn ticket(problem: &str, housing: &str, room: &str, time_available: &str) -> TicketForm {
        TicketForm {
            problem: Some(problem.to_string()),
            housing: Some(housing.to_string()),
            room: Some(room.to_string()),
            time_available: Some(time_available.to_string()),
        }
    }

    #[test]
    fn test_every_valid_rating_accepted() {
        for r in 1..=5u8 {
            let record = feedback(&r.to_string(), "fine").validate(Utc::now()).unwrap();
            assert_eq!(record.rating, r);
        }
    }

    #[test]
    fn test_rating_out_of_range() {
        assert_eq!(
            feedback("0", "fine").validate(Utc::now()),
            Err(Rejection::RatingOutOfRange(0))
        );
        assert_eq!(
            feedback("6", "fine").validate(Utc::now()),
            Err(Rejection::RatingOutOfRange(6))
        );
        assert_eq!(
            feedback("-3", "fine").validate(Utc::now()),
            Err(Rejection::RatingOutOfRange(-3))
        );
    }

    #[test]
    fn test_rating_not_integer() {
        assert_eq!(
            feedback("abc", "fine").validate(Utc::now()),
            Err(Rejection::RatingNotInteger("abc".to_string()))
        );
        assert!(matches!(
            feedback("4.5", "fine").validate(Utc::now()),
            Err(Rejection::RatingNotInteger(_))
        ));
        assert!(matches!(
            feedback("", "fine").validate(Utc::now()),
            Err(Rejection::RatingNotInteger(_))
        ));
    }

    #[test]
    fn test_rating_whitespace_and_sign() {
        assert_eq!(parse_rating(Some(" 3 ")), Ok(3));
        assert_eq!(parse_rating(Some("+2")), Ok(2));
        assert_eq!(parse_rating(None), Err(Rejection::MissingRating));
    }

    #[test]
    fn test_rating_digit_separators() {
        assert_eq!(parse_rating(Some("0_3")), Ok(3));
        assert_eq!(parse_rating(Some("00_0_5")), Ok(5));
        assert_eq!(parse_rating(Some("1_0")), Err(Rejection::RatingOutOfRange(10)));
        for raw in ["_3", "3_", "0__3", "-_3", "+", "-", "+-3", "٣", "3 4"] {
            assert!(
                matches!(parse_rating(Some(raw)), Err(Rejection::RatingNotInteger(_))),
                "{raw:?} should not parse"
            );
        }
    }

    #[test]
    fn test_rating_overflow_is_not_integer() {
        assert!(matches!(
            parse_rating(Some("99999999999999999999")),
            Err(Rejection::RatingNotInteger(_))
        ));
    }

    fn pairs(fields: &[(&str, &str)]) -> Vec<(String, String)> {
        fields
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_feedback_from_pairs_keeps_first_value() {
        let form = FeedbackForm::from_pairs(&pairs(&[
            ("rating", "4"),
            ("rating", "5"),
            ("description", "quiet"),
            ("extra", "ignored"),
        ]));
        assert_eq!(form.rating.as_deref(), Some("4"));
        assert_eq!(form.description.as_deref(), Some("quiet"));
    }

    #[test]
    fn test_ticket_from_pairs_missing_fields() {
        let form = TicketForm::from_pairs(&pairs(&[("problem", "Mould"), ("room", "")]));
        assert_eq!(form.problem.as_deref(), Some("Mould"));
        assert_eq!(form.room.as_deref(), Some(""));
        assert!(form.housing.is_none());
        assert!(form.time_available.is_none());
        assert_eq!(TicketForm::from_pairs(&[]), TicketForm::default());
    }

    #[test]
    fn test_empty_description_rejected() {
        assert_eq!(
            feedback("3", "").validate(Utc::now()),
            Err(Rejection::EmptyDescription)
        );
        assert_eq!(
            feedback("3", "   \n\t").validate(Utc::now()),
            Err(Rejection::EmptyDescription)
        );
        let form = FeedbackForm {
            rating: Some("3".to_string()),
            description: None,
        };
        assert_eq!(form.validate(Utc::now()), Err(Rejection::EmptyDescription));
    }

    #[test]
    fn test_description_is_trimmed() {
        let record = feedback("5", "  lovely garden  ").validate(Utc::now()).unwrap();
        assert_eq!(record.description, "lovely garden");
    }

    #[test]
    fn test_valid_ticket_keeps_fields() {
        let blocks = default_housing_blocks();
        let record = ticket("Broken heater", "Block B", "B-12", "")
            .validate(&blocks, Utc::now())
            .unwrap();
        assert_eq!(record.problem, "Broken heater");
        assert_eq!(record.housing, "Block B");
        assert_eq!(record.room, "B-12");
        assert_eq!(record.time_available, "");
    }

    #[test]
    fn test_ticket_unknown_housing() {
        let blocks = default_housing_blocks();
        assert_eq!(
            ticket("Broken heater", "Block Z", "Z-1", "mornings").validate(&blocks, Utc::now()),
            Err(Rejection::UnknownHousing("Block Z".to_string()))
        );
    }

    #[test]
    fn test_ticket_housing_compared_exactly() {
        let blocks = default_housing_blocks();
        assert!(matches!(
            ticket("Broken heater", "block a", "A-1", "").validate(&blocks, Utc::now()),
            Err(Rejection::UnknownHousing(_))
        ));
        assert!(matches!(
            ticket("Broken heater", " Block A", "A-1", "").validate(&blocks, Utc::now()),
            Err(Rejection::UnknownHousing(_))
        ));
    }

    #[test]
    fn test_ticket_missing_fields() {
        let blocks = default_housing_blocks();
        assert_eq!(
            ticket("  ", "Block A", "A-1", "").validate(&blocks, Utc::now()),
            Err(Rejection::EmptyProblem)
        );
        assert_eq!(
            ticket("Mould", "Block A", " ", "").validate(&blocks, Utc::now()),
            Err(Rejection::EmptyRoom)
        );
        let form = TicketForm {
            problem: Some("Mould".to_string()),
            ..TicketForm::default()
        };
        assert_eq!(
            form.validate(&blocks, Utc::now()),
            Err(Rejection::MissingHousing)
        );
    }

    #[test]
    fn test_ticket_against_empty_reference_list() {
        assert!(matches!(
            ticket("Mould", "Block A", "A-1", "").validate(&[], Utc::now()),
            Err(Rejection::UnknownHousing(_))
        ));
    }

    #[test]
    fn test_rejection_messages() {
        assert_eq!(
            Rejection::RatingOutOfRange(9).to_string(),
            "rating 9 is outside 1..=5"
        );
        assert!(Rejection::UnknownHousing("X".to_string())
            .to_string()
            .contains("\"X\""));
    }
}
