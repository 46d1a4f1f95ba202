//! crates/bookstore_core/src/reviews.rs
//!
//! Keeps the one-review-per-customer invariant and the derived average rating.

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::Review;

/// A customer rating: an integer from 1 to 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rating(u8);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RatingError {
    #[error("Please choose a star rating")]
    Missing,
    #[error("The rating must be a whole number from 1 to 5")]
    Invalid,
}

impl Rating {
    pub fn new(value: u8) -> Result<Self, RatingError> {
        if (1..=5).contains(&value) {
            Ok(Self(value))
        } else {
            Err(RatingError::Invalid)
        }
    }

    /// Accepts a JSON number or numeric string. Fractions and out-of-range
    /// values are rejected.
    pub fn from_json(value: Option<&Value>) -> Result<Self, RatingError> {
        let number = match value {
            None | Some(Value::Null) => return Err(RatingError::Missing),
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) if s.trim().is_empty() => return Err(RatingError::Missing),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            Some(_) => None,
        }
        .ok_or(RatingError::Invalid)?;

        if number.fract() != 0.0 || !(1.0..=5.0).contains(&number) {
            return Err(RatingError::Invalid);
        }
        Self::new(number as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Added,
    Updated,
}

/// One customer's review of a book, validated and ready to merge.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSubmission {
    pub customer_id: Uuid,
    pub rating: Rating,
    pub comment: String,
    pub submitted_at: DateTime<Utc>,
}

impl ReviewSubmission {
    /// Merges the submission into `reviews`, returning the action taken and the
    /// new average rating.
    pub fn apply_to(&self, reviews: &mut Vec<Review>) -> (ReviewAction, f64) {
        let action = upsert(
            reviews,
            self.customer_id,
            self.rating,
            &self.comment,
            self.submitted_at,
        );
        (action, average_rating(reviews))
    }
}

/// Overwrites the customer's existing review in place, or appends a new one.
pub fn upsert(
    reviews: &mut Vec<Review>,
    customer_id: Uuid,
    rating: Rating,
    comment: &str,
    now: DateTime<Utc>,
) -> ReviewAction {
    // Linear scan; index by customer if review volume ever grows large.
    match reviews.iter_mut().find(|r| r.customer_id == customer_id) {
        Some(existing) => {
            existing.rating = rating.value();
            existing.review = comment.to_string();
            existing.created_at = now;
            ReviewAction::Updated
        }
        None => {
            reviews.push(Review {
                customer_id,
                customer: None,
                rating: rating.value(),
                review: comment.to_string(),
                created_at: now,
            });
            ReviewAction::Added
        }
    }
}

/// Mean of all ratings rounded to two decimals, or 0 when there are none.
pub fn average_rating(reviews: &[Review]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }
    let total: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
    let mean = f64::from(total) / reviews.len() as f64;
    (mean * 100.0).round() / 100.0
}
