//! The three submission flows on top of a [`Store`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::Result;
use crate::records::{Collection, FeedbackRecord, TicketRecord};
use crate::storage::{append_record, load_records, Store, StoreStats};
use crate::validation::{FeedbackForm, Rejection, TicketForm};

/// Outcome of a submission that did not fail outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission<T> {
    /// The record was validated and persisted.
    Accepted(T),
    /// The input was invalid; nothing was persisted.
    Rejected(Rejection),
}

impl<T> Submission<T> {
    /// Whether the submission was persisted.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    /// The rejection reason, if any.
    #[must_use]
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Accepted(_) => None,
            Self::Rejected(reason) => Some(reason),
        }
    }
}

/// Front desk of the housing complex.
///
/// Every operation first makes sure the collections exist, so a store that
/// was deleted while the server runs is recreated on the next request.
#[derive(Debug, Clone)]
pub struct Desk {
    store: Arc<dyn Store>,
    housing_defaults: Vec<String>,
}

impl Desk {
    /// Create a desk over `store`, seeding fresh housing stores with
    /// `housing_defaults`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, housing_defaults: Vec<String>) -> Self {
        Self {
            store,
            housing_defaults,
        }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// Create any missing collection.
    ///
    /// # Errors
    ///
    /// Returns an error if a collection cannot be created.
    pub fn initialize(&self) -> Result<()> {
        self.store.initialize(&self.housing_defaults)
    }

    /// Current housing-block reference list.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be initialized or read.
    pub fn housing_blocks(&self) -> Result<Vec<String>> {
        self.initialize()?;
        load_records(self.store(), Collection::Housing)
    }

    /// All feedback in submission order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be initialized or read.
    pub fn feedback(&self) -> Result<Vec<FeedbackRecord>> {
        self.initialize()?;
        load_records(self.store(), Collection::Feedback)
    }

    /// All tickets in submission order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be initialized or read.
    pub fn tickets(&self) -> Result<Vec<TicketRecord>> {
        self.initialize()?;
        load_records(self.store(), Collection::Tickets)
    }

    /// Record counts per collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be initialized or read.
    pub fn stats(&self) -> Result<StoreStats> {
        self.initialize()?;
        StoreStats::collect(self.store())
    }

    /// Validate and persist a feedback submission.
    ///
    /// # Errors
    ///
    /// Returns an error only when the store fails; invalid input is reported
    /// as [`Submission::Rejected`].
    pub fn submit_feedback(&self, form: &FeedbackForm) -> Result<Submission<FeedbackRecord>> {
        self.submit_feedback_at(form, Utc::now())
    }

    /// [`Desk::submit_feedback`] with an explicit timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error only when the store fails.
    pub fn submit_feedback_at(
        &self,
        form: &FeedbackForm,
        at: DateTime<Utc>,
    ) -> Result<Submission<FeedbackRecord>> {
        self.initialize()?;
        let record = match form.validate(at) {
            Ok(record) => record,
            Err(reason) => {
                debug!("Rejected feedback: {}", reason);
                return Ok(Submission::Rejected(reason));
            }
        };
        append_record(self.store(), Collection::Feedback, &record)?;
        info!("Recorded feedback with rating {}", record.rating);
        Ok(Submission::Accepted(record))
    }

    /// Validate and persist a maintenance ticket.
    ///
    /// The housing block is checked against the list as it is at submission
    /// time.
    ///
    /// # Errors
    ///
    /// Returns an error only when the store fails; invalid input is reported
    /// as [`Submission::Rejected`].
    pub fn submit_ticket(&self, form: &TicketForm) -> Result<Submission<TicketRecord>> {
        self.submit_ticket_at(form, Utc::now())
    }

    /// [`Desk::submit_ticket`] with an explicit timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error only when the store fails.
    pub fn submit_ticket_at(
        &self,
        form: &TicketForm,
        at: DateTime<Utc>,
    ) -> Result<Submission<TicketRecord>> {
        let blocks = self.housing_blocks()?;
        let record = match form.validate(&blocks, at) {
            Ok(record) => record,
            Err(reason) => {
                debug!("Rejected ticket: {}", reason);
                return Ok(Submission::Rejected(reason));
            }
        };
        append_record(self.store(), Collection::Tickets, &record)?;
        info!(
            "Recorded ticket for {} room {}",
            record.housing, record.room
        );
        Ok(Submission::Accepted(record))
    }
}
