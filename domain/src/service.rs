use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::validate::{
    sanitize_event, sanitize_registration, validate_event, validate_registration, EventForm,
    FieldError, RegistrationForm,
};
use crate::{Clock, CoreError, Event, EventRepository, Registration, Slug};

pub const NAME_TAKEN_MESSAGE: &str = "An event with this name already exists";
pub const NAME_UNUSABLE_MESSAGE: &str = "This name cannot be used as an event address";

/// Why a form submission was not persisted.
#[derive(Debug)]
pub enum SubmitError {
    /// One or more field rules failed; nothing was written.
    Invalid(Vec<FieldError>),
    /// The event addressed by the request does not exist.
    NotFound,
    /// The store failed. Callers log this and show a generic message.
    Store(CoreError),
}

impl Display for SubmitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitError::Invalid(errors) => write!(f, "{} invalid field(s)", errors.len()),
            SubmitError::NotFound => write!(f, "event not found"),
            SubmitError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl Error for SubmitError {}

// Name-derived slug problems are the submitter's to fix, everything else is
// a store failure.
fn slug_error_to_submit(e: CoreError) -> SubmitError {
    match e {
        CoreError::AlreadyExists => {
            SubmitError::Invalid(vec![FieldError::new("name", NAME_TAKEN_MESSAGE)])
        }
        CoreError::InvalidSlug(_) => {
            SubmitError::Invalid(vec![FieldError::new("name", NAME_UNUSABLE_MESSAGE)])
        }
        CoreError::NotFound => SubmitError::NotFound,
        other => SubmitError::Store(other),
    }
}

/// Admin workflows over events: validate, sanitize, persist.
pub struct EventService<R: EventRepository, C: Clock> {
    repo: R,
    clock: C,
}

impl<R: EventRepository, C: Clock> EventService<R, C> {
    pub fn new(repo: R, clock: C) -> Self {
        Self { repo, clock }
    }

    pub fn list(&self) -> Result<Vec<Event>, CoreError> {
        self.repo.list_events()
    }

    /// Look up an event by the raw path segment. A segment that can never be
    /// a slug is reported as not found.
    pub fn get(&self, slug: &str) -> Result<Option<Event>, CoreError> {
        match Slug::new(slug) {
            Ok(s) => self.repo.get_event(&s),
            Err(_) => Ok(None),
        }
    }

    pub fn registrations(&self, event: &Event) -> Result<Vec<Registration>, CoreError> {
        self.repo.registrations_for_event(event.id)
    }

    /// Create an event from a submitted form.
    pub fn create(&self, form: &EventForm) -> Result<Event, SubmitError> {
        validate_event(form).map_err(SubmitError::Invalid)?;
        let input = sanitize_event(form);
        self.repo
            .create_event(&input, self.clock.now())
            .map_err(slug_error_to_submit)
    }

    /// Apply an edit to the event currently stored under `old_slug`.
    pub fn edit(&self, old_slug: &str, form: &EventForm) -> Result<Event, SubmitError> {
        validate_event(form).map_err(SubmitError::Invalid)?;
        let old = Slug::new(old_slug).map_err(|_| SubmitError::NotFound)?;
        let input = sanitize_event(form);
        self.repo
            .edit_event(&old, &input, self.clock.now())
            .map_err(slug_error_to_submit)
    }
}

/// Public self-registration workflow.
pub struct RegistrationService<R: EventRepository, C: Clock> {
    repo: R,
    clock: C,
}

impl<R: EventRepository, C: Clock> RegistrationService<R, C> {
    pub fn new(repo: R, clock: C) -> Self {
        Self { repo, clock }
    }

    /// Register for the event at `slug`. The event is resolved before the
    /// form is looked at, so an unknown slug never produces a row.
    pub fn register(
        &self,
        slug: &str,
        form: &RegistrationForm,
    ) -> Result<Registration, SubmitError> {
        let slug = Slug::new(slug).map_err(|_| SubmitError::NotFound)?;
        let event = self
            .repo
            .get_event(&slug)
            .map_err(SubmitError::Store)?
            .ok_or(SubmitError::NotFound)?;

        validate_registration(form).map_err(SubmitError::Invalid)?;
        let input = sanitize_registration(form);
        self.repo
            .register_for_event(&input, event.id, self.clock.now())
            .map_err(SubmitError::Store)
    }
}
