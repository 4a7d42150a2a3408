//! Domain library for the event registration site.
//!
//! This crate holds the domain types, the persistence port (trait), the slug
//! generator, input validation, and the create/edit/register workflows. It
//! only depends on `serde` for form deserialization; keep adapters and IO
//! concerns out of this crate.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::SystemTime;

/// Path segments that are taken by fixed routes and can never name an event.
pub const RESERVED_SLUGS: &[&str] = &["admin", "login", "logout", "static"];

/// Public lookup key of an event, derived from its name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slug(String);

impl Slug {
    pub fn new<S: Into<String>>(s: S) -> Result<Self, CoreError> {
        let val = s.into();
        if val.is_empty() {
            return Err(CoreError::InvalidSlug("empty".into()));
        }
        // Slugs are single path segments
        if val.contains('/') {
            return Err(CoreError::InvalidSlug("contains '/'".into()));
        }
        // "." and ".." are dot-segments that clients resolve away
        if val.chars().all(|c| c == '.') {
            return Err(CoreError::InvalidSlug("dot segment".into()));
        }
        if RESERVED_SLUGS.contains(&val.as_str()) {
            return Err(CoreError::InvalidSlug(format!("'{}' is reserved", val)));
        }
        Ok(Self(val))
    }

    /// Derive the slug for an event name.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        Self::new(slug::create_slug(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Slug {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stored event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    /// Store-generated identifier.
    pub id: i64,
    pub name: String,
    pub slug: Slug,
    pub description: String,
    pub created: SystemTime,
    /// Refreshed on every edit.
    pub updated: SystemTime,
}

/// A visitor's registration for an event. Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registration {
    pub id: i64,
    pub name: String,
    pub comment: String,
    /// Id of the owning event.
    pub event: i64,
    pub created: SystemTime,
}

/// Sanitized event fields, ready to be persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventInput {
    pub name: String,
    pub description: String,
}

/// Sanitized registration fields, ready to be persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationInput {
    pub name: String,
    pub comment: String,
}

/// Time source abstraction to make code testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Persistence port for events and registrations.
///
/// Every write is a single statement against the store. Implementations
/// derive the slug from the event name themselves and report a taken slug as
/// `CoreError::AlreadyExists`.
pub trait EventRepository: Send + Sync {
    /// Insert a new event stamped with `at` as both created and updated time.
    fn create_event(&self, input: &EventInput, at: SystemTime) -> Result<Event, CoreError>;
    /// Rename/re-describe the event currently stored under `old_slug`.
    /// The slug is recomputed from the new name.
    fn edit_event(
        &self,
        old_slug: &Slug,
        input: &EventInput,
        at: SystemTime,
    ) -> Result<Event, CoreError>;
    /// All events in storage order.
    fn list_events(&self) -> Result<Vec<Event>, CoreError>;
    /// `Ok(None)` when no event has this slug; `Err` only when the store failed.
    fn get_event(&self, slug: &Slug) -> Result<Option<Event>, CoreError>;
    fn register_for_event(
        &self,
        input: &RegistrationInput,
        event_id: i64,
        at: SystemTime,
    ) -> Result<Registration, CoreError>;
    /// Registrations of one event in the order they were created.
    fn registrations_for_event(&self, event_id: i64) -> Result<Vec<Registration>, CoreError>;
}

impl<T: EventRepository + ?Sized> EventRepository for Arc<T> {
    fn create_event(&self, input: &EventInput, at: SystemTime) -> Result<Event, CoreError> {
        (**self).create_event(input, at)
    }

    fn edit_event(
        &self,
        old_slug: &Slug,
        input: &EventInput,
        at: SystemTime,
    ) -> Result<Event, CoreError> {
        (**self).edit_event(old_slug, input, at)
    }

    fn list_events(&self) -> Result<Vec<Event>, CoreError> {
        (**self).list_events()
    }

    fn get_event(&self, slug: &Slug) -> Result<Option<Event>, CoreError> {
        (**self).get_event(slug)
    }

    fn register_for_event(
        &self,
        input: &RegistrationInput,
        event_id: i64,
        at: SystemTime,
    ) -> Result<Registration, CoreError> {
        (**self).register_for_event(input, event_id, at)
    }

    fn registrations_for_event(&self, event_id: i64) -> Result<Vec<Registration>, CoreError> {
        (**self).registrations_for_event(event_id)
    }
}

/// Core domain errors (no external error crates to keep deps at zero).
#[derive(Debug)]
pub enum CoreError {
    InvalidSlug(String),
    AlreadyExists,
    NotFound,
    Repository(String),
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::InvalidSlug(msg) => write!(f, "invalid slug: {}", msg),
            CoreError::AlreadyExists => write!(f, "resource already exists"),
            CoreError::NotFound => write!(f, "not found"),
            CoreError::Repository(msg) => write!(f, "repository error: {}", msg),
        }
    }
}

impl Error for CoreError {}

/// Return a short about/version line for the binary to print.
pub fn about() -> String {
    let pkg = env!("CARGO_PKG_NAME");
    let ver = env!("CARGO_PKG_VERSION");
    format!("{} v{} - domain library loaded", pkg, ver)
}

pub mod adapters;
pub mod service;
pub mod slug;
pub mod validate;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_new_accepts_simple_values() {
        let s = Slug::new("test-event").expect("valid slug");
        assert_eq!(s.as_str(), "test-event");
    }

    #[test]
    fn slug_rejects_empty() {
        let err = Slug::new("").unwrap_err();
        match err {
            CoreError::InvalidSlug(_) => {}
            _ => panic!("expected InvalidSlug"),
        }
    }

    #[test]
    fn slug_rejects_path_separators_and_reserved_names() {
        assert!(matches!(Slug::new("a/b"), Err(CoreError::InvalidSlug(_))));
        assert!(matches!(Slug::new("admin"), Err(CoreError::InvalidSlug(_))));
        assert!(matches!(Slug::new("login"), Err(CoreError::InvalidSlug(_))));
        assert!(matches!(Slug::new("static"), Err(CoreError::InvalidSlug(_))));
        assert!(matches!(Slug::new("."), Err(CoreError::InvalidSlug(_))));
        assert!(matches!(Slug::new(".."), Err(CoreError::InvalidSlug(_))));
        assert!(Slug::new("admin-party").is_ok());
        assert!(Slug::new("v1.0").is_ok());
    }

    #[test]
    fn slug_from_name_derives_and_checks() {
        assert_eq!(Slug::from_name("Test event").unwrap().as_str(), "test-event");
        assert!(Slug::from_name("Admin").is_err());
    }
}
