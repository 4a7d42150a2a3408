use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;

use crate::{
    CoreError, Event, EventInput, EventRepository, Registration, RegistrationInput, Slug,
};

#[derive(Default)]
struct Tables {
    events: Vec<Event>,
    registrations: Vec<Registration>,
    next_event_id: i64,
    next_registration_id: i64,
}

/// Simple in-memory repository for tests and local demos. Rows are kept in
/// insertion order behind a single mutex.
///
/// `set_offline(true)` makes every call fail with `CoreError::Repository`,
/// simulating a lost store connection. `set_fail_writes(true)` only fails the
/// inserts and updates.
pub struct InMemoryRepo {
    inner: Mutex<Tables>,
    offline: AtomicBool,
    fail_writes: AtomicBool,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Tables::default()),
            offline: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn tables_for_write(&self) -> Result<MutexGuard<'_, Tables>, CoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CoreError::Repository("write rejected".into()));
        }
        self.tables()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, CoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CoreError::Repository("store unavailable".into()));
        }
        self.inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))
    }
}

impl Default for InMemoryRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl EventRepository for InMemoryRepo {
    fn create_event(&self, input: &EventInput, at: SystemTime) -> Result<Event, CoreError> {
        let mut t = self.tables_for_write()?;
        let slug = Slug::from_name(&input.name)?;
        if t.events.iter().any(|e| e.slug == slug) {
            return Err(CoreError::AlreadyExists);
        }
        t.next_event_id += 1;
        let event = Event {
            id: t.next_event_id,
            name: input.name.clone(),
            slug,
            description: input.description.clone(),
            created: at,
            updated: at,
        };
        t.events.push(event.clone());
        Ok(event)
    }

    fn edit_event(
        &self,
        old_slug: &Slug,
        input: &EventInput,
        at: SystemTime,
    ) -> Result<Event, CoreError> {
        let mut t = self.tables_for_write()?;
        let slug = Slug::from_name(&input.name)?;
        let idx = t
            .events
            .iter()
            .position(|e| &e.slug == old_slug)
            .ok_or(CoreError::NotFound)?;
        if t
            .events
            .iter()
            .enumerate()
            .any(|(i, e)| i != idx && e.slug == slug)
        {
            return Err(CoreError::AlreadyExists);
        }
        let event = &mut t.events[idx];
        event.name = input.name.clone();
        event.slug = slug;
        event.description = input.description.clone();
        event.updated = at;
        Ok(event.clone())
    }

    fn list_events(&self) -> Result<Vec<Event>, CoreError> {
        Ok(self.tables()?.events.clone())
    }

    fn get_event(&self, slug: &Slug) -> Result<Option<Event>, CoreError> {
        Ok(self.tables()?.events.iter().find(|e| &e.slug == slug).cloned())
    }

    fn register_for_event(
        &self,
        input: &RegistrationInput,
        event_id: i64,
        at: SystemTime,
    ) -> Result<Registration, CoreError> {
        let mut t = self.tables_for_write()?;
        // Mirrors the foreign key of the SQL schema
        if !t.events.iter().any(|e| e.id == event_id) {
            return Err(CoreError::NotFound);
        }
        t.next_registration_id += 1;
        let registration = Registration {
            id: t.next_registration_id,
            name: input.name.clone(),
            comment: input.comment.clone(),
            event: event_id,
            created: at,
        };
        t.registrations.push(registration.clone());
        Ok(registration)
    }

    fn registrations_for_event(&self, event_id: i64) -> Result<Vec<Registration>, CoreError> {
        Ok(self
            .tables()?
            .registrations
            .iter()
            .filter(|r| r.event == event_id)
            .cloned()
            .collect())
    }
}
