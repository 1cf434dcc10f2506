use std::io;
use std::path::Path;
use std::sync::Mutex;

use chrono::NaiveDate;
use dashmap::DashMap;
use tracing::{error, info};
use ulid::Ulid;

use crate::journal::Journal;
use crate::model::*;

// ── Collaborators consumed by the engine ─────────────────────────

/// Managed rooms and editors. Read-only to the engine.
pub trait ResourceRegistry: Send + Sync {
    fn get_room(&self, tenant: &TenantId, id: Ulid) -> Option<Room>;
    fn get_editor(&self, tenant: &TenantId, id: Ulid) -> Option<Editor>;
}

/// Customers, their projects and contacts. Read-only to the engine.
pub trait Directory: Send + Sync {
    fn get_customer(&self, tenant: &TenantId, id: Ulid) -> Option<Customer>;
    fn get_project(&self, tenant: &TenantId, id: Ulid) -> Option<Project>;
    fn get_contact(&self, tenant: &TenantId, id: Ulid) -> Option<Contact>;
}

pub trait LeaveStore: Send + Sync {
    /// Leave records of `editor_id` whose inclusive range covers `date`.
    fn find_by_editor_and_date(
        &self,
        tenant: &TenantId,
        editor_id: Ulid,
        date: NaiveDate,
    ) -> Vec<LeaveRecord>;
}

/// Booking storage. Reads are plain queries; the three writes are the only commits the
/// engine ever makes.
pub trait BookingStore: Send + Sync {
    /// Bookings on `date` in `tenant` holding the given system resource, minus `exclude`.
    fn find_by_resource_and_date(
        &self,
        tenant: &TenantId,
        kind: ResourceKind,
        resource_id: Ulid,
        date: NaiveDate,
        exclude: Option<Ulid>,
    ) -> Vec<Booking>;

    fn get(&self, tenant: &TenantId, id: Ulid) -> Option<Booking>;

    /// Ordered by `(date, planned.from)`.
    fn list(&self, tenant: &TenantId, date: Option<NaiveDate>) -> Vec<Booking>;

    fn history(&self, tenant: &TenantId, id: Ulid) -> Vec<BookingLogEntry>;

    fn insert(&self, booking: Booking) -> io::Result<()>;

    fn replace(&self, booking: Booking) -> io::Result<()>;

    fn remove(&self, tenant: &TenantId, id: Ulid) -> io::Result<Option<Booking>>;
}

// ── In-memory implementation ─────────────────────────────────────

type Key = (TenantId, Ulid);

/// DashMap-backed implementation of every collaborator trait, optionally journaled to disk.
///
/// Commits are serialized by the journal lock so journal order always matches apply order.
pub struct InMemoryStore {
    rooms: DashMap<Key, Room>,
    editors: DashMap<Key, Editor>,
    customers: DashMap<Key, Customer>,
    projects: DashMap<Key, Project>,
    contacts: DashMap<Key, Contact>,
    /// (tenant, editor id) → leave records
    leaves: DashMap<Key, Vec<LeaveRecord>>,
    bookings: DashMap<Ulid, Booking>,
    /// (tenant, date) → ids of bookings on that day
    by_day: DashMap<(TenantId, NaiveDate), Vec<Ulid>>,
    /// Survives deletion until the next compaction.
    history: DashMap<Key, Vec<BookingLogEntry>>,
    journal: Mutex<Option<Journal>>,
    compact_threshold: u64,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Memory only; nothing survives a restart.
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            editors: DashMap::new(),
            customers: DashMap::new(),
            projects: DashMap::new(),
            contacts: DashMap::new(),
            leaves: DashMap::new(),
            bookings: DashMap::new(),
            by_day: DashMap::new(),
            history: DashMap::new(),
            journal: Mutex::new(None),
            compact_threshold: 0,
        }
    }

    /// Replay the journal at `path` and keep appending to it. A `compact_threshold` of 0
    /// disables compaction.
    pub fn open(path: &Path, compact_threshold: u64) -> io::Result<Self> {
        let (journal, events) = Journal::recover(path)?;
        let mut store = Self::new();
        for event in &events {
            store.apply_event(event);
        }
        info!(
            "replayed {} journal records from {}",
            events.len(),
            path.display()
        );
        store.journal = Mutex::new(Some(journal));
        store.compact_threshold = compact_threshold;
        Ok(store)
    }

    // ── Registry administration ──────────────────────────────

    pub fn put_room(&self, tenant: &TenantId, room: Room) -> io::Result<()> {
        self.commit(StoreEvent::RoomRegistered {
            tenant: tenant.clone(),
            room,
        })
    }

    pub fn put_editor(&self, tenant: &TenantId, editor: Editor) -> io::Result<()> {
        self.commit(StoreEvent::EditorRegistered {
            tenant: tenant.clone(),
            editor,
        })
    }

    pub fn put_customer(&self, tenant: &TenantId, customer: Customer) -> io::Result<()> {
        self.commit(StoreEvent::CustomerRegistered {
            tenant: tenant.clone(),
            customer,
        })
    }

    pub fn put_project(&self, tenant: &TenantId, project: Project) -> io::Result<()> {
        self.commit(StoreEvent::ProjectRegistered {
            tenant: tenant.clone(),
            project,
        })
    }

    pub fn put_contact(&self, tenant: &TenantId, contact: Contact) -> io::Result<()> {
        self.commit(StoreEvent::ContactRegistered {
            tenant: tenant.clone(),
            contact,
        })
    }

    /// Caller validates the range. Overlap between an editor's leaves is not checked here.
    pub fn put_leave(&self, tenant: &TenantId, leave: LeaveRecord) -> io::Result<()> {
        self.commit(StoreEvent::LeaveRecorded {
            tenant: tenant.clone(),
            leave,
        })
    }

    pub fn has_rooms(&self, tenant: &TenantId) -> bool {
        self.rooms.iter().any(|e| &e.key().0 == tenant)
    }

    pub fn booking_count(&self) -> usize {
        self.bookings.len()
    }

    // ── Commit path ──────────────────────────────────────────

    /// Journal (if any) + apply, under the journal lock. Once the append succeeds the
    /// change is committed; a failed compaction after that is logged, not returned.
    fn commit(&self, event: StoreEvent) -> io::Result<()> {
        let mut guard = self
            .journal
            .lock()
            .map_err(|_| io::Error::other("journal lock poisoned"))?;
        if let Some(journal) = guard.as_mut() {
            journal.append(&event)?;
        }
        self.apply_event(&event);

        if let Some(journal) = guard.as_mut()
            && self.compact_threshold > 0
            && journal.appends_since_compact() >= self.compact_threshold
        {
            let snapshot = self.snapshot();
            match journal.compact(&snapshot) {
                Ok(()) => {
                    metrics::counter!(crate::observability::JOURNAL_COMPACTIONS_TOTAL)
                        .increment(1);
                    info!(
                        "compacted {} to {} records",
                        journal.path().display(),
                        snapshot.len()
                    );
                }
                Err(e) => {
                    metrics::counter!(crate::observability::JOURNAL_COMPACTION_FAILURES_TOTAL)
                        .increment(1);
                    error!("compaction of {} failed: {e}", journal.path().display());
                }
            }
        }
        Ok(())
    }

    /// Events that rebuild the current state from nothing.
    fn snapshot(&self) -> Vec<StoreEvent> {
        let mut events = Vec::new();
        for e in self.rooms.iter() {
            events.push(StoreEvent::RoomRegistered {
                tenant: e.key().0.clone(),
                room: e.value().clone(),
            });
        }
        for e in self.editors.iter() {
            events.push(StoreEvent::EditorRegistered {
                tenant: e.key().0.clone(),
                editor: e.value().clone(),
            });
        }
        for e in self.customers.iter() {
            events.push(StoreEvent::CustomerRegistered {
                tenant: e.key().0.clone(),
                customer: e.value().clone(),
            });
        }
        for e in self.projects.iter() {
            events.push(StoreEvent::ProjectRegistered {
                tenant: e.key().0.clone(),
                project: e.value().clone(),
            });
        }
        for e in self.contacts.iter() {
            events.push(StoreEvent::ContactRegistered {
                tenant: e.key().0.clone(),
                contact: e.value().clone(),
            });
        }
        for e in self.leaves.iter() {
            for leave in e.value() {
                events.push(StoreEvent::LeaveRecorded {
                    tenant: e.key().0.clone(),
                    leave: leave.clone(),
                });
            }
        }
        for e in self.bookings.iter() {
            let history = self
                .history
                .get(&(e.value().tenant.clone(), *e.key()))
                .map(|h| h.value().clone())
                .unwrap_or_default();
            events.push(StoreEvent::BookingRestored {
                booking: e.value().clone(),
                history,
            });
        }
        events
    }

    fn apply_event(&self, event: &StoreEvent) {
        match event {
            StoreEvent::RoomRegistered { tenant, room } => {
                self.rooms.insert((tenant.clone(), room.id), room.clone());
            }
            StoreEvent::EditorRegistered { tenant, editor } => {
                self.editors
                    .insert((tenant.clone(), editor.id), editor.clone());
            }
            StoreEvent::CustomerRegistered { tenant, customer } => {
                self.customers
                    .insert((tenant.clone(), customer.id), customer.clone());
            }
            StoreEvent::ProjectRegistered { tenant, project } => {
                self.projects
                    .insert((tenant.clone(), project.id), project.clone());
            }
            StoreEvent::ContactRegistered { tenant, contact } => {
                self.contacts
                    .insert((tenant.clone(), contact.id), contact.clone());
            }
            StoreEvent::LeaveRecorded { tenant, leave } => {
                let mut records = self
                    .leaves
                    .entry((tenant.clone(), leave.editor_id))
                    .or_default();
                records.retain(|l| l.id != leave.id);
                records.push(leave.clone());
                records.sort_by_key(|l| l.from_date);
            }
            StoreEvent::BookingCreated { booking, at } => {
                self.index_booking(booking);
                self.bookings.insert(booking.id, booking.clone());
                self.log(&booking.tenant, booking.id, *at, BookingAction::Created);
            }
            StoreEvent::BookingUpdated { booking, at } => {
                let Some(old) = self.bookings.insert(booking.id, booking.clone()) else {
                    self.index_booking(booking);
                    return;
                };
                if old.date != booking.date {
                    self.unindex_booking(&old);
                    self.index_booking(booking);
                }
                if old.status != booking.status {
                    self.log(
                        &booking.tenant,
                        booking.id,
                        *at,
                        BookingAction::StatusChanged {
                            from: old.status,
                            to: booking.status,
                        },
                    );
                }
                let fields = changed_fields(&old, booking);
                if !fields.is_empty() {
                    self.log(&booking.tenant, booking.id, *at, BookingAction::Updated { fields });
                }
            }
            StoreEvent::BookingDeleted { tenant, id, at } => {
                if let Some((_, old)) = self.bookings.remove(id) {
                    self.unindex_booking(&old);
                }
                self.log(tenant, *id, *at, BookingAction::Deleted);
            }
            StoreEvent::BookingRestored { booking, history } => {
                self.index_booking(booking);
                self.bookings.insert(booking.id, booking.clone());
                self.history
                    .insert((booking.tenant.clone(), booking.id), history.clone());
            }
        }
    }

    fn index_booking(&self, booking: &Booking) {
        let mut ids = self
            .by_day
            .entry((booking.tenant.clone(), booking.date))
            .or_default();
        if !ids.contains(&booking.id) {
            ids.push(booking.id);
        }
    }

    fn unindex_booking(&self, booking: &Booking) {
        if let Some(mut ids) = self.by_day.get_mut(&(booking.tenant.clone(), booking.date)) {
            ids.retain(|id| *id != booking.id);
        }
    }

    fn log(&self, tenant: &TenantId, id: Ulid, at: Ms, action: BookingAction) {
        self.history
            .entry((tenant.clone(), id))
            .or_default()
            .push(BookingLogEntry { at, action });
    }

    fn bookings_on(&self, tenant: &TenantId, date: NaiveDate) -> Vec<Booking> {
        let ids = self
            .by_day
            .get(&(tenant.clone(), date))
            .map(|e| e.value().clone())
            .unwrap_or_default();
        ids.iter()
            .filter_map(|id| self.bookings.get(id).map(|b| b.value().clone()))
            .collect()
    }
}

/// Names of the non-status fields that differ between two versions of a booking.
fn changed_fields(old: &Booking, new: &Booking) -> Vec<String> {
    let mut fields = Vec::new();
    let mut check = |changed: bool, name: &str| {
        if changed {
            fields.push(name.to_string());
        }
    };
    check(old.room != new.room, "room");
    check(old.editor != new.editor, "editor");
    check(old.customer_id != new.customer_id, "customer_id");
    check(old.project_id != new.project_id, "project_id");
    check(old.contact_id != new.contact_id, "contact_id");
    check(old.date != new.date, "date");
    check(old.planned != new.planned, "planned");
    check(old.actual != new.actual, "actual");
    check(old.break_hours != new.break_hours, "break_hours");
    check(old.notes != new.notes, "notes");
    fields
}

impl ResourceRegistry for InMemoryStore {
    fn get_room(&self, tenant: &TenantId, id: Ulid) -> Option<Room> {
        self.rooms
            .get(&(tenant.clone(), id))
            .map(|e| e.value().clone())
    }

    fn get_editor(&self, tenant: &TenantId, id: Ulid) -> Option<Editor> {
        self.editors
            .get(&(tenant.clone(), id))
            .map(|e| e.value().clone())
    }
}

impl Directory for InMemoryStore {
    fn get_customer(&self, tenant: &TenantId, id: Ulid) -> Option<Customer> {
        self.customers
            .get(&(tenant.clone(), id))
            .map(|e| e.value().clone())
    }

    fn get_project(&self, tenant: &TenantId, id: Ulid) -> Option<Project> {
        self.projects
            .get(&(tenant.clone(), id))
            .map(|e| e.value().clone())
    }

    fn get_contact(&self, tenant: &TenantId, id: Ulid) -> Option<Contact> {
        self.contacts
            .get(&(tenant.clone(), id))
            .map(|e| e.value().clone())
    }
}

impl LeaveStore for InMemoryStore {
    fn find_by_editor_and_date(
        &self,
        tenant: &TenantId,
        editor_id: Ulid,
        date: NaiveDate,
    ) -> Vec<LeaveRecord> {
        self.leaves
            .get(&(tenant.clone(), editor_id))
            .map(|records| {
                records
                    .iter()
                    .filter(|l| l.covers(date))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl BookingStore for InMemoryStore {
    fn find_by_resource_and_date(
        &self,
        tenant: &TenantId,
        kind: ResourceKind,
        resource_id: Ulid,
        date: NaiveDate,
        exclude: Option<Ulid>,
    ) -> Vec<Booking> {
        let mut hits: Vec<Booking> = self
            .bookings_on(tenant, date)
            .into_iter()
            .filter(|b| Some(b.id) != exclude && b.holds(kind, resource_id))
            .collect();
        hits.sort_by_key(|b| b.planned.from());
        hits
    }

    fn get(&self, tenant: &TenantId, id: Ulid) -> Option<Booking> {
        self.bookings
            .get(&id)
            .filter(|b| &b.tenant == tenant)
            .map(|b| b.value().clone())
    }

    fn list(&self, tenant: &TenantId, date: Option<NaiveDate>) -> Vec<Booking> {
        let mut bookings: Vec<Booking> = match date {
            Some(date) => self.bookings_on(tenant, date),
            None => self
                .bookings
                .iter()
                .filter(|b| &b.tenant == tenant)
                .map(|b| b.value().clone())
                .collect(),
        };
        bookings.sort_by_key(|b| (b.date, b.planned.from(), b.id));
        bookings
    }

    fn history(&self, tenant: &TenantId, id: Ulid) -> Vec<BookingLogEntry> {
        self.history
            .get(&(tenant.clone(), id))
            .map(|h| h.value().clone())
            .unwrap_or_default()
    }

    fn insert(&self, booking: Booking) -> io::Result<()> {
        self.commit(StoreEvent::BookingCreated {
            booking,
            at: now_ms(),
        })
    }

    fn replace(&self, booking: Booking) -> io::Result<()> {
        self.commit(StoreEvent::BookingUpdated {
            booking,
            at: now_ms(),
        })
    }

    fn remove(&self, tenant: &TenantId, id: Ulid) -> io::Result<Option<Booking>> {
        let Some(existing) = self.get(tenant, id) else {
            return Ok(None);
        };
        self.commit(StoreEvent::BookingDeleted {
            tenant: tenant.clone(),
            id,
            at: now_ms(),
        })?;
        Ok(Some(existing))
    }
}
