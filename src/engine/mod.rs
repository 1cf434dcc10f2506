mod conflict;
mod error;
mod leave;
mod lifecycle;
mod mutations;
mod queries;
pub mod series;
mod store;
#[cfg(test)]
mod tests;

pub use conflict::{detect, Candidate, Conflict, ConflictVerdict};
pub use error::EngineError;
pub use leave::is_on_leave;
pub use lifecycle::{same_binding, BookingDraft, BookingPatch, BookingRequest, Changes};
pub use mutations::UpdateOutcome;
pub use queries::ConflictQuery;
pub use series::{ConflictPolicy, Disposition, SeriesDay, SeriesOutcome};
pub use store::{BookingStore, Directory, InMemoryStore, LeaveStore, ResourceRegistry};

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;
use ulid::Ulid;

use crate::binding::{EditorBinding, ResourceBinding, RoomBinding, SystemRef};
use crate::limits::*;
use crate::model::*;
use crate::notify::NotifyHub;

/// Conflict detection and booking allocation over tenant-scoped collaborators.
///
/// The engine keeps no state of its own. Check and commit are two separate steps, so two
/// callers racing for the same slot can both pass the check; the verdict is advisory.
pub struct Engine {
    registry: Arc<dyn ResourceRegistry>,
    directory: Arc<dyn Directory>,
    bookings: Arc<dyn BookingStore>,
    leaves: Arc<dyn LeaveStore>,
    pub notify: Arc<NotifyHub>,
}

impl Engine {
    /// All collaborators served by one store.
    pub fn new(store: Arc<InMemoryStore>, notify: Arc<NotifyHub>) -> Self {
        Self::with_collaborators(store.clone(), store.clone(), store.clone(), store, notify)
    }

    pub fn with_collaborators(
        registry: Arc<dyn ResourceRegistry>,
        directory: Arc<dyn Directory>,
        bookings: Arc<dyn BookingStore>,
        leaves: Arc<dyn LeaveStore>,
        notify: Arc<NotifyHub>,
    ) -> Self {
        Self {
            registry,
            directory,
            bookings,
            leaves,
            notify,
        }
    }

    // ── Binding resolution ───────────────────────────────────

    /// System room must exist and be active. The registry's `ignore_conflict` is captured.
    pub(super) fn resolve_room(
        &self,
        tenant: &TenantId,
        binding: RoomBinding,
    ) -> Result<RoomBinding, EngineError> {
        let ResourceBinding::System(r) = binding else {
            return Ok(binding);
        };
        let room = self
            .registry
            .get_room(tenant, r.resource_id)
            .filter(|room| room.is_active)
            .ok_or(EngineError::UnknownResource {
                kind: ResourceKind::Room,
                id: r.resource_id,
            })?;
        Ok(ResourceBinding::System(SystemRef {
            resource_id: room.id,
            ignore_conflict: room.ignore_conflict,
        }))
    }

    pub(super) fn resolve_editor(
        &self,
        tenant: &TenantId,
        binding: EditorBinding,
    ) -> Result<EditorBinding, EngineError> {
        let ResourceBinding::System(r) = binding else {
            return Ok(binding);
        };
        let editor = self
            .registry
            .get_editor(tenant, r.resource_id)
            .filter(|editor| editor.is_active)
            .ok_or(EngineError::UnknownResource {
                kind: ResourceKind::Editor,
                id: r.resource_id,
            })?;
        Ok(ResourceBinding::System(SystemRef {
            resource_id: editor.id,
            ignore_conflict: editor.ignore_conflict,
        }))
    }

    /// Current `ignore_conflict` for a system binding. Unknown resources read as `false`.
    fn refresh<D: Clone>(
        binding: &ResourceBinding<D>,
        lookup: impl FnOnce(Ulid) -> Option<bool>,
    ) -> ResourceBinding<D> {
        match binding {
            ResourceBinding::System(r) => ResourceBinding::System(SystemRef {
                resource_id: r.resource_id,
                ignore_conflict: lookup(r.resource_id).unwrap_or(false),
            }),
            other => other.clone(),
        }
    }

    // ── Validation ───────────────────────────────────────────

    /// Project and contact must belong to the stated customer.
    pub(super) fn check_references(
        &self,
        tenant: &TenantId,
        customer_id: Ulid,
        project_id: Ulid,
        contact_id: Option<Ulid>,
    ) -> Result<(), EngineError> {
        if self.directory.get_customer(tenant, customer_id).is_none() {
            return Err(EngineError::ReferentialMismatch(format!(
                "unknown customer {customer_id}"
            )));
        }
        let project = self
            .directory
            .get_project(tenant, project_id)
            .ok_or_else(|| {
                EngineError::ReferentialMismatch(format!("unknown project {project_id}"))
            })?;
        if project.customer_id != customer_id {
            return Err(EngineError::ReferentialMismatch(format!(
                "project {project_id} does not belong to customer {customer_id}"
            )));
        }
        if let Some(contact_id) = contact_id {
            let contact = self
                .directory
                .get_contact(tenant, contact_id)
                .ok_or_else(|| {
                    EngineError::ReferentialMismatch(format!("unknown contact {contact_id}"))
                })?;
            if contact.customer_id != customer_id {
                return Err(EngineError::ReferentialMismatch(format!(
                    "contact {contact_id} does not belong to customer {customer_id}"
                )));
            }
        }
        Ok(())
    }

    // ── Detection ────────────────────────────────────────────

    /// Run the detector with `ignore_conflict` read fresh from the registry.
    pub(super) fn verdict_for(
        &self,
        tenant: &TenantId,
        room: &RoomBinding,
        editor: &EditorBinding,
        date: Option<NaiveDate>,
        planned: Option<TimeRange>,
        exclude: Option<Ulid>,
    ) -> ConflictVerdict {
        let room = Self::refresh(room, |id| {
            self.registry.get_room(tenant, id).map(|r| r.ignore_conflict)
        });
        let editor = Self::refresh(editor, |id| {
            self.registry.get_editor(tenant, id).map(|e| e.ignore_conflict)
        });
        let candidate = Candidate {
            tenant,
            room: &room,
            editor: &editor,
            date,
            planned,
            exclude,
        };
        let verdict = detect(&candidate, self.bookings.as_ref(), self.leaves.as_ref());
        metrics::counter!(
            crate::observability::CONFLICT_CHECKS_TOTAL,
            "outcome" => verdict.outcome()
        )
        .increment(1);
        debug!(
            "conflict check tenant={tenant} date={date:?} outcome={} conflicts={}",
            verdict.outcome(),
            verdict.conflicts.len()
        );
        verdict
    }
}

/// Hard limits on free-form booking fields.
pub(super) fn check_limits(notes: &str, break_hours: u32) -> Result<(), EngineError> {
    if notes.len() > MAX_NOTES_LEN {
        return Err(EngineError::LimitExceeded("notes too long"));
    }
    if break_hours > MAX_BREAK_HOURS {
        return Err(EngineError::LimitExceeded("break hours too large"));
    }
    Ok(())
}
