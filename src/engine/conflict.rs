use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::binding::{EditorBinding, RoomBinding};
use crate::model::*;

use super::leave::is_on_leave;
use super::store::{BookingStore, LeaveStore};

/// A proposed slot, with system bindings already resolved against the registry.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub tenant: &'a TenantId,
    pub room: &'a RoomBinding,
    pub editor: &'a EditorBinding,
    pub date: Option<NaiveDate>,
    pub planned: Option<TimeRange>,
    /// The booking being edited, so it never conflicts with its own stored version.
    pub exclude: Option<Ulid>,
}

/// One existing booking colliding on one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub resource_kind: ResourceKind,
    pub resource_id: Ulid,
    pub conflicting_booking_id: Ulid,
    pub conflicting_interval: TimeRange,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictVerdict {
    /// False when there was nothing to check: no system resource, or no usable interval.
    pub checked: bool,
    pub has_conflict: bool,
    pub conflicts: Vec<Conflict>,
    pub editor_on_leave: bool,
    pub leave_info: Option<LeaveRecord>,
}

impl ConflictVerdict {
    pub fn unchecked() -> Self {
        Self::default()
    }

    /// Double-booked, or the editor is away.
    pub fn is_blocking(&self) -> bool {
        self.has_conflict || self.editor_on_leave
    }

    /// Short label for metrics and logs.
    pub fn outcome(&self) -> &'static str {
        match (self.checked, self.has_conflict, self.editor_on_leave) {
            (false, _, _) => "unchecked",
            (true, true, _) => "conflict",
            (true, false, true) => "on_leave",
            (true, false, false) => "clear",
        }
    }
}

/// Compute the verdict for `candidate`. A pure query; never fails.
///
/// Room and editor are checked independently and every overlap on either is reported.
/// A resource whose `ignore_conflict` is set contributes no conflicts, but an editor's
/// leave is reported regardless of that flag.
pub fn detect(
    candidate: &Candidate<'_>,
    bookings: &dyn BookingStore,
    leaves: &dyn LeaveStore,
) -> ConflictVerdict {
    let (Some(date), Some(planned)) = (candidate.date, candidate.planned) else {
        return ConflictVerdict::unchecked();
    };
    if !candidate.room.is_system() && !candidate.editor.is_system() {
        return ConflictVerdict::unchecked();
    }

    let mut conflicts = Vec::new();
    let slots = [
        (ResourceKind::Room, candidate.room.system()),
        (ResourceKind::Editor, candidate.editor.system()),
    ];
    for (kind, slot) in slots {
        let Some(resource) = slot else { continue };
        if resource.ignore_conflict {
            continue;
        }
        let existing = bookings.find_by_resource_and_date(
            candidate.tenant,
            kind,
            resource.resource_id,
            date,
            candidate.exclude,
        );
        for other in existing {
            if !other.planned.overlaps(&planned) {
                continue;
            }
            conflicts.push(Conflict {
                resource_kind: kind,
                resource_id: resource.resource_id,
                conflicting_booking_id: other.id,
                conflicting_interval: other.planned,
                message: format!(
                    "{kind} already booked {} by booking {}",
                    other.planned, other.id
                ),
            });
        }
    }

    let leave_info = candidate
        .editor
        .system_id()
        .and_then(|editor_id| is_on_leave(leaves, candidate.tenant, editor_id, date));

    ConflictVerdict {
        checked: true,
        has_conflict: !conflicts.is_empty(),
        conflicts,
        editor_on_leave: leave_info.is_some(),
        leave_info,
    }
}
