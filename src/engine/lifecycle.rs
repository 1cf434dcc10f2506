use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use ulid::Ulid;

use crate::binding::{EditorBinding, RawBinding, ResourceBinding, RoomBinding};
use crate::model::*;

use super::EngineError;

/// A create request as submitted by a caller. Bindings are still raw.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub tenant: TenantId,
    #[serde(default)]
    pub room: RawBinding,
    #[serde(default)]
    pub editor: RawBinding,
    pub customer_id: Ulid,
    pub project_id: Ulid,
    #[serde(default)]
    pub contact_id: Option<Ulid>,
    pub date: NaiveDate,
    pub from_time: ClockTime,
    pub to_time: ClockTime,
    #[serde(default)]
    pub actual: ActualTimes,
    #[serde(default)]
    pub break_hours: u32,
    #[serde(default)]
    pub status: BookingStatus,
    #[serde(default)]
    pub notes: String,
    /// Extra consecutive days after `date`. 0 books `date` alone.
    #[serde(default)]
    pub repeat_days: u32,
}

impl BookingRequest {
    /// Parse bindings and intervals. Registry and reference checks happen in the engine.
    pub fn into_draft(self) -> Result<(BookingDraft, u32), EngineError> {
        let planned = TimeRange::new(self.from_time, self.to_time)?;
        self.actual.validate()?;
        let draft = BookingDraft {
            tenant: self.tenant,
            room: self.room.into_room()?,
            editor: self.editor.into_editor()?,
            customer_id: self.customer_id,
            project_id: self.project_id,
            contact_id: self.contact_id,
            date: self.date,
            planned,
            actual: self.actual,
            break_hours: self.break_hours,
            status: self.status,
            notes: self.notes,
        };
        Ok((draft, self.repeat_days))
    }
}

/// A fully parsed booking that has not been given an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingDraft {
    pub tenant: TenantId,
    pub room: RoomBinding,
    pub editor: EditorBinding,
    pub customer_id: Ulid,
    pub project_id: Ulid,
    pub contact_id: Option<Ulid>,
    pub date: NaiveDate,
    pub planned: TimeRange,
    pub actual: ActualTimes,
    pub break_hours: u32,
    pub status: BookingStatus,
    pub notes: String,
}

impl BookingDraft {
    pub fn into_booking(self, id: Ulid) -> Booking {
        Booking {
            id,
            tenant: self.tenant,
            room: self.room,
            editor: self.editor,
            customer_id: self.customer_id,
            project_id: self.project_id,
            contact_id: self.contact_id,
            date: self.date,
            planned: self.planned,
            actual: self.actual,
            break_hours: self.break_hours,
            status: self.status,
            notes: self.notes,
        }
    }
}

/// Partial edit of a stored booking. Absent fields keep their value.
///
/// `contact_id` distinguishes "leave alone" (absent) from "clear" (`null`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingPatch {
    #[serde(default)]
    pub room: Option<RawBinding>,
    #[serde(default)]
    pub editor: Option<RawBinding>,
    #[serde(default)]
    pub customer_id: Option<Ulid>,
    #[serde(default)]
    pub project_id: Option<Ulid>,
    #[serde(default, deserialize_with = "double_option")]
    pub contact_id: Option<Option<Ulid>>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub from_time: Option<ClockTime>,
    #[serde(default)]
    pub to_time: Option<ClockTime>,
    #[serde(default)]
    pub actual: Option<ActualTimes>,
    #[serde(default)]
    pub break_hours: Option<u32>,
    #[serde(default)]
    pub status: Option<BookingStatus>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl BookingPatch {
    pub fn status_only(status: BookingStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// The booking as it would look with this patch applied.
    ///
    /// Any status may move to any other. A patched `from_time` or `to_time` is combined
    /// with the stored other end and the pair must still be ordered.
    pub fn apply(self, current: &Booking) -> Result<Booking, EngineError> {
        let mut next = current.clone();
        if let Some(raw) = self.room {
            next.room = keep_identity(&current.room, raw.into_room()?);
        }
        if let Some(raw) = self.editor {
            next.editor = keep_identity(&current.editor, raw.into_editor()?);
        }
        if let Some(customer_id) = self.customer_id {
            next.customer_id = customer_id;
        }
        if let Some(project_id) = self.project_id {
            next.project_id = project_id;
        }
        if let Some(contact_id) = self.contact_id {
            next.contact_id = contact_id;
        }
        if let Some(date) = self.date {
            next.date = date;
        }
        if self.from_time.is_some() || self.to_time.is_some() {
            next.planned = TimeRange::new(
                self.from_time.unwrap_or(current.planned.from()),
                self.to_time.unwrap_or(current.planned.to()),
            )?;
        }
        if let Some(actual) = self.actual {
            actual.validate()?;
            next.actual = actual;
        }
        if let Some(break_hours) = self.break_hours {
            next.break_hours = break_hours;
        }
        if let Some(status) = self.status {
            next.status = status;
        }
        if let Some(notes) = self.notes {
            next.notes = notes;
        }
        Ok(next)
    }
}

/// Resubmitting the same system resource keeps the stored reference untouched.
fn keep_identity<D: Clone + PartialEq>(
    current: &ResourceBinding<D>,
    next: ResourceBinding<D>,
) -> ResourceBinding<D> {
    if same_binding(current, &next) {
        current.clone()
    } else {
        next
    }
}

/// Binding equality by what is held. System references compare by id only, since the
/// `ignore_conflict` snapshot is not part of the booking's identity.
pub fn same_binding<D: PartialEq>(a: &ResourceBinding<D>, b: &ResourceBinding<D>) -> bool {
    match (a, b) {
        (ResourceBinding::System(x), ResourceBinding::System(y)) => x.resource_id == y.resource_id,
        _ => a == b,
    }
}

/// What an edit touched, as far as revalidation is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Changes {
    /// Room, editor, date or planned interval moved. Only these rerun conflict detection.
    pub schedule: bool,
    /// Customer, project or contact moved. These rerun the referential checks.
    pub references: bool,
    pub status: bool,
}

impl Changes {
    pub fn between(old: &Booking, new: &Booking) -> Self {
        Self {
            schedule: !same_binding(&old.room, &new.room)
                || !same_binding(&old.editor, &new.editor)
                || old.date != new.date
                || old.planned != new.planned,
            references: old.customer_id != new.customer_id
                || old.project_id != new.project_id
                || old.contact_id != new.contact_id,
            status: old.status != new.status,
        }
    }
}
