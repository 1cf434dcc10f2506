use chrono::NaiveDate;
use serde::Deserialize;
use ulid::Ulid;

use crate::binding::RawBinding;
use crate::model::*;

use super::{ConflictVerdict, Engine, EngineError};

/// A possibly incomplete candidate, as a form would send it while still being filled in.
#[derive(Debug, Clone, Deserialize)]
pub struct ConflictQuery {
    pub tenant: TenantId,
    #[serde(default)]
    pub room: RawBinding,
    #[serde(default)]
    pub editor: RawBinding,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub from_time: Option<ClockTime>,
    #[serde(default)]
    pub to_time: Option<ClockTime>,
    #[serde(default)]
    pub exclude_booking_id: Option<Ulid>,
}

impl Engine {
    /// Never fails. A binding that does not parse counts as unassigned and a missing or
    /// inverted interval yields an unchecked verdict.
    pub fn check_conflicts(&self, query: &ConflictQuery) -> ConflictVerdict {
        let room = query.room.clone().into_room().unwrap_or_default();
        let editor = query.editor.clone().into_editor().unwrap_or_default();
        let planned = match (query.from_time, query.to_time) {
            (Some(from), Some(to)) => TimeRange::new(from, to).ok(),
            _ => None,
        };
        self.verdict_for(
            &query.tenant,
            &room,
            &editor,
            query.date,
            planned,
            query.exclude_booking_id,
        )
    }

    pub fn get_booking(&self, tenant: &TenantId, id: Ulid) -> Result<Booking, EngineError> {
        self.bookings
            .get(tenant, id)
            .ok_or(EngineError::NotFound(id))
    }

    /// Ordered by date, then start time.
    pub fn list_bookings(&self, tenant: &TenantId, date: Option<NaiveDate>) -> Vec<Booking> {
        self.bookings.list(tenant, date)
    }

    /// Audit trail, oldest first. Kept after deletion.
    pub fn booking_history(
        &self,
        tenant: &TenantId,
        id: Ulid,
    ) -> Result<Vec<BookingLogEntry>, EngineError> {
        let history = self.bookings.history(tenant, id);
        if history.is_empty() {
            return Err(EngineError::NotFound(id));
        }
        Ok(history)
    }
}
