use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::{LeaveRecord, TenantId};

use super::store::LeaveStore;

/// The earliest-starting leave of `editor_id` covering `date`, if any.
///
/// Leaves of one editor are not supposed to overlap, so which record wins only matters
/// when that rule was broken upstream.
pub fn is_on_leave(
    store: &dyn LeaveStore,
    tenant: &TenantId,
    editor_id: Ulid,
    date: NaiveDate,
) -> Option<LeaveRecord> {
    store
        .find_by_editor_and_date(tenant, editor_id, date)
        .into_iter()
        .filter(|leave| leave.editor_id == editor_id && leave.covers(date))
        .min_by_key(|leave| leave.from_date)
}
