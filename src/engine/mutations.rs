use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use ulid::Ulid;

use crate::model::*;
use crate::notify::{BookingNotice, NoticeAction};

use super::lifecycle::{BookingDraft, BookingPatch, BookingRequest, Changes};
use super::series::{self, ConflictPolicy, Disposition, SeriesDay, SeriesOutcome};
use super::{check_limits, ConflictVerdict, Engine, EngineError};

/// Result of an edit. `applied` is false when a blocking verdict held the change back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    /// The booking as stored after the call.
    pub booking: Booking,
    pub applied: bool,
    /// Present only when a scheduling field changed and the detector ran.
    pub verdict: Option<ConflictVerdict>,
}

impl Engine {
    /// Validate, expand, check each date independently, then commit per `policy`.
    ///
    /// Validation failures reject the whole request before any store access. After that,
    /// every date of the series is reported with its verdict and what happened to it.
    pub fn create_booking(
        &self,
        request: BookingRequest,
        policy: ConflictPolicy,
    ) -> Result<SeriesOutcome, EngineError> {
        let (draft, repeat_days) = request.into_draft()?;
        check_limits(&draft.notes, draft.break_hours)?;
        let tenant = draft.tenant.clone();
        let draft = BookingDraft {
            room: self.resolve_room(&tenant, draft.room.clone())?,
            editor: self.resolve_editor(&tenant, draft.editor.clone())?,
            ..draft
        };
        self.check_references(&tenant, draft.customer_id, draft.project_id, draft.contact_id)?;

        let drafts = series::expand(&draft, repeat_days)?;
        let verdicts: Vec<ConflictVerdict> = drafts
            .iter()
            .map(|d| {
                self.verdict_for(&tenant, &d.room, &d.editor, Some(d.date), Some(d.planned), None)
            })
            .collect();
        let commit = series::plan(policy, &verdicts);
        let aborting = policy == ConflictPolicy::Abort && commit.iter().any(|c| !c);

        let mut outcome = SeriesOutcome::default();
        for ((draft, verdict), commit) in drafts.into_iter().zip(verdicts).zip(commit) {
            let date = draft.date;
            let disposition = if commit {
                self.commit_new(draft)
            } else if aborting {
                Disposition::Aborted
            } else {
                metrics::counter!(crate::observability::SERIES_DATES_SKIPPED_TOTAL).increment(1);
                info!("skipped {date} for tenant {tenant}: {}", verdict.outcome());
                Disposition::Skipped
            };
            outcome.days.push(SeriesDay {
                date,
                verdict,
                disposition,
            });
        }
        if aborting {
            info!("series for tenant {tenant} aborted: a date was blocked");
        }
        Ok(outcome)
    }

    fn commit_new(&self, draft: BookingDraft) -> Disposition {
        let booking = draft.into_booking(Ulid::new());
        match self.bookings.insert(booking.clone()) {
            Ok(()) => {
                metrics::counter!(crate::observability::BOOKINGS_CREATED_TOTAL).increment(1);
                info!(
                    "booking {} created for tenant {} on {} {}",
                    booking.id, booking.tenant, booking.date, booking.planned
                );
                self.notify.send(
                    &booking.tenant,
                    BookingNotice {
                        action: NoticeAction::Created,
                        booking_id: booking.id,
                        date: booking.date,
                    },
                );
                Disposition::Created { booking }
            }
            Err(e) => {
                let err = EngineError::from(e);
                warn!("booking commit on {} failed: {err}", booking.date);
                Disposition::Failed {
                    kind: err.kind().to_string(),
                    message: err.to_string(),
                }
            }
        }
    }

    /// Apply `patch` to a stored booking.
    ///
    /// Conflict detection reruns (excluding the booking itself) only when room, editor,
    /// date or planned interval actually change value; a status-only edit is never held
    /// back. Under `skip` and `abort` a blocked edit is not applied; `force` applies it.
    pub fn update_booking(
        &self,
        tenant: &TenantId,
        id: Ulid,
        patch: BookingPatch,
        policy: ConflictPolicy,
    ) -> Result<UpdateOutcome, EngineError> {
        let current = self
            .bookings
            .get(tenant, id)
            .ok_or(EngineError::NotFound(id))?;
        let mut next = patch.apply(&current)?;
        check_limits(&next.notes, next.break_hours)?;

        let changes = Changes::between(&current, &next);
        // A moved slot must still sit on resources that exist and are active.
        if changes.schedule {
            next.room = self.resolve_room(tenant, next.room)?;
            next.editor = self.resolve_editor(tenant, next.editor)?;
        }
        if changes.references {
            self.check_references(tenant, next.customer_id, next.project_id, next.contact_id)?;
        }

        let verdict = changes.schedule.then(|| {
            self.verdict_for(
                tenant,
                &next.room,
                &next.editor,
                Some(next.date),
                Some(next.planned),
                Some(id),
            )
        });
        let blocked = verdict.as_ref().is_some_and(ConflictVerdict::is_blocking);
        if blocked && policy != ConflictPolicy::Force {
            info!("update of booking {id} held back: blocked");
            return Ok(UpdateOutcome {
                booking: current,
                applied: false,
                verdict,
            });
        }

        if next != current {
            self.bookings.replace(next.clone())?;
            info!("booking {id} updated for tenant {tenant}");
            self.notify.send(
                tenant,
                BookingNotice {
                    action: NoticeAction::Updated,
                    booking_id: id,
                    date: next.date,
                },
            );
        }
        Ok(UpdateOutcome {
            booking: next,
            applied: true,
            verdict,
        })
    }

    pub fn delete_booking(&self, tenant: &TenantId, id: Ulid) -> Result<Booking, EngineError> {
        let removed = self
            .bookings
            .remove(tenant, id)?
            .ok_or(EngineError::NotFound(id))?;
        info!("booking {id} deleted for tenant {tenant}");
        self.notify.send(
            tenant,
            BookingNotice {
                action: NoticeAction::Deleted,
                booking_id: id,
                date: removed.date,
            },
        );
        Ok(removed)
    }
}
