use std::sync::Arc;

use super::*;
use crate::binding::RawBinding;
use crate::notify::{NoticeAction, NotifyHub};

struct Studio {
    store: Arc<InMemoryStore>,
    engine: Engine,
    tenant: TenantId,
    r101: Ulid,
    lounge: Ulid,
    e5: Ulid,
    e6: Ulid,
    customer: Ulid,
    project: Ulid,
    contact: Ulid,
    other_project: Ulid,
}

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn t(s: &str) -> ClockTime {
    s.parse().unwrap()
}

fn room(name: &str, ignore_conflict: bool) -> Room {
    Room {
        id: Ulid::new(),
        name: name.into(),
        room_type: "editing".into(),
        capacity: 2,
        is_active: true,
        ignore_conflict,
    }
}

fn editor(name: &str) -> Editor {
    Editor {
        id: Ulid::new(),
        name: name.into(),
        editor_type: "video".into(),
        phone: None,
        email: None,
        is_active: true,
        ignore_conflict: false,
    }
}

fn studio_for(store: Arc<InMemoryStore>, tenant: &str) -> Studio {
    let tenant = TenantId::new(tenant).unwrap();
    let r101 = room("R101", false);
    let lounge = room("Lounge", true);
    let e5 = editor("Rajesh Kumar");
    let e6 = editor("Priya Sharma");
    let customer = Customer {
        id: Ulid::new(),
        name: "Paramount Studios".into(),
        is_active: true,
    };
    let other_customer = Customer {
        id: Ulid::new(),
        name: "Silverscreen Productions".into(),
        is_active: true,
    };
    let project = Project {
        id: Ulid::new(),
        customer_id: customer.id,
        name: "Documentary 2025".into(),
    };
    let other_project = Project {
        id: Ulid::new(),
        customer_id: other_customer.id,
        name: "Wedding Film".into(),
    };
    let contact = Contact {
        id: Ulid::new(),
        customer_id: customer.id,
        name: "Arjun Mehta".into(),
        phone: Some("9876543210".into()),
        email: None,
    };

    let studio = Studio {
        engine: Engine::new(store.clone(), Arc::new(NotifyHub::new())),
        tenant: tenant.clone(),
        r101: r101.id,
        lounge: lounge.id,
        e5: e5.id,
        e6: e6.id,
        customer: customer.id,
        project: project.id,
        contact: contact.id,
        other_project: other_project.id,
        store,
    };
    let s = &studio.store;
    s.put_room(&tenant, r101).unwrap();
    s.put_room(&tenant, lounge).unwrap();
    s.put_editor(&tenant, e5).unwrap();
    s.put_editor(&tenant, e6).unwrap();
    s.put_customer(&tenant, customer).unwrap();
    s.put_customer(&tenant, other_customer).unwrap();
    s.put_project(&tenant, project).unwrap();
    s.put_project(&tenant, other_project).unwrap();
    s.put_contact(&tenant, contact).unwrap();
    studio
}

fn studio() -> Studio {
    studio_for(Arc::new(InMemoryStore::new()), "prism")
}

impl Studio {
    fn request(
        &self,
        room: RawBinding,
        editor: RawBinding,
        day: &str,
        from: &str,
        to: &str,
    ) -> BookingRequest {
        BookingRequest {
            tenant: self.tenant.clone(),
            room,
            editor,
            customer_id: self.customer,
            project_id: self.project,
            contact_id: Some(self.contact),
            date: date(day),
            from_time: t(from),
            to_time: t(to),
            actual: ActualTimes::default(),
            break_hours: 0,
            status: BookingStatus::Planning,
            notes: String::new(),
            repeat_days: 0,
        }
    }

    fn book_room(&self, room: Ulid, day: &str, from: &str, to: &str) -> Booking {
        let outcome = self
            .engine
            .create_booking(
                self.request(RawBinding::system(room), RawBinding::default(), day, from, to),
                ConflictPolicy::Force,
            )
            .unwrap();
        outcome.created().next().unwrap().clone()
    }

    fn query(
        &self,
        room: RawBinding,
        editor: RawBinding,
        day: &str,
        from: &str,
        to: &str,
    ) -> ConflictQuery {
        ConflictQuery {
            tenant: self.tenant.clone(),
            room,
            editor,
            date: Some(date(day)),
            from_time: Some(t(from)),
            to_time: Some(t(to)),
            exclude_booking_id: None,
        }
    }

    fn leave(&self, editor: Ulid, from: &str, to: &str) -> LeaveRecord {
        let leave = LeaveRecord::new(
            Ulid::new(),
            editor,
            date(from),
            date(to),
            Some("Medical leave".into()),
        )
        .unwrap();
        self.store.put_leave(&self.tenant, leave.clone()).unwrap();
        leave
    }
}

// ── Conflict checks ──────────────────────────────────────

#[test]
fn r101_overlap_conflicts_and_adjacent_is_clear() {
    let s = studio();
    let existing = s.book_room(s.r101, "2025-12-04", "09:00", "13:00");

    let overlap = s.engine.check_conflicts(&s.query(
        RawBinding::system(s.r101),
        RawBinding::default(),
        "2025-12-04",
        "12:00",
        "14:00",
    ));
    assert!(overlap.checked);
    assert!(overlap.has_conflict);
    assert_eq!(overlap.conflicts.len(), 1);
    assert_eq!(overlap.conflicts[0].resource_kind, ResourceKind::Room);
    assert_eq!(overlap.conflicts[0].conflicting_booking_id, existing.id);

    let adjacent = s.engine.check_conflicts(&s.query(
        RawBinding::system(s.r101),
        RawBinding::default(),
        "2025-12-04",
        "13:00",
        "15:00",
    ));
    assert!(adjacent.checked);
    assert!(!adjacent.has_conflict);
}

#[test]
fn other_date_does_not_conflict() {
    let s = studio();
    s.book_room(s.r101, "2025-12-04", "09:00", "13:00");
    let verdict = s.engine.check_conflicts(&s.query(
        RawBinding::system(s.r101),
        RawBinding::default(),
        "2025-12-05",
        "09:00",
        "13:00",
    ));
    assert!(!verdict.has_conflict);
}

#[test]
fn editor_on_leave_without_any_booking() {
    let s = studio();
    let leave = s.leave(s.e5, "2025-12-10", "2025-12-12");

    let verdict = s.engine.check_conflicts(&s.query(
        RawBinding::default(),
        RawBinding::system(s.e5),
        "2025-12-11",
        "10:00",
        "12:00",
    ));
    assert!(verdict.checked);
    assert!(!verdict.has_conflict);
    assert!(verdict.editor_on_leave);
    assert_eq!(verdict.leave_info, Some(leave));

    let after = s.engine.check_conflicts(&s.query(
        RawBinding::default(),
        RawBinding::system(s.e5),
        "2025-12-13",
        "10:00",
        "12:00",
    ));
    assert!(!after.editor_on_leave);
}

#[test]
fn room_and_editor_conflicts_both_reported() {
    let s = studio();
    let first = s
        .engine
        .create_booking(
            s.request(
                RawBinding::system(s.r101),
                RawBinding::system(s.e5),
                "2025-12-04",
                "09:00",
                "13:00",
            ),
            ConflictPolicy::Skip,
        )
        .unwrap();
    let existing = first.created().next().unwrap().id;

    let verdict = s.engine.check_conflicts(&s.query(
        RawBinding::system(s.r101),
        RawBinding::system(s.e5),
        "2025-12-04",
        "10:00",
        "11:00",
    ));
    let kinds: Vec<ResourceKind> = verdict.conflicts.iter().map(|c| c.resource_kind).collect();
    assert_eq!(kinds, [ResourceKind::Room, ResourceKind::Editor]);
    assert!(verdict.conflicts.iter().all(|c| c.conflicting_booking_id == existing));
}

#[test]
fn ignore_conflict_room_never_conflicts() {
    let s = studio();
    for _ in 0..3 {
        s.book_room(s.lounge, "2025-12-04", "09:00", "17:00");
    }
    let verdict = s.engine.check_conflicts(&s.query(
        RawBinding::system(s.lounge),
        RawBinding::default(),
        "2025-12-04",
        "10:00",
        "11:00",
    ));
    assert!(verdict.checked);
    assert!(!verdict.has_conflict);
}

#[test]
fn ignore_flag_is_read_from_registry_not_booking() {
    let s = studio();
    s.book_room(s.r101, "2025-12-04", "09:00", "13:00");

    let mut r101 = s.store.get_room(&s.tenant, s.r101).unwrap();
    r101.ignore_conflict = true;
    s.store.put_room(&s.tenant, r101).unwrap();

    let verdict = s.engine.check_conflicts(&s.query(
        RawBinding::system(s.r101),
        RawBinding::default(),
        "2025-12-04",
        "10:00",
        "11:00",
    ));
    assert!(!verdict.has_conflict);
}

#[test]
fn ignore_flag_does_not_hide_leave() {
    let s = studio();
    let mut e6 = s.store.get_editor(&s.tenant, s.e6).unwrap();
    e6.ignore_conflict = true;
    s.store.put_editor(&s.tenant, e6).unwrap();
    s.leave(s.e6, "2025-12-20", "2025-12-20");

    let verdict = s.engine.check_conflicts(&s.query(
        RawBinding::default(),
        RawBinding::system(s.e6),
        "2025-12-20",
        "10:00",
        "11:00",
    ));
    assert!(verdict.editor_on_leave);
}

#[test]
fn self_exclusion_on_recheck() {
    let s = studio();
    let existing = s.book_room(s.r101, "2025-12-04", "09:00", "13:00");
    let mut query = s.query(
        RawBinding::system(s.r101),
        RawBinding::default(),
        "2025-12-04",
        "09:00",
        "13:00",
    );
    assert!(s.engine.check_conflicts(&query).has_conflict);
    query.exclude_booking_id = Some(existing.id);
    let verdict = s.engine.check_conflicts(&query);
    assert!(verdict.checked);
    assert!(!verdict.has_conflict);
}

#[test]
fn client_supplied_resources_are_immune() {
    let s = studio();
    for _ in 0..2 {
        s.engine
            .create_booking(
                s.request(
                    RawBinding::client("Paramount Studios"),
                    RawBinding::client("Kavya Sharma"),
                    "2025-12-04",
                    "09:00",
                    "13:00",
                ),
                ConflictPolicy::Skip,
            )
            .unwrap();
    }
    let verdict = s.engine.check_conflicts(&s.query(
        RawBinding::client("Paramount Studios"),
        RawBinding::client("Kavya Sharma"),
        "2025-12-04",
        "09:00",
        "13:00",
    ));
    assert!(!verdict.checked);
    assert!(verdict.conflicts.is_empty());
}

#[test]
fn tenants_never_see_each_other() {
    let store = Arc::new(InMemoryStore::new());
    let prism = studio_for(store.clone(), "prism");
    let airavata = studio_for(store, "airavata");
    prism.book_room(prism.r101, "2025-12-04", "09:00", "13:00");

    // Same resource id under another tenant is a different calendar.
    let verdict = airavata.engine.check_conflicts(&ConflictQuery {
        tenant: airavata.tenant.clone(),
        ..prism.query(
            RawBinding::system(prism.r101),
            RawBinding::default(),
            "2025-12-04",
            "09:00",
            "13:00",
        )
    });
    assert!(!verdict.has_conflict);
    assert!(airavata.engine.list_bookings(&airavata.tenant, None).is_empty());
}

#[test]
fn incomplete_query_is_unchecked_not_an_error() {
    let s = studio();
    let mut query = s.query(
        RawBinding::system(s.r101),
        RawBinding::default(),
        "2025-12-04",
        "13:00",
        "09:00",
    );
    assert_eq!(s.engine.check_conflicts(&query), ConflictVerdict::unchecked());

    query.from_time = None;
    assert!(!s.engine.check_conflicts(&query).checked);

    // A malformed binding is treated as unassigned.
    let garbled = ConflictQuery {
        room: RawBinding {
            resource_id: Some(s.r101),
            ..RawBinding::default()
        },
        ..s.query(RawBinding::default(), RawBinding::default(), "2025-12-04", "09:00", "10:00")
    };
    assert!(!s.engine.check_conflicts(&garbled).checked);
}

// ── Creation ─────────────────────────────────────────────

#[test]
fn create_captures_registry_ignore_flag() {
    let s = studio();
    let booking = s.book_room(s.lounge, "2025-12-04", "09:00", "10:00");
    assert!(booking.room.system().unwrap().ignore_conflict);
    assert_eq!(s.engine.get_booking(&s.tenant, booking.id).unwrap(), booking);
}

#[test]
fn create_rejects_unknown_or_inactive_resource() {
    let s = studio();
    let ghost = Ulid::new();
    let err = s
        .engine
        .create_booking(
            s.request(
                RawBinding::system(ghost),
                RawBinding::default(),
                "2025-12-04",
                "09:00",
                "10:00",
            ),
            ConflictPolicy::Skip,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::UnknownResource { kind: ResourceKind::Room, id } if id == ghost
    ));

    let mut e5 = s.store.get_editor(&s.tenant, s.e5).unwrap();
    e5.is_active = false;
    s.store.put_editor(&s.tenant, e5).unwrap();
    let err = s
        .engine
        .create_booking(
            s.request(
                RawBinding::default(),
                RawBinding::system(s.e5),
                "2025-12-04",
                "09:00",
                "10:00",
            ),
            ConflictPolicy::Skip,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::UnknownResource { kind: ResourceKind::Editor, .. }
    ));
    assert!(s.engine.list_bookings(&s.tenant, None).is_empty());
}

#[test]
fn create_rejects_mismatched_references() {
    let s = studio();
    let mut req = s.request(
        RawBinding::default(),
        RawBinding::default(),
        "2025-12-04",
        "09:00",
        "10:00",
    );
    req.project_id = s.other_project;
    assert!(matches!(
        s.engine.create_booking(req, ConflictPolicy::Skip),
        Err(EngineError::ReferentialMismatch(_))
    ));

    let mut req = s.request(
        RawBinding::default(),
        RawBinding::default(),
        "2025-12-04",
        "09:00",
        "10:00",
    );
    req.contact_id = Some(Ulid::new());
    assert!(matches!(
        s.engine.create_booking(req, ConflictPolicy::Skip),
        Err(EngineError::ReferentialMismatch(_))
    ));
}

#[test]
fn create_rejects_invalid_binding_and_interval() {
    let s = studio();
    let bad = RawBinding {
        source: Some(crate::binding::BindingSource::System),
        ..RawBinding::default()
    };
    assert!(matches!(
        s.engine.create_booking(
            s.request(bad, RawBinding::default(), "2025-12-04", "09:00", "10:00"),
            ConflictPolicy::Skip
        ),
        Err(EngineError::InvalidBinding(_))
    ));
    assert!(matches!(
        s.engine.create_booking(
            s.request(RawBinding::default(), RawBinding::default(), "2025-12-04", "10:00", "10:00"),
            ConflictPolicy::Skip
        ),
        Err(EngineError::InvalidInterval { .. })
    ));
}

#[test]
fn create_enforces_limits() {
    let s = studio();
    let mut req = s.request(
        RawBinding::default(),
        RawBinding::default(),
        "2025-12-04",
        "09:00",
        "10:00",
    );
    req.notes = "x".repeat(crate::limits::MAX_NOTES_LEN + 1);
    assert!(matches!(
        s.engine.create_booking(req, ConflictPolicy::Skip),
        Err(EngineError::LimitExceeded(_))
    ));

    let mut req = s.request(
        RawBinding::default(),
        RawBinding::default(),
        "2025-12-04",
        "09:00",
        "10:00",
    );
    req.repeat_days = crate::limits::MAX_REPEAT_DAYS + 1;
    assert!(matches!(
        s.engine.create_booking(req, ConflictPolicy::Skip),
        Err(EngineError::LimitExceeded(_))
    ));
}

#[test]
fn single_blocked_create_under_skip_commits_nothing() {
    let s = studio();
    s.book_room(s.r101, "2025-12-04", "09:00", "13:00");
    let outcome = s
        .engine
        .create_booking(
            s.request(
                RawBinding::system(s.r101),
                RawBinding::default(),
                "2025-12-04",
                "12:00",
                "14:00",
            ),
            ConflictPolicy::Skip,
        )
        .unwrap();
    assert_eq!(outcome.created_count(), 0);
    assert_eq!(outcome.skipped_dates(), vec![date("2025-12-04")]);
    assert!(outcome.days[0].verdict.has_conflict);
    assert_eq!(s.engine.list_bookings(&s.tenant, None).len(), 1);
}

// ── Series ───────────────────────────────────────────────

fn series_request(s: &Studio) -> BookingRequest {
    let mut req = s.request(
        RawBinding::system(s.r101),
        RawBinding::system(s.e5),
        "2025-12-01",
        "09:00",
        "13:00",
    );
    req.repeat_days = 4;
    req
}

#[test]
fn series_skip_creates_clear_dates_and_reports_blocked() {
    let s = studio();
    s.book_room(s.r101, "2025-12-03", "10:00", "11:00");

    let outcome = s
        .engine
        .create_booking(series_request(&s), ConflictPolicy::Skip)
        .unwrap();
    assert_eq!(outcome.days.len(), 5);
    assert_eq!(outcome.created_count(), 4);
    assert_eq!(outcome.skipped_dates(), vec![date("2025-12-03")]);

    let dates: Vec<NaiveDate> = outcome.created().map(|b| b.date).collect();
    assert_eq!(
        dates,
        ["2025-12-01", "2025-12-02", "2025-12-04", "2025-12-05"].map(date)
    );
    // Every created booking is an independent record with its own id.
    let mut ids: Vec<Ulid> = outcome.created().map(|b| b.id).collect();
    ids.dedup();
    assert_eq!(ids.len(), 4);
}

#[test]
fn series_leave_day_is_skipped() {
    let s = studio();
    s.leave(s.e5, "2025-12-02", "2025-12-02");
    let outcome = s
        .engine
        .create_booking(series_request(&s), ConflictPolicy::Skip)
        .unwrap();
    assert_eq!(outcome.skipped_dates(), vec![date("2025-12-02")]);
    assert!(outcome.days[1].verdict.editor_on_leave);
    assert!(!outcome.days[1].verdict.has_conflict);
}

#[test]
fn series_abort_commits_nothing() {
    let s = studio();
    s.book_room(s.r101, "2025-12-03", "10:00", "11:00");
    let outcome = s
        .engine
        .create_booking(series_request(&s), ConflictPolicy::Abort)
        .unwrap();
    assert!(outcome.aborted());
    assert_eq!(outcome.created_count(), 0);
    assert!(outcome.days.iter().all(|d| d.disposition == Disposition::Aborted));
    assert_eq!(s.engine.list_bookings(&s.tenant, None).len(), 1);
}

#[test]
fn series_force_commits_every_date_with_verdicts() {
    let s = studio();
    s.book_room(s.r101, "2025-12-03", "10:00", "11:00");
    let outcome = s
        .engine
        .create_booking(series_request(&s), ConflictPolicy::Force)
        .unwrap();
    assert_eq!(outcome.created_count(), 5);
    assert!(outcome.days[2].verdict.has_conflict);
    assert_eq!(s.engine.list_bookings(&s.tenant, None).len(), 6);
}

// ── Updates ──────────────────────────────────────────────

#[test]
fn status_only_update_skips_recheck() {
    let s = studio();
    let a = s.book_room(s.r101, "2025-12-04", "09:00", "13:00");
    // Forced double booking: a recheck of `b` would conflict with `a`.
    let b = s.book_room(s.r101, "2025-12-04", "10:00", "12:00");

    let outcome = s
        .engine
        .update_booking(
            &s.tenant,
            b.id,
            BookingPatch::status_only(BookingStatus::Confirmed),
            ConflictPolicy::Skip,
        )
        .unwrap();
    assert!(outcome.applied);
    assert!(outcome.verdict.is_none());
    assert_eq!(outcome.booking.status, BookingStatus::Confirmed);
    assert_eq!(s.engine.get_booking(&s.tenant, a.id).unwrap().status, BookingStatus::Planning);
}

#[test]
fn shrinking_within_own_slot_does_not_self_conflict() {
    let s = studio();
    let booking = s.book_room(s.r101, "2025-12-04", "09:00", "13:00");
    let patch = BookingPatch {
        from_time: Some(t("09:30")),
        ..BookingPatch::default()
    };
    let shrunk = s
        .engine
        .update_booking(&s.tenant, booking.id, patch, ConflictPolicy::Skip)
        .unwrap();
    assert!(shrunk.applied);
    let verdict = shrunk.verdict.unwrap();
    assert!(verdict.checked && !verdict.has_conflict);
    assert_eq!(shrunk.booking.planned.to_string(), "09:30-13:00");
}

#[test]
fn moving_date_reindexes() {
    let s = studio();
    let booking = s.book_room(s.r101, "2025-12-04", "09:00", "13:00");
    let patch = BookingPatch {
        date: Some(date("2025-12-05")),
        ..BookingPatch::default()
    };
    let moved = s
        .engine
        .update_booking(&s.tenant, booking.id, patch, ConflictPolicy::Skip)
        .unwrap();
    assert!(moved.applied);
    assert!(s.engine.list_bookings(&s.tenant, Some(date("2025-12-04"))).is_empty());
    assert_eq!(s.engine.list_bookings(&s.tenant, Some(date("2025-12-05"))).len(), 1);
}

#[test]
fn schedule_update_into_conflict_is_held_back() {
    let s = studio();
    s.book_room(s.r101, "2025-12-04", "09:00", "13:00");
    let later = s.book_room(s.r101, "2025-12-04", "14:00", "16:00");

    let patch = BookingPatch {
        from_time: Some(t("12:00")),
        ..BookingPatch::default()
    };
    let held = s
        .engine
        .update_booking(&s.tenant, later.id, patch.clone(), ConflictPolicy::Skip)
        .unwrap();
    assert!(!held.applied);
    assert!(held.verdict.as_ref().unwrap().has_conflict);
    assert_eq!(held.booking, later);
    assert_eq!(s.engine.get_booking(&s.tenant, later.id).unwrap(), later);

    let forced = s
        .engine
        .update_booking(&s.tenant, later.id, patch, ConflictPolicy::Force)
        .unwrap();
    assert!(forced.applied);
    assert_eq!(forced.booking.planned.to_string(), "12:00-16:00");
}

#[test]
fn update_to_unknown_room_fails() {
    let s = studio();
    let booking = s.book_room(s.r101, "2025-12-04", "09:00", "13:00");
    let patch = BookingPatch {
        room: Some(RawBinding::system(Ulid::new())),
        ..BookingPatch::default()
    };
    assert!(matches!(
        s.engine.update_booking(&s.tenant, booking.id, patch, ConflictPolicy::Force),
        Err(EngineError::UnknownResource { .. })
    ));
}

#[test]
fn moving_onto_deactivated_room_fails() {
    let s = studio();
    let booking = s.book_room(s.r101, "2025-12-04", "09:00", "13:00");
    let mut r101 = s.store.get_room(&s.tenant, s.r101).unwrap();
    r101.is_active = false;
    s.store.put_room(&s.tenant, r101).unwrap();

    let patch = BookingPatch {
        date: Some(date("2025-12-05")),
        ..BookingPatch::default()
    };
    assert!(matches!(
        s.engine.update_booking(&s.tenant, booking.id, patch, ConflictPolicy::Force),
        Err(EngineError::UnknownResource { kind: ResourceKind::Room, .. })
    ));
    assert_eq!(s.engine.get_booking(&s.tenant, booking.id).unwrap().date, date("2025-12-04"));

    // Status edits leave the slot alone and still go through.
    let confirmed = s
        .engine
        .update_booking(
            &s.tenant,
            booking.id,
            BookingPatch::status_only(BookingStatus::Confirmed),
            ConflictPolicy::Skip,
        )
        .unwrap();
    assert!(confirmed.applied);
}

#[test]
fn update_references_are_checked() {
    let s = studio();
    let booking = s.book_room(s.r101, "2025-12-04", "09:00", "13:00");
    let patch = BookingPatch {
        project_id: Some(s.other_project),
        ..BookingPatch::default()
    };
    assert!(matches!(
        s.engine.update_booking(&s.tenant, booking.id, patch, ConflictPolicy::Skip),
        Err(EngineError::ReferentialMismatch(_))
    ));
}

#[test]
fn update_and_delete_missing_booking() {
    let s = studio();
    let id = Ulid::new();
    assert!(matches!(
        s.engine.update_booking(&s.tenant, id, BookingPatch::default(), ConflictPolicy::Skip),
        Err(EngineError::NotFound(_))
    ));
    assert!(matches!(
        s.engine.delete_booking(&s.tenant, id),
        Err(EngineError::NotFound(_))
    ));
}

#[test]
fn delete_frees_the_slot_and_keeps_history() {
    let s = studio();
    let booking = s.book_room(s.r101, "2025-12-04", "09:00", "13:00");
    s.engine
        .update_booking(
            &s.tenant,
            booking.id,
            BookingPatch::status_only(BookingStatus::Tentative),
            ConflictPolicy::Skip,
        )
        .unwrap();
    s.engine.delete_booking(&s.tenant, booking.id).unwrap();

    let verdict = s.engine.check_conflicts(&s.query(
        RawBinding::system(s.r101),
        RawBinding::default(),
        "2025-12-04",
        "09:00",
        "13:00",
    ));
    assert!(!verdict.has_conflict);

    let history = s.engine.booking_history(&s.tenant, booking.id).unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[2].action, BookingAction::Deleted);
    assert!(matches!(
        s.engine.get_booking(&s.tenant, booking.id),
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn listeners_hear_committed_changes() {
    let s = studio();
    let mut rx = s.engine.notify.subscribe(&s.tenant);

    let booking = s.book_room(s.r101, "2025-12-04", "09:00", "13:00");
    s.engine.delete_booking(&s.tenant, booking.id).unwrap();

    let created = rx.recv().await.unwrap();
    assert_eq!(created.action, NoticeAction::Created);
    assert_eq!(created.booking_id, booking.id);
    let deleted = rx.recv().await.unwrap();
    assert_eq!(deleted.action, NoticeAction::Deleted);
    assert_eq!(deleted.date, date("2025-12-04"));
}

#[test]
fn journaled_engine_survives_restart() {
    let dir = std::env::temp_dir().join("editbay_test_engine");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("restart.journal");
    let _ = std::fs::remove_file(&path);

    let (tenant, r101, booking) = {
        let s = studio_for(Arc::new(InMemoryStore::open(&path, 0).unwrap()), "prism");
        let booking = s.book_room(s.r101, "2025-12-04", "09:00", "13:00");
        (s.tenant.clone(), s.r101, booking)
    };

    let store = Arc::new(InMemoryStore::open(&path, 0).unwrap());
    let engine = Engine::new(store, Arc::new(NotifyHub::new()));
    assert_eq!(engine.get_booking(&tenant, booking.id).unwrap(), booking);
    let verdict = engine.check_conflicts(&ConflictQuery {
        tenant,
        room: RawBinding::system(r101),
        editor: RawBinding::default(),
        date: Some(date("2025-12-04")),
        from_time: Some(t("12:00")),
        to_time: Some(t("14:00")),
        exclude_booking_id: None,
    });
    assert!(verdict.has_conflict);
}
