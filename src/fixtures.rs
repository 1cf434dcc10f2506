//! Demo data for a fresh tenant. Loading is idempotent: a tenant that already has rooms
//! is left alone, so restarting a server with demo fixtures enabled never duplicates data.

use chrono::NaiveDate;
use tracing::info;
use ulid::Ulid;

use crate::binding::RawBinding;
use crate::engine::{BookingRequest, ConflictPolicy, Engine, EngineError, InMemoryStore};
use crate::model::BookingStatus::{Confirmed, Planning, Tentative};
use crate::model::*;

use self::Slot::{ClientEditor, ClientRoom, System};

const ROOMS: &[(&str, &str, u32)] = &[
    ("Studio A", "editing", 2),
    ("Studio B", "editing", 3),
    ("Sound Room", "sound", 1),
    ("VFX Lab", "vfx", 4),
    ("Music Room", "music", 2),
    ("Dubbing Theater", "dubbing", 6),
    ("Mixing Suite", "mixing", 2),
];

const EDITORS: &[(&str, &str, &str, &str)] = &[
    ("Rahul Gupta", "video", "9876543220", "rahul@editors.com"),
    ("Priya Desai", "audio", "9876543221", "priya@editors.com"),
    ("Arjun Singh", "vfx", "9876543222", "arjun@editors.com"),
    ("Divya Nair", "colorist", "9876543223", "divya@editors.com"),
    ("Sanjay Reddy", "di", "9876543224", "sanjay@editors.com"),
];

const CUSTOMERS: &[&str] = &[
    "Bollywood Productions",
    "Digital Stories",
    "Epic Entertainment",
    "Creative Minds",
];

/// (name, customer index)
const PROJECTS: &[(&str, usize)] = &[
    ("Action Movie - 2025", 0),
    ("Web Series - Season 1", 1),
    ("Ad Campaign - Spring", 2),
    ("Movie Teaser Pack", 0),
    ("Serial - Daily Episodes", 1),
];

/// (customer index, name, phone, email)
const CONTACTS: &[(usize, &str, &str, &str)] = &[
    (0, "Rajesh Kumar", "9876543214", "rajesh@bollywood.com"),
    (0, "Priya Singh", "9876543215", "priya@bollywood.com"),
    (1, "Amit Verma", "9876543216", "amit@digitalstories.com"),
    (2, "Neha Sharma", "9876543217", "neha@epicent.com"),
    (3, "Vikram Patel", "9876543218", "vikram@creativeminds.com"),
];

/// (editor index, from, to, reason)
const LEAVES: &[(usize, &str, &str, &str)] = &[
    (0, "2025-12-25", "2025-12-31", "Holiday break"),
    (1, "2025-12-15", "2025-12-17", "Personal leave"),
    (2, "2025-12-10", "2025-12-12", "Medical leave"),
];

enum Slot {
    None,
    System(usize),
    ClientRoom(&'static str, &'static str),
    ClientEditor(&'static str, &'static str, &'static str, &'static str),
}

struct DemoBooking {
    room: Slot,
    editor: Slot,
    /// (customer, project, contact) indexes
    refs: (usize, usize, usize),
    date: &'static str,
    from: &'static str,
    to: &'static str,
    status: BookingStatus,
    notes: &'static str,
}

const BOOKINGS: &[DemoBooking] = &[
    DemoBooking {
        room: System(0),
        editor: System(0),
        refs: (0, 0, 0),
        date: "2025-12-04",
        from: "09:00",
        to: "13:00",
        status: Confirmed,
        notes: "Main editing session",
    },
    DemoBooking {
        room: System(1),
        editor: System(1),
        refs: (1, 1, 2),
        date: "2025-12-04",
        from: "14:00",
        to: "18:00",
        status: Confirmed,
        notes: "Audio mixing",
    },
    DemoBooking {
        room: System(2),
        editor: System(2),
        refs: (2, 2, 3),
        date: "2025-12-04",
        from: "08:00",
        to: "10:00",
        status: Planning,
        notes: "Quick VFX consultation",
    },
    DemoBooking {
        room: System(3),
        editor: System(3),
        refs: (1, 1, 2),
        date: "2025-12-04",
        from: "10:30",
        to: "12:30",
        status: Tentative,
        notes: "Color correction work",
    },
    DemoBooking {
        room: System(4),
        editor: System(4),
        refs: (0, 3, 0),
        date: "2025-12-04",
        from: "15:00",
        to: "17:00",
        status: Planning,
        notes: "Music selection session",
    },
    DemoBooking {
        room: System(2),
        editor: System(2),
        refs: (0, 0, 1),
        date: "2025-12-05",
        from: "10:00",
        to: "15:00",
        status: Tentative,
        notes: "VFX work",
    },
    DemoBooking {
        room: System(3),
        editor: System(3),
        refs: (2, 2, 3),
        date: "2025-12-05",
        from: "16:00",
        to: "20:00",
        status: Planning,
        notes: "Color grading",
    },
    DemoBooking {
        room: System(4),
        editor: System(4),
        refs: (1, 4, 2),
        date: "2025-12-06",
        from: "09:00",
        to: "12:00",
        status: Confirmed,
        notes: "Music composition",
    },
    DemoBooking {
        room: System(5),
        editor: System(1),
        refs: (2, 2, 3),
        date: "2025-12-06",
        from: "14:00",
        to: "18:00",
        status: Confirmed,
        notes: "Dubbing session",
    },
    DemoBooking {
        room: System(0),
        editor: System(0),
        refs: (0, 3, 0),
        date: "2025-12-07",
        from: "10:00",
        to: "16:00",
        status: Tentative,
        notes: "Teaser editing",
    },
    DemoBooking {
        room: System(1),
        editor: System(2),
        refs: (1, 1, 2),
        date: "2025-12-08",
        from: "09:00",
        to: "17:00",
        status: Planning,
        notes: "Full day editing session",
    },
    DemoBooking {
        room: ClientRoom("Paramount Studios", "editing"),
        editor: System(3),
        refs: (2, 2, 3),
        date: "2025-12-09",
        from: "10:00",
        to: "14:00",
        status: Confirmed,
        notes: "Client provided editing suite",
    },
    DemoBooking {
        room: System(6),
        editor: ClientEditor("Kavya Sharma", "audio", "9988776655", "kavya.sharma@freelance.com"),
        refs: (0, 0, 0),
        date: "2025-12-10",
        from: "11:00",
        to: "15:00",
        status: Tentative,
        notes: "Client's audio specialist",
    },
    DemoBooking {
        room: ClientRoom("Silverscreen Productions", "vfx"),
        editor: ClientEditor("Aditya Patel", "vfx", "9911223344", "aditya.vfx@company.com"),
        refs: (1, 4, 2),
        date: "2025-12-11",
        from: "09:00",
        to: "13:00",
        status: Planning,
        notes: "Client's VFX studio and artist",
    },
    DemoBooking {
        room: System(4),
        editor: ClientEditor("Zara Khan", "video", "9944556677", "zara.khan@freelance.com"),
        refs: (1, 1, 2),
        date: "2025-12-12",
        from: "14:00",
        to: "18:00",
        status: Confirmed,
        notes: "Freelance video editor for special work",
    },
    DemoBooking {
        room: ClientRoom("Dream Studios Mumbai", "sound"),
        editor: Slot::None,
        refs: (2, 2, 3),
        date: "2025-12-13",
        from: "10:00",
        to: "12:00",
        status: Planning,
        notes: "Client facility, editor TBD",
    },
];

fn raw_binding(slot: &Slot, system_ids: &[Ulid]) -> Result<RawBinding, EngineError> {
    Ok(match slot {
        Slot::None => RawBinding::default(),
        System(i) => RawBinding::system(pick(system_ids, *i)?),
        ClientRoom(name, kind) => RawBinding {
            resource_type: Some((*kind).into()),
            ..RawBinding::client(*name)
        },
        ClientEditor(name, kind, phone, email) => RawBinding {
            resource_type: Some((*kind).into()),
            phone: Some((*phone).into()),
            email: Some((*email).into()),
            ..RawBinding::client(*name)
        },
    })
}

fn pick(ids: &[Ulid], index: usize) -> Result<Ulid, EngineError> {
    ids.get(index)
        .copied()
        .ok_or_else(|| EngineError::Store(format!("fixture index {index} out of range")))
}

fn parse<T: std::str::FromStr>(s: &str) -> Result<T, EngineError> {
    s.parse()
        .map_err(|_| EngineError::Store(format!("bad fixture value {s:?}")))
}

/// Register the demo registry, leaves and bookings into `tenant` unless it already has rooms.
/// Returns whether anything was loaded.
pub fn load_demo(
    store: &InMemoryStore,
    engine: &Engine,
    tenant: &TenantId,
) -> Result<bool, EngineError> {
    if store.has_rooms(tenant) {
        info!("tenant {tenant} already populated, skipping demo fixtures");
        return Ok(false);
    }

    let mut rooms = Vec::new();
    for (name, room_type, capacity) in ROOMS {
        let room = Room {
            id: Ulid::new(),
            name: (*name).into(),
            room_type: (*room_type).into(),
            capacity: *capacity,
            is_active: true,
            ignore_conflict: false,
        };
        rooms.push(room.id);
        store.put_room(tenant, room)?;
    }

    let mut editors = Vec::new();
    for (name, editor_type, phone, email) in EDITORS {
        let editor = Editor {
            id: Ulid::new(),
            name: (*name).into(),
            editor_type: (*editor_type).into(),
            phone: Some((*phone).into()),
            email: Some((*email).into()),
            is_active: true,
            ignore_conflict: false,
        };
        editors.push(editor.id);
        store.put_editor(tenant, editor)?;
    }

    let mut customers = Vec::new();
    for name in CUSTOMERS {
        let customer = Customer {
            id: Ulid::new(),
            name: (*name).into(),
            is_active: true,
        };
        customers.push(customer.id);
        store.put_customer(tenant, customer)?;
    }

    let mut projects = Vec::new();
    for (name, customer) in PROJECTS {
        let project = Project {
            id: Ulid::new(),
            customer_id: pick(&customers, *customer)?,
            name: (*name).into(),
        };
        projects.push(project.id);
        store.put_project(tenant, project)?;
    }

    let mut contacts = Vec::new();
    for (customer, name, phone, email) in CONTACTS {
        let contact = Contact {
            id: Ulid::new(),
            customer_id: pick(&customers, *customer)?,
            name: (*name).into(),
            phone: Some((*phone).into()),
            email: Some((*email).into()),
        };
        contacts.push(contact.id);
        store.put_contact(tenant, contact)?;
    }

    for (editor, from, to, reason) in LEAVES {
        let leave = LeaveRecord::new(
            Ulid::new(),
            pick(&editors, *editor)?,
            parse::<NaiveDate>(from)?,
            parse::<NaiveDate>(to)?,
            Some((*reason).into()),
        )?;
        store.put_leave(tenant, leave)?;
    }

    let mut created = 0;
    for demo in BOOKINGS {
        let (customer, project, contact) = demo.refs;
        let request = BookingRequest {
            tenant: tenant.clone(),
            room: raw_binding(&demo.room, &rooms)?,
            editor: raw_binding(&demo.editor, &editors)?,
            customer_id: pick(&customers, customer)?,
            project_id: pick(&projects, project)?,
            contact_id: Some(pick(&contacts, contact)?),
            date: parse(demo.date)?,
            from_time: parse(demo.from)?,
            to_time: parse(demo.to)?,
            actual: ActualTimes::default(),
            break_hours: 0,
            status: demo.status,
            notes: demo.notes.into(),
            repeat_days: 0,
        };
        created += engine
            .create_booking(request, ConflictPolicy::Force)?
            .created_count();
    }

    info!(
        "loaded demo fixtures into {tenant}: {} rooms, {} editors, {created} bookings",
        rooms.len(),
        editors.len()
    );
    Ok(true)
}
