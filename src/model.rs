use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::binding::{EditorBinding, RoomBinding};
use crate::engine::EngineError;
use crate::limits::MAX_TENANT_NAME_LEN;

/// Unix milliseconds. Only used for log timestamps; scheduling uses civil dates and times.
pub type Ms = i64;

pub fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as Ms)
        .unwrap_or(0)
}

// ── Civil time ───────────────────────────────────────────────────

/// Wall-clock time of day, stored as minutes since midnight. Text form is `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(u16);

impl ClockTime {
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self((hour * 60 + minute) as u16))
        } else {
            None
        }
    }

    pub fn minutes(self) -> u16 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseClockTimeError(String);

impl fmt::Display for ParseClockTimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid time of day {:?}, expected HH:MM", self.0)
    }
}

impl std::error::Error for ParseClockTimeError {}

impl FromStr for ClockTime {
    type Err = ParseClockTimeError;

    /// Accepts `HH:MM`, and `HH:MM:00` as emitted by SQL `time` columns.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseClockTimeError(s.to_string());
        let mut parts = s.trim().split(':');
        let hour = parts.next().ok_or_else(err)?;
        let minute = parts.next().ok_or_else(err)?;
        if let Some(seconds) = parts.next()
            && seconds != "00"
        {
            return Err(err());
        }
        if parts.next().is_some() || hour.len() != 2 || minute.len() != 2 {
            return Err(err());
        }
        let hour: u32 = hour.parse().map_err(|_| err())?;
        let minute: u32 = minute.parse().map_err(|_| err())?;
        Self::from_hm(hour, minute).ok_or_else(err)
    }
}

impl TryFrom<String> for ClockTime {
    type Error = ParseClockTimeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

/// Half-open range `[from, to)` of wall-clock time on a single date. `from < to` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TimeRangeRepr", into = "TimeRangeRepr")]
pub struct TimeRange {
    from: ClockTime,
    to: ClockTime,
}

#[derive(Serialize, Deserialize)]
struct TimeRangeRepr {
    from: ClockTime,
    to: ClockTime,
}

impl TimeRange {
    pub fn new(from: ClockTime, to: ClockTime) -> Result<Self, EngineError> {
        if from >= to {
            return Err(EngineError::InvalidInterval {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        Ok(Self { from, to })
    }

    pub fn from(&self) -> ClockTime {
        self.from
    }

    pub fn to(&self) -> ClockTime {
        self.to
    }

    pub fn duration_minutes(&self) -> u32 {
        u32::from(self.to.0 - self.from.0)
    }

    /// Touching endpoints do not overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.from < other.to && other.from < self.to
    }
}

impl TryFrom<TimeRangeRepr> for TimeRange {
    type Error = EngineError;

    fn try_from(repr: TimeRangeRepr) -> Result<Self, Self::Error> {
        Self::new(repr.from, repr.to)
    }
}

impl From<TimeRange> for TimeRangeRepr {
    fn from(range: TimeRange) -> Self {
        Self {
            from: range.from,
            to: range.to,
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

/// What really happened. Either end may be missing while a session is still running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActualTimes {
    #[serde(default)]
    pub from: Option<ClockTime>,
    #[serde(default)]
    pub to: Option<ClockTime>,
}

impl ActualTimes {
    pub fn new(from: Option<ClockTime>, to: Option<ClockTime>) -> Result<Self, EngineError> {
        let actual = Self { from, to };
        actual.validate()?;
        Ok(actual)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            TimeRange::new(from, to)?;
        }
        Ok(())
    }
}

// ── Tenancy ──────────────────────────────────────────────────────

/// Owning organization. Only ASCII alphanumerics, `_` and `-` are accepted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    pub fn new(name: impl Into<String>) -> Result<Self, EngineError> {
        let name = name.into();
        if name.len() > MAX_TENANT_NAME_LEN {
            return Err(EngineError::LimitExceeded("tenant name too long"));
        }
        if name.is_empty() {
            return Err(EngineError::InvalidTenant(name));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(EngineError::InvalidTenant(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TenantId {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TenantId> for String {
    fn from(value: TenantId) -> Self {
        value.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Registry records (read-only to the engine) ───────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Room,
    Editor,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Room => f.write_str("room"),
            ResourceKind::Editor => f.write_str("editor"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: Ulid,
    pub name: String,
    pub room_type: String,
    pub capacity: u32,
    pub is_active: bool,
    /// Room may be double-booked on purpose (e.g. a shared lounge).
    pub ignore_conflict: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Editor {
    pub id: Ulid,
    pub name: String,
    pub editor_type: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
    pub ignore_conflict: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: Ulid,
    pub name: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: Ulid,
    pub customer_id: Ulid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: Ulid,
    pub customer_id: Ulid,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Inclusive date range during which an editor is wholly unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRecord {
    pub id: Ulid,
    pub editor_id: Ulid,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub reason: Option<String>,
}

impl LeaveRecord {
    pub fn new(
        id: Ulid,
        editor_id: Ulid,
        from_date: NaiveDate,
        to_date: NaiveDate,
        reason: Option<String>,
    ) -> Result<Self, EngineError> {
        let leave = Self {
            id,
            editor_id,
            from_date,
            to_date,
            reason,
        };
        leave.validate()?;
        Ok(leave)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.from_date > self.to_date {
            return Err(EngineError::InvalidInterval {
                from: self.from_date.to_string(),
                to: self.to_date.to_string(),
            });
        }
        Ok(())
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.from_date <= date && date <= self.to_date
    }
}

// ── Bookings ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Planning,
    Tentative,
    Confirmed,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Planning => f.write_str("planning"),
            BookingStatus::Tentative => f.write_str("tentative"),
            BookingStatus::Confirmed => f.write_str("confirmed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    pub tenant: TenantId,
    pub room: RoomBinding,
    pub editor: EditorBinding,
    pub customer_id: Ulid,
    pub project_id: Ulid,
    pub contact_id: Option<Ulid>,
    pub date: NaiveDate,
    /// Held exclusively in full, breaks included.
    pub planned: TimeRange,
    pub actual: ActualTimes,
    pub break_hours: u32,
    pub status: BookingStatus,
    pub notes: String,
}

impl Booking {
    /// Does this booking hold the given system resource?
    pub fn holds(&self, kind: ResourceKind, resource_id: Ulid) -> bool {
        match kind {
            ResourceKind::Room => self.room.system_id() == Some(resource_id),
            ResourceKind::Editor => self.editor.system_id() == Some(resource_id),
        }
    }

    /// Planned minutes less breaks. Informational only.
    pub fn billable_minutes(&self) -> u32 {
        self.planned
            .duration_minutes()
            .saturating_sub(self.break_hours * 60)
    }
}

/// One line of a booking's audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingLogEntry {
    pub at: Ms,
    pub action: BookingAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingAction {
    Created,
    Updated { fields: Vec<String> },
    StatusChanged { from: BookingStatus, to: BookingStatus },
    Deleted,
}

/// Journal record. Flat, one variant per committed change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreEvent {
    RoomRegistered { tenant: TenantId, room: Room },
    EditorRegistered { tenant: TenantId, editor: Editor },
    CustomerRegistered { tenant: TenantId, customer: Customer },
    ProjectRegistered { tenant: TenantId, project: Project },
    ContactRegistered { tenant: TenantId, contact: Contact },
    LeaveRecorded { tenant: TenantId, leave: LeaveRecord },
    BookingCreated { booking: Booking, at: Ms },
    BookingUpdated { booking: Booking, at: Ms },
    BookingDeleted { tenant: TenantId, id: Ulid, at: Ms },
    /// Written by compaction: the booking as it stands plus its audit trail.
    BookingRestored {
        booking: Booking,
        history: Vec<BookingLogEntry>,
    },
}
