use chrono::NaiveDate;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use ulid::Ulid;

use crate::model::TenantId;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeAction {
    Created,
    Updated,
    Deleted,
}

/// Sent to a tenant's listeners after a booking change is committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingNotice {
    pub action: NoticeAction,
    pub booking_id: Ulid,
    pub date: NaiveDate,
}

/// Broadcast hub for listen/unlisten per tenant.
pub struct NotifyHub {
    channels: DashMap<TenantId, broadcast::Sender<BookingNotice>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to a tenant's booking changes. Creates the channel if needed.
    pub fn subscribe(&self, tenant: &TenantId) -> broadcast::Receiver<BookingNotice> {
        let sender = self
            .channels
            .entry(tenant.clone())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// No-op if nobody is listening.
    pub fn send(&self, tenant: &TenantId, notice: BookingNotice) {
        if let Some(sender) = self.channels.get(tenant) {
            let _ = sender.send(notice);
        }
    }
}
