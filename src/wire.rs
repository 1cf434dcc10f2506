use std::io;
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, warn};
use ulid::Ulid;

use crate::engine::{
    BookingPatch, BookingRequest, ConflictPolicy, ConflictQuery, Engine, EngineError,
    InMemoryStore,
};
use crate::limits::{MAX_LINE_LEN, MAX_NAME_LEN};
use crate::model::*;
use crate::notify::BookingNotice;

/// One request line: `{"op": "<name>", ...}`.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    CheckConflicts {
        query: ConflictQuery,
    },
    CreateBooking {
        booking: BookingRequest,
        #[serde(default)]
        policy: Option<ConflictPolicy>,
    },
    UpdateBooking {
        tenant: TenantId,
        id: Ulid,
        #[serde(default)]
        patch: BookingPatch,
        #[serde(default)]
        policy: Option<ConflictPolicy>,
    },
    GetBooking {
        tenant: TenantId,
        id: Ulid,
    },
    ListBookings {
        tenant: TenantId,
        #[serde(default)]
        date: Option<NaiveDate>,
    },
    DeleteBooking {
        tenant: TenantId,
        id: Ulid,
    },
    BookingHistory {
        tenant: TenantId,
        id: Ulid,
    },
    PutRoom {
        tenant: TenantId,
        room: Room,
    },
    PutEditor {
        tenant: TenantId,
        editor: Editor,
    },
    PutCustomer {
        tenant: TenantId,
        customer: Customer,
    },
    PutProject {
        tenant: TenantId,
        project: Project,
    },
    PutContact {
        tenant: TenantId,
        contact: Contact,
    },
    PutLeave {
        tenant: TenantId,
        leave: LeaveRecord,
    },
    Listen {
        tenant: TenantId,
    },
    Unlisten,
}

impl Request {
    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Request::CheckConflicts { .. } => "check_conflicts",
            Request::CreateBooking { .. } => "create_booking",
            Request::UpdateBooking { .. } => "update_booking",
            Request::GetBooking { .. } => "get_booking",
            Request::ListBookings { .. } => "list_bookings",
            Request::DeleteBooking { .. } => "delete_booking",
            Request::BookingHistory { .. } => "booking_history",
            Request::PutRoom { .. } => "put_room",
            Request::PutEditor { .. } => "put_editor",
            Request::PutCustomer { .. } => "put_customer",
            Request::PutProject { .. } => "put_project",
            Request::PutContact { .. } => "put_contact",
            Request::PutLeave { .. } => "put_leave",
            Request::Listen { .. } => "listen",
            Request::Unlisten => "unlisten",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Ok { result: Value },
    Error { kind: String, message: String },
    Notification { tenant: TenantId, notice: BookingNotice },
}

impl Response {
    fn error(kind: &str, message: impl Into<String>) -> Self {
        Response::Error {
            kind: kind.into(),
            message: message.into(),
        }
    }

    fn status(&self) -> &'static str {
        match self {
            Response::Ok { .. } => "ok",
            Response::Error { .. } => "error",
            Response::Notification { .. } => "notification",
        }
    }

    fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"status":"error","kind":"internal","message":"{e}"}}"#)
        })
    }
}

impl From<EngineError> for Response {
    fn from(e: EngineError) -> Self {
        Response::error(e.kind(), e.to_string())
    }
}

/// Everything a connection needs: the engine plus the store for registry writes.
pub struct Service {
    pub engine: Engine,
    pub store: Arc<InMemoryStore>,
    /// Used when a request names no policy.
    pub default_policy: ConflictPolicy,
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, Response> {
    serde_json::to_value(value).map_err(|e| Response::error("internal", e.to_string()))
}

fn check_name(name: &str) -> Result<(), EngineError> {
    if name.len() > MAX_NAME_LEN {
        return Err(EngineError::LimitExceeded("name too long"));
    }
    Ok(())
}

impl Service {
    pub fn new(engine: Engine, store: Arc<InMemoryStore>, default_policy: ConflictPolicy) -> Self {
        Self {
            engine,
            store,
            default_policy,
        }
    }

    /// Execute one stateless request. Listen/unlisten only make sense on a connection and
    /// are refused here as `bad_request`.
    pub fn dispatch(&self, request: Request) -> Result<Value, Response> {
        match request {
            Request::CheckConflicts { query } => to_json(&self.engine.check_conflicts(&query)),
            Request::CreateBooking { booking, policy } => to_json(
                &self
                    .engine
                    .create_booking(booking, policy.unwrap_or(self.default_policy))?,
            ),
            Request::UpdateBooking {
                tenant,
                id,
                patch,
                policy,
            } => to_json(&self.engine.update_booking(
                &tenant,
                id,
                patch,
                policy.unwrap_or(self.default_policy),
            )?),
            Request::GetBooking { tenant, id } => to_json(&self.engine.get_booking(&tenant, id)?),
            Request::ListBookings { tenant, date } => {
                to_json(&self.engine.list_bookings(&tenant, date))
            }
            Request::DeleteBooking { tenant, id } => {
                to_json(&self.engine.delete_booking(&tenant, id)?)
            }
            Request::BookingHistory { tenant, id } => {
                to_json(&self.engine.booking_history(&tenant, id)?)
            }
            Request::PutRoom { tenant, room } => {
                check_name(&room.name)?;
                check_name(&room.room_type)?;
                let id = room.id;
                self.store.put_room(&tenant, room).map_err(EngineError::from)?;
                Ok(json!({ "id": id }))
            }
            Request::PutEditor { tenant, editor } => {
                check_name(&editor.name)?;
                check_name(&editor.editor_type)?;
                let id = editor.id;
                self.store.put_editor(&tenant, editor).map_err(EngineError::from)?;
                Ok(json!({ "id": id }))
            }
            Request::PutCustomer { tenant, customer } => {
                check_name(&customer.name)?;
                let id = customer.id;
                self.store.put_customer(&tenant, customer).map_err(EngineError::from)?;
                Ok(json!({ "id": id }))
            }
            Request::PutProject { tenant, project } => {
                check_name(&project.name)?;
                let id = project.id;
                self.store.put_project(&tenant, project).map_err(EngineError::from)?;
                Ok(json!({ "id": id }))
            }
            Request::PutContact { tenant, contact } => {
                check_name(&contact.name)?;
                let id = contact.id;
                self.store.put_contact(&tenant, contact).map_err(EngineError::from)?;
                Ok(json!({ "id": id }))
            }
            Request::PutLeave { tenant, leave } => {
                leave.validate()?;
                if let Some(reason) = &leave.reason {
                    check_name(reason)?;
                }
                let id = leave.id;
                self.store.put_leave(&tenant, leave).map_err(EngineError::from)?;
                Ok(json!({ "id": id }))
            }
            Request::Listen { .. } | Request::Unlisten => Err(Response::error(
                "bad_request",
                "listen and unlisten are only valid on a connection",
            )),
        }
    }
}

type Subscription = Option<(TenantId, broadcast::Receiver<BookingNotice>)>;

/// Handle one line: parse, run, time, count.
async fn handle_line(service: &Arc<Service>, line: &str, listening: &mut Subscription) -> Response {
    let request: Request = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            metrics::counter!(
                crate::observability::REQUESTS_TOTAL,
                "op" => "unknown",
                "status" => "error"
            )
            .increment(1);
            return Response::error("bad_request", e.to_string());
        }
    };
    let label = request.label();
    let start = Instant::now();

    let response = match request {
        Request::Listen { tenant } => {
            *listening = Some((tenant.clone(), service.engine.notify.subscribe(&tenant)));
            Response::Ok {
                result: json!({ "listening": tenant }),
            }
        }
        Request::Unlisten => {
            *listening = None;
            Response::Ok {
                result: json!({ "listening": null }),
            }
        }
        request => {
            // Commits fsync the journal; keep them off the async workers.
            let service = service.clone();
            match tokio::task::spawn_blocking(move || service.dispatch(request)).await {
                Ok(Ok(result)) => Response::Ok { result },
                Ok(Err(response)) => response,
                Err(e) => Response::error("internal", e.to_string()),
            }
        }
    };

    metrics::histogram!(crate::observability::REQUEST_DURATION_SECONDS, "op" => label)
        .record(start.elapsed().as_secs_f64());
    metrics::counter!(
        crate::observability::REQUESTS_TOTAL,
        "op" => label,
        "status" => response.status()
    )
    .increment(1);
    debug!("{label} -> {}", response.status());
    response
}

/// Next notice for the subscribed tenant. Pending forever when not listening.
async fn next_notice(listening: &mut Subscription) -> Option<Response> {
    let Some((tenant, rx)) = listening else {
        return std::future::pending().await;
    };
    match rx.recv().await {
        Ok(notice) => Some(Response::Notification {
            tenant: tenant.clone(),
            notice,
        }),
        Err(broadcast::error::RecvError::Lagged(missed)) => {
            warn!("listener on {tenant} lagged, {missed} notices dropped");
            None
        }
        Err(broadcast::error::RecvError::Closed) => {
            *listening = None;
            None
        }
    }
}

fn codec_err(e: LinesCodecError) -> io::Error {
    match e {
        LinesCodecError::Io(e) => e,
        LinesCodecError::MaxLineLengthExceeded => {
            io::Error::new(io::ErrorKind::InvalidData, "line too long")
        }
    }
}

/// Serve one client until it disconnects. Responses are written in request order;
/// notifications are interleaved between them.
pub async fn process_connection(socket: TcpStream, service: Arc<Service>) -> io::Result<()> {
    let mut framed = Framed::new(socket, LinesCodec::new_with_max_length(MAX_LINE_LEN));
    let mut listening: Subscription = None;
    // After a decode error the stream yields one `None` before it resumes reading.
    let mut resuming = false;

    loop {
        tokio::select! {
            line = framed.next() => {
                let response = match line {
                    None if resuming => {
                        resuming = false;
                        continue;
                    }
                    None => break,
                    Some(Ok(line)) if line.trim().is_empty() => continue,
                    Some(Ok(line)) => handle_line(&service, &line, &mut listening).await,
                    Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                        resuming = true;
                        Response::from(EngineError::LimitExceeded("request line too long"))
                    }
                    Some(Err(LinesCodecError::Io(e))) => return Err(e),
                };
                framed.send(response.to_line()).await.map_err(codec_err)?;
            }
            Some(notice) = next_notice(&mut listening) => {
                framed.send(notice.to_line()).await.map_err(codec_err)?;
            }
        }
    }
    Ok(())
}
