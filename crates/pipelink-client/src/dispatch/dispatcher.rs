use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace, warn};

use pipelink_core::error::ErrorCode;
use pipelink_core::protocol::{ClosePayload, Command, Envelope, Frame, Opcode, ServerEvent};

use crate::bridge::{Event, EventKind, EventQueue, PendingTable, ReadyConfig, ReadyInfo, User};
use crate::connection::ConnectionState;

/// What the worker has to do after a frame was routed.
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    Handled,
    /// Write this frame back (pong).
    Reply(Frame),
    /// Handshake completed.
    Ready(ReadyInfo),
    /// The peer acknowledged a subscribe (`active`) or unsubscribe.
    Subscription { kind: EventKind, active: bool },
    /// Tear the connection down with this close code/reason.
    Disconnect { code: i64, reason: String },
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default = "unknown_error")]
    code: ErrorCode,
    #[serde(default)]
    message: String,
}

fn unknown_error() -> ErrorCode {
    ErrorCode::UnknownError
}

#[derive(Debug, Default, Deserialize)]
struct ReadyBody {
    #[serde(default)]
    v: u32,
    #[serde(default)]
    config: ReadyConfig,
    #[serde(default)]
    user: Option<User>,
}

#[derive(Debug, Deserialize)]
struct SecretBody {
    secret: String,
}

#[derive(Debug, Deserialize)]
struct JoinRequestBody {
    user: User,
}

/// Turns inbound frames into events. Emits into the event queue and clears
/// pending entries; connection-level consequences are returned as `Routed`.
pub struct Dispatcher {
    events: Arc<EventQueue>,
    pending: Arc<PendingTable>,
}

impl Dispatcher {
    pub fn new(events: Arc<EventQueue>, pending: Arc<PendingTable>) -> Self {
        Self { events, pending }
    }

    pub fn dispatch(&self, frame: Frame, state: ConnectionState) -> Routed {
        match frame.opcode {
            Opcode::Ping => {
                trace!(len = frame.len(), "ping");
                Routed::Reply(Frame::new(Opcode::Pong, frame.payload))
            }
            Opcode::Pong => {
                trace!("pong");
                Routed::Handled
            }
            Opcode::Close => {
                let close = frame.parse::<ClosePayload>().unwrap_or_else(|_| ClosePayload {
                    code: 0,
                    reason: frame.message(),
                });
                debug!(code = close.code, reason = %close.reason, "peer sent close");
                Routed::Disconnect {
                    code: close.code,
                    reason: close.reason,
                }
            }
            Opcode::Handshake => Routed::Disconnect {
                code: ErrorCode::ReadCorrupt.as_i64(),
                reason: "peer sent a handshake frame".into(),
            },
            Opcode::Frame => self.dispatch_envelope(&frame, state),
        }
    }

    fn dispatch_envelope(&self, frame: &Frame, state: ConnectionState) -> Routed {
        let env = match Envelope::from_slice(&frame.payload) {
            Ok(env) => env,
            Err(e) => {
                warn!(error = %e, "undecodable envelope");
                let reason = e.to_string();
                self.events.push(Event::error(ErrorCode::ReadCorrupt, reason.clone()));
                return Routed::Disconnect {
                    code: ErrorCode::ReadCorrupt.as_i64(),
                    reason,
                };
            }
        };

        if let Some(nonce) = env.nonce.as_deref() {
            if let Some(req) = self.pending.resolve(nonce) {
                debug!(nonce, cmd = ?req.command, elapsed_ms = req.sent_at.elapsed().as_millis() as u64, "response matched");
            }
        }

        if env.is_event(ServerEvent::Error) {
            return self.on_error(&env);
        }

        match state {
            ConnectionState::ConnectedPendingReady => {
                if env.cmd == Command::Dispatch && env.is_event(ServerEvent::Ready) {
                    return self.on_ready(&env);
                }
                trace!(cmd = ?env.cmd, "frame before ready ignored");
            }
            ConnectionState::Connected => return self.route(&env),
            other => trace!(state = other.as_str(), "frame outside a session ignored"),
        }
        Routed::Handled
    }

    fn on_error(&self, env: &Envelope) -> Routed {
        let body = env.data_as::<ErrorBody>().ok().flatten().unwrap_or(ErrorBody {
            code: ErrorCode::UnknownError,
            message: "unreadable error payload".into(),
        });

        warn!(code = body.code.as_i64(), message = %body.message, nonce = ?env.nonce, "peer reported error");
        self.events.push(Event::error(body.code, body.message.clone()));

        if body.code.is_fatal() {
            return Routed::Disconnect {
                code: body.code.as_i64(),
                reason: body.message,
            };
        }
        Routed::Handled
    }

    fn on_ready(&self, env: &Envelope) -> Routed {
        let body = match env.data_as::<ReadyBody>() {
            Ok(body) => body.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "ready payload unreadable; using defaults");
                ReadyBody::default()
            }
        };

        let info = ReadyInfo {
            version: body.v,
            config: body.config,
            user: body.user,
        };
        debug!(version = info.version, user = ?info.user.as_ref().map(|u| u.id.as_str()), "ready");

        self.events.push(Event::Ready {
            version: info.version,
            config: info.config.clone(),
            user: info.user.clone(),
        });
        Routed::Ready(info)
    }

    fn route(&self, env: &Envelope) -> Routed {
        match env.cmd {
            Command::Dispatch => self.route_dispatch(env),
            Command::SetActivity => self.on_presence(env),
            Command::Subscribe | Command::Unsubscribe => {
                let Some(kind) = env.evt.and_then(EventKind::from_server_event) else {
                    warn!(cmd = ?env.cmd, evt = ?env.evt, "subscription ack for unsupported event");
                    return Routed::Handled;
                };
                let active = env.cmd == Command::Subscribe;
                self.events.push(if active {
                    Event::Subscribe(kind)
                } else {
                    Event::Unsubscribe(kind)
                });
                return Routed::Subscription { kind, active };
            }
            Command::SendActivityJoinInvite
            | Command::CloseActivityJoinRequest
            | Command::GetVoiceSettings => {
                debug!(cmd = ?env.cmd, nonce = ?env.nonce, "acknowledged");
            }
            Command::Authorize | Command::Authenticate | Command::Unknown => {
                warn!(cmd = ?env.cmd, "unsupported command in response");
            }
        }
        Routed::Handled
    }

    fn route_dispatch(&self, env: &Envelope) {
        match env.evt {
            Some(ServerEvent::ActivityJoin) => {
                if let Some(b) = self.body::<SecretBody>(env) {
                    self.events.push(Event::Join { secret: b.secret });
                }
            }
            Some(ServerEvent::ActivitySpectate) => {
                if let Some(b) = self.body::<SecretBody>(env) {
                    self.events.push(Event::Spectate { secret: b.secret });
                }
            }
            Some(ServerEvent::ActivityJoinRequest) => {
                if let Some(b) = self.body::<JoinRequestBody>(env) {
                    self.events.push(Event::JoinRequest { user: b.user });
                }
            }
            Some(ServerEvent::Ready) => warn!("duplicate ready ignored"),
            other => warn!(evt = ?other, "unsupported event"),
        }
    }

    fn on_presence(&self, env: &Envelope) {
        match env.data_as::<Value>() {
            Ok(None) => self.events.push(Event::PresenceUpdate {
                presence: None,
                name: "No Rich Presence".into(),
                application_id: String::new(),
            }),
            Ok(Some(data)) => {
                let field = |key: &str| {
                    data.get(key)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                };
                let name = field("name");
                let application_id = field("application_id");
                self.events.push(Event::PresenceUpdate {
                    presence: Some(data),
                    name,
                    application_id,
                });
            }
            Err(e) => {
                warn!(error = %e, "presence echo unreadable");
                self.events.push(Event::error(ErrorCode::InvalidPayload, e.to_string()));
            }
        }
    }

    /// Typed `data` body; a missing or mismatched body becomes an Error event.
    fn body<T: DeserializeOwned>(&self, env: &Envelope) -> Option<T> {
        match env.data_as::<T>() {
            Ok(Some(body)) => Some(body),
            Ok(None) => {
                self.events.push(Event::error(
                    ErrorCode::InvalidPayload,
                    format!("{:?} without data", env.evt),
                ));
                None
            }
            Err(e) => {
                warn!(error = %e, evt = ?env.evt, "event body unreadable");
                self.events.push(Event::error(ErrorCode::InvalidPayload, e.to_string()));
                None
            }
        }
    }
}
