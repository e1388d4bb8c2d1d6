/// Worker-owned connection state. The application only sees snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    ConnectedPendingReady,
    Connected,
    Disconnecting,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::ConnectedPendingReady => "connected_pending_ready",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnecting => "disconnecting",
        }
    }

    /// Handshake complete; commands may flow.
    pub fn is_ready(self) -> bool {
        self == ConnectionState::Connected
    }

    /// Some transport connection is open.
    pub fn has_transport(self) -> bool {
        !matches!(self, ConnectionState::Disconnected)
    }
}
