//! Client configuration and its builder.

use std::time::Duration;

use tilewire_game::DEFAULT_SHOUT_DURATION;
use tilewire_protocol::{ConversationId, limits};
use tilewire_session::{JoinRequest, SessionConfig};
use tilewire_transport::Endpoint;
use tracing::warn;

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

/// Everything the client needs to know before it starts.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Where the game server lives.
    pub endpoint: Endpoint,

    /// What to join on the first connection.
    pub join: JoinRequest,

    /// Our display name. At most [`limits::MAX_NAME_LENGTH`] bytes.
    pub player_name: String,

    /// Reconnection policy.
    pub session: SessionConfig,

    /// Idle time after which a keep-alive is sent. Every outbound
    /// message restarts the countdown. Default: 150 seconds.
    pub keep_alive_interval: Duration,

    /// How long to wait before trying again to flush tile moves while
    /// the transport still has unsent data. Default: 100 ms.
    pub flush_retry_interval: Duration,

    /// How long a shout stays up. Default: 10 seconds.
    pub shout_duration: Duration,

    /// How long one connection attempt may take before it counts as a
    /// failure. Default: 10 seconds.
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::new("localhost", false),
            join: JoinRequest::default(),
            player_name: String::new(),
            session: SessionConfig::default(),
            keep_alive_interval: Duration::from_secs(150),
            flush_retry_interval: Duration::from_millis(100),
            shout_duration: DEFAULT_SHOUT_DURATION,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    const MIN_INTERVAL: Duration = Duration::from_millis(1);

    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Returns a copy that can be used as is: the player and room names
    /// are cut to fit the protocol and zero intervals are raised to a
    /// minimum.
    pub fn validated(mut self) -> Self {
        fit_name("player name", &mut self.player_name);
        if let JoinRequest::Room { room } = &mut self.join {
            fit_name("room name", room);
        }
        for (name, interval) in [
            ("keep_alive_interval", &mut self.keep_alive_interval),
            ("flush_retry_interval", &mut self.flush_retry_interval),
            ("connect_timeout", &mut self.connect_timeout),
        ] {
            if interval.is_zero() {
                warn!(setting = name, "interval is zero, clamping");
                *interval = Self::MIN_INTERVAL;
            }
        }
        self.session = self.session.validated();
        self
    }
}

/// Removes NUL bytes and cuts `value` to [`limits::MAX_NAME_LENGTH`].
fn fit_name(what: &'static str, value: &mut String) {
    if value.contains('\0') {
        warn!(what, "NUL bytes removed");
        value.retain(|c| c != '\0');
    }
    if value.len() > limits::MAX_NAME_LENGTH {
        warn!(
            what,
            len = value.len(),
            max = limits::MAX_NAME_LENGTH,
            "too long, truncating"
        );
        let cut = truncate(value, limits::MAX_NAME_LENGTH).len();
        value.truncate(cut);
    }
}

/// Cuts `s` to at most `max` bytes without splitting a character.
pub(crate) fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// ---------------------------------------------------------------------------
// ClientConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for [`ClientConfig`].
///
/// # Example
///
/// ```rust
/// use tilewire::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .host("gemelo.org")
///     .secure(true)
///     .room("eo")
///     .player_name("Zamenhof")
///     .build();
/// assert_eq!(config.endpoint.url(), "wss://gemelo.org:5143/");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.endpoint.host = host.into();
        self
    }

    /// Use `wss` on the secure port.
    pub fn secure(mut self, secure: bool) -> Self {
        self.config.endpoint.secure = secure;
        self
    }

    pub fn ports(mut self, plain_port: u16, secure_port: u16) -> Self {
        self.config.endpoint =
            self.config.endpoint.with_ports(plain_port, secure_port);
        self
    }

    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.config.endpoint = endpoint;
        self
    }

    /// Join a named room.
    pub fn room(mut self, room: impl Into<String>) -> Self {
        self.config.join = JoinRequest::room(room);
        self
    }

    /// Join the conversation behind an invite link.
    pub fn conversation(mut self, id: ConversationId) -> Self {
        self.config.join = JoinRequest::conversation(id);
        self
    }

    pub fn player_name(mut self, name: impl Into<String>) -> Self {
        self.config.player_name = name.into();
        self
    }

    pub fn session(mut self, session: SessionConfig) -> Self {
        self.config.session = session;
        self
    }

    pub fn keep_alive_interval(mut self, interval: Duration) -> Self {
        self.config.keep_alive_interval = interval;
        self
    }

    pub fn flush_retry_interval(mut self, interval: Duration) -> Self {
        self.config.flush_retry_interval = interval;
        self
    }

    pub fn shout_duration(mut self, duration: Duration) -> Self {
        self.config.shout_duration = duration;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Finishes the config. The result is already
    /// [`validated`](ClientConfig::validated).
    pub fn build(self) -> ClientConfig {
        self.config.validated()
    }
}
