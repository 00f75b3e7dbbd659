//! HTTP paths shared by the server and its clients.

/// Profile lookup, `{uid}` is the raw card id.
pub const PROFILE: &str = "/profile/{uid}";
/// WebSocket endpoint of a listener's broadcast transport.
pub const SOCKET: &str = "/socket";
/// Liveness probe.
pub const PING: &str = "/ping";

/// Concrete profile path for one card id.
pub fn profile_path(uid: &str) -> String {
    PROFILE.replace("{uid}", uid)
}
