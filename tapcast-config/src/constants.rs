pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_HTTP_PORT: u16 = 4001;
pub const DEFAULT_HTTPS_PORT: u16 = 4443;

pub const DEFAULT_TLS_CERT_PATH: &str = "localhost.pem";
pub const DEFAULT_TLS_KEY_PATH: &str = "localhost-key.pem";
/// Browsers on the local network still negotiate 1.2 often enough.
pub const DEFAULT_TLS_MIN_VERSION: &str = "1.2";

pub const DEFAULT_STATIC_DIR: &str = "public";

pub const DEFAULT_READER_POLL_INTERVAL_MS: u64 = 500;
pub const DEFAULT_CLIENT_QUEUE: usize = 64;
