//! Connection settings for the Openfire REST API plugin.
//!
//! # Design
//! A plain data holder whose defaults match the plugin's stock install.
//! Nothing is validated; `base_url` and `authorization` are the only pieces
//! of derived state, both read by the dispatcher on every request.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Connection and credential settings for one Openfire server.
///
/// [`Settings::default`] provides the plugin's stock values; override
/// individual fields with struct-update syntax
/// (`Settings { host: ..., ..Settings::default() }`).
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    /// Mount point of the REST API plugin on the server.
    pub base_path: String,
    /// Shared secret, sent verbatim as the `Authorization` header value
    /// when basic auth is disabled.
    pub secret: String,
    pub use_ssl: bool,
    /// When set, `basic_user`/`basic_pwd` replace the shared secret.
    pub use_basic_auth: bool,
    pub basic_user: String,
    pub basic_pwd: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9090,
            base_path: "/plugins/restapi/v1".to_string(),
            secret: String::new(),
            use_ssl: true,
            use_basic_auth: false,
            basic_user: String::new(),
            basic_pwd: String::new(),
        }
    }
}

impl Settings {
    /// Root URL every endpoint path is appended to.
    pub fn base_url(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        format!("{scheme}://{}:{}{}", self.host, self.port, self.base_path)
    }

    /// Value of the `Authorization` header for this configuration.
    pub fn authorization(&self) -> String {
        if self.use_basic_auth {
            let credentials = format!("{}:{}", self.basic_user, self.basic_pwd);
            format!("Basic {}", STANDARD.encode(credentials))
        } else {
            self.secret.clone()
        }
    }
}
