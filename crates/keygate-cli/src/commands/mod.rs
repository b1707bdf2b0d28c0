//! CLI command implementations.

pub mod gen_secret;
pub mod hash_password;
pub mod login;
pub mod serve;
pub mod status;

pub use gen_secret::run_gen_secret;
pub use hash_password::run_hash_password;
pub use login::run_login;
pub use serve::run_serve;
pub use status::run_status;

use keygate_core::Config;

/// Base URL of the locally configured gateway.
fn default_base_url() -> String {
    let gateway = Config::load_default().map(|c| c.gateway).unwrap_or_default();
    format!("http://{}:{}", gateway.bind_address, gateway.port)
}

/// Join a base URL and an absolute path.
fn endpoint(base: Option<&str>, path: &str) -> String {
    let base = base.map_or_else(default_base_url, str::to_string);
    format!("{}{path}", base.trim_end_matches('/'))
}
