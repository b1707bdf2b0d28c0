//! Gen-secret command.

use keygate_core::SigningSecret;

use crate::ui;

/// Print a fresh signing secret.
pub fn run_gen_secret() {
    let secret = SigningSecret::generate_config_value();
    println!("{secret}");
    ui::info("Set it as KEYGATE_JWT_SECRET or auth.jwtSecret in keygate.json");
}
