//! `offbeat-relay`: serves the CORS relay.
//!
//! Configured through `OFFBEAT_RELAY_BIND` and `OFFBEAT_RELAY_ALLOWED_PREFIX`;
//! log level through `RUST_LOG`.

use log::error;
use offbeat_core::logging::init_logger;
use offbeat_core::relay::{self, RelayConfig};

#[tokio::main]
async fn main() {
    init_logger();

    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            std::process::exit(2);
        }
    };

    if let Err(e) = relay::serve(config).await {
        error!("Relay stopped: {e}");
        std::process::exit(1);
    }
}
