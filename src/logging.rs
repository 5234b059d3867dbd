use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;

pub use log::{debug, error, info, trace, warn};

/// Install the process logger. `RUST_LOG` overrides the default filter.
/// Calling it twice is harmless.
pub fn init_logger() {
    let mut builder = Builder::from_env(Env::default().default_filter_or("offbeat_core=info,offbeat_relay=info"));
    builder.filter_module("hyper", LevelFilter::Warn);
    builder.filter_module("reqwest", LevelFilter::Warn);

    builder.format(|buf, record| {
        let module_path = record.module_path().unwrap_or("<unknown>");
        writeln!(buf, "[{}][{}] {}", record.level(), module_path, record.args())
    });

    let _ = builder.try_init();
}
