use std::{path::PathBuf, sync::OnceLock};

use hello_echo::{
    Application, RunningApplication,
    config::{AppConfig, ConfigLoader},
};

/// Shipped `configs/` directory of this crate
pub fn config_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("configs")
}

/// Shipped configuration, loaded once per test binary and pointed at an
/// ephemeral loopback port.
pub fn test_config() -> AppConfig {
    static CONFIG: OnceLock<AppConfig> = OnceLock::new();

    CONFIG
        .get_or_init(|| {
            let mut config = ConfigLoader::new(config_dir())
                .with_env_source(Default::default())
                .load()
                .expect("shipped configuration should load");
            config.server.host = "127.0.0.1".to_string();
            config.server.port = 0;
            config
        })
        .clone()
}

/// Start the full application on an ephemeral port
pub async fn start_app() -> RunningApplication {
    Application::initialize(test_config())
        .expect("application should initialize")
        .start()
        .await
        .expect("application should start")
}

pub fn url(app: &RunningApplication, path: &str) -> String {
    format!("http://{}{}", app.local_addr(), path)
}
