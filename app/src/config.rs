use log::Level;

pub const DEFAULT_MOUNT_POINT: &str = "app";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Configuration {
    /// Id of the element the application is rendered into.
    pub mount_point: String,
    pub log_level: Level,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            mount_point: DEFAULT_MOUNT_POINT.to_string(),
            log_level: build_log_level(option_env!("CRYPTO_OPPORTUNITY_LOG_LEVEL")),
        }
    }
}

fn build_log_level(level: Option<&str>) -> Level {
    level
        .and_then(|level| level.parse::<Level>().ok())
        .unwrap_or(Level::Info)
}
