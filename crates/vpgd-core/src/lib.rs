use thiserror::Error;

pub mod app_config;
pub mod config;
pub mod signal;
pub mod thresholds;
pub mod units;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use signal::{Momentum, SignalStatus, SignalType, ValidationLevel};
pub use thresholds::{
    load_thresholds, CorroborationThresholds, EngineThresholds, MomentumThresholds,
    PersistenceThresholds, ScoringWeights, ValidationThresholds,
};
pub use units::{load_units, BusinessUnitConfig, UnitsFile};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("failed to read config file {path}")]
    FileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file")]
    FileParse(#[from] serde_yaml::Error),
    #[error("config validation failed: {0}")]
    Validation(String),
}
