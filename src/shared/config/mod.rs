// 設定関連のモジュール

pub mod environment;

pub use environment::{
    initialize_logging_system, load_environment_variables, AppConfig, R2Config, StorageBackend,
};
