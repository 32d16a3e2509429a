// 認証・認可機能のモジュール

pub mod directory;
pub mod gate;
pub mod models;
pub mod service;
pub mod token;

pub use gate::AccessGate;
pub use models::{Principal, Role};
