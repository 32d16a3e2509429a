// 機能モジュール

pub mod attachments;
pub mod auth;
pub mod bills;
