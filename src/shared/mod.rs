// 横断的関心事（設定・データベース・エラー）のモジュール

pub mod config;
pub mod database;
pub mod errors;
