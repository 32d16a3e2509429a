// データベース関連のモジュール

pub mod connection;
