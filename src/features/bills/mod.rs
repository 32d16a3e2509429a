// 経費申請（bill）ライフサイクル機能のモジュール

pub mod models;
pub mod presenter;
pub mod repository;
pub mod service;

pub use models::{Bill, BillView, CreateBillDto, UpdateBillDto};
pub use service::BillService;
