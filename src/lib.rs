// 経費申請サービスのライブラリルート

pub mod features;
pub mod http;
pub mod services;
pub mod shared;

use crate::features::attachments::AttachmentUploader;
use crate::features::auth::directory::{SqliteUserDirectory, UserDirectory};
use crate::features::auth::token::{SessionTokenVerifier, TokenVerifier};
use crate::features::auth::AccessGate;
use crate::features::bills::BillService;
use crate::http::AppContext;
use crate::services::{BlobStore, LocalBlobStore, R2BlobStore};
use crate::shared::config::{AppConfig, R2Config, StorageBackend};
use crate::shared::database::connection::initialize_database;
use crate::shared::errors::AppResult;
use std::sync::{Arc, Mutex};

/// 設定から共有コンテキストを組み立てる
///
/// データベースを初期化し、設定されたバックエンドの
/// ストレージを選択して各サービスを配線する
///
/// # 引数
/// * `config` - アプリケーション設定
///
/// # 戻り値
/// 共有コンテキスト、または失敗時はエラー
pub async fn bootstrap(config: &AppConfig) -> AppResult<AppContext> {
    let conn = initialize_database(&config.database_path)?;
    let db = Arc::new(Mutex::new(conn));

    let (store, local_store): (Arc<dyn BlobStore>, Option<LocalBlobStore>) =
        match config.storage_backend {
            StorageBackend::Local => {
                let local = LocalBlobStore::new(config.local_storage_dir.clone());
                (Arc::new(local.clone()), Some(local))
            }
            StorageBackend::R2 => {
                let r2_config = R2Config::from_env()?;
                let r2 = R2BlobStore::new(r2_config).await?;
                // 起動時にバケットへ到達できることを確かめる
                r2.test_connection().await?;
                (Arc::new(r2), None)
            }
        };

    let verifier = Arc::new(SessionTokenVerifier::new(Arc::clone(&db)));
    let directory = Arc::new(SqliteUserDirectory::new(Arc::clone(&db)));
    let gate = AccessGate::new(
        verifier as Arc<dyn TokenVerifier>,
        directory as Arc<dyn UserDirectory>,
    );

    let uploader = AttachmentUploader::new(store, config.public_base_url.clone());
    let bills = BillService::new(db, uploader, config.public_base_url.clone());

    Ok(AppContext {
        gate,
        bills,
        local_store,
    })
}
