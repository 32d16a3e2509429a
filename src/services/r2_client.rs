// R2クライアントモジュール

use crate::services::{BlobStore, PutOutcome};
use crate::shared::config::R2Config;
use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::{Credentials, SharedCredentialsProvider};
use aws_sdk_s3::{Client, Config};
use log::{debug, error, info, warn};
use std::time::Duration;
use uuid::Uuid;

/// アップロードの最大リトライ回数
const MAX_UPLOAD_RETRIES: u32 = 3;

/// Cloudflare R2を使うファイルストレージ
#[derive(Clone)]
pub struct R2BlobStore {
    client: Client,
    bucket_name: String,
    config: R2Config,
}

impl R2BlobStore {
    /// R2クライアントを初期化する
    ///
    /// # 引数
    /// * `config` - R2接続設定
    ///
    /// # 戻り値
    /// 初期化済みストレージ、または設定不備時はエラー
    pub async fn new(config: R2Config) -> AppResult<Self> {
        info!("R2クライアントを初期化しています...");

        // 設定を検証
        config.validate().map_err(|e| {
            error!("R2設定の検証に失敗しました: {e}");
            e
        })?;

        // 認証情報を設定（ログには出力しない）
        debug!("認証情報を設定中...");
        let credentials =
            Credentials::new(&config.access_key, &config.secret_key, None, None, "r2");

        // S3互換設定を構築
        debug!(
            "AWS設定を構築中... エンドポイント: {}",
            config.endpoint_url()
        );
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(config.endpoint_url())
            .region(Region::new(config.region.clone()))
            .credentials_provider(SharedCredentialsProvider::new(credentials))
            .load()
            .await;

        let s3_config = Config::from(&aws_config);
        let client = Client::from_conf(s3_config);
        let bucket_name = config.bucket_name.clone();

        info!(
            "R2クライアントの初期化が完了しました。バケット: {}",
            bucket_name
        );

        Ok(Self {
            client,
            bucket_name,
            config,
        })
    }

    /// オブジェクトキーを生成する（予測困難にする）
    fn generate_object_key(file_name: &str) -> String {
        format!("bills/{}/{}", Uuid::new_v4(), file_name)
    }

    /// ファイルをR2にアップロードする
    async fn upload_once(
        &self,
        key: &str,
        file_data: Vec<u8>,
        content_type: &str,
    ) -> AppResult<String> {
        let file_size = file_data.len();
        info!(
            "ファイルアップロード開始: key={}, size={} bytes, content_type={}",
            key, file_size, content_type
        );

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .body(file_data.into())
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                let error_msg = format!("アップロードエラー: {e}");
                error!(
                    "ファイルアップロード失敗: key={}, bucket={}, error={}",
                    key, self.bucket_name, error_msg
                );
                AppError::upload(error_msg)
            })?;

        // アップロード成功時のHTTPS URLを生成
        let url = format!(
            "{}/{}/{}",
            self.config.endpoint_url(),
            self.bucket_name,
            key
        );

        info!("ファイルアップロード成功: key={key}, url={url}");

        Ok(url)
    }

    /// リトライ機能付きファイルアップロード
    async fn upload_with_retry(
        &self,
        key: &str,
        file_data: Vec<u8>,
        content_type: &str,
    ) -> AppResult<String> {
        let mut attempts = 0;

        loop {
            match self
                .upload_once(key, file_data.clone(), content_type)
                .await
            {
                Ok(url) => {
                    if attempts > 0 {
                        info!(
                            "リトライ後にアップロード成功: key={key}, attempts={attempts}"
                        );
                    }
                    return Ok(url);
                }
                Err(_e) if attempts < MAX_UPLOAD_RETRIES => {
                    attempts += 1;
                    // 指数バックオフ（2^attempts秒待機）
                    let delay = Duration::from_secs(2_u64.pow(attempts));
                    warn!(
                        "アップロード失敗、リトライします: key={}, attempt={}/{}, delay={:?}",
                        key, attempts, MAX_UPLOAD_RETRIES, delay
                    );

                    tokio::time::sleep(delay).await;
                    continue;
                }
                Err(e) => {
                    error!(
                        "アップロード最終失敗: key={}, total_attempts={}",
                        key,
                        attempts + 1
                    );
                    return Err(e);
                }
            }
        }
    }

    /// 接続テスト（バケットの存在確認）
    pub async fn test_connection(&self) -> AppResult<()> {
        info!("R2接続テストを開始します: bucket={}", self.bucket_name);

        self.client
            .head_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
            .map_err(|e| {
                let error_msg = format!("接続テスト失敗: {e}");
                error!(
                    "R2接続テスト失敗: bucket={}, error={}",
                    self.bucket_name, error_msg
                );
                AppError::store(error_msg)
            })?;

        info!("R2接続テスト成功: bucket={}", self.bucket_name);

        Ok(())
    }
}

#[async_trait]
impl BlobStore for R2BlobStore {
    async fn put(
        &self,
        file_name: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> AppResult<PutOutcome> {
        let key = Self::generate_object_key(file_name);
        let url = self.upload_with_retry(&key, data, content_type).await?;

        Ok(PutOutcome {
            key,
            url: Some(url),
        })
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::store(format!("削除エラー: {e}")))?;

        Ok(())
    }
}
