// 環境変数ベースの設定管理モジュール

use crate::shared::errors::{AppError, AppResult};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// ファイルストレージのバックエンド種別
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// ローカルディレクトリに保存（開発用・元実装のディスク保存に相当）
    Local,
    /// R2（S3互換API）に保存
    R2,
}

/// アプリケーション全体の設定
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTPサーバーのバインドアドレス
    pub bind_addr: String,
    /// SQLiteデータベースファイルのパス
    pub database_path: PathBuf,
    /// 公開ファイルURLのベースアドレス（フォールバックURL生成に使用）
    pub public_base_url: String,
    /// ストレージバックエンドの種別
    pub storage_backend: StorageBackend,
    /// ローカルストレージのディレクトリ
    pub local_storage_dir: PathBuf,
    /// セッションの有効時間（時間単位）
    pub session_ttl_hours: i64,
    /// ログレベル
    pub log_level: String,
    /// 実行環境名
    pub environment: String,
}

impl AppConfig {
    /// 環境変数から設定を読み込む
    ///
    /// # 戻り値
    /// アプリケーション設定、または失敗時はエラー
    pub fn from_env() -> AppResult<Self> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let bind_addr =
            env::var("KEIHI_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:5678".to_string());

        let database_path = env::var("KEIHI_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(default_database_filename(&environment)));

        // フォールバックURLのベースは必ず設定値から取る（ロジックへの埋め込み禁止）
        let public_base_url = env::var("STORAGE_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:5678/public".to_string());

        let storage_backend = match env::var("STORAGE_BACKEND").as_deref() {
            Ok("r2") => StorageBackend::R2,
            Ok("local") | Err(_) => StorageBackend::Local,
            Ok(other) => {
                return Err(AppError::configuration(format!(
                    "不明なストレージバックエンドです: {other}"
                )));
            }
        };

        let local_storage_dir = env::var("STORAGE_LOCAL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./public"));

        let session_ttl_hours = env::var("SESSION_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(24);

        let config = Self {
            bind_addr,
            database_path,
            public_base_url,
            storage_backend,
            local_storage_dir,
            session_ttl_hours,
            log_level,
            environment,
        };

        config.validate()?;

        info!(
            "設定を読み込みました: environment={}, backend={:?}, db={:?}",
            config.environment, config.storage_backend, config.database_path
        );

        Ok(config)
    }

    /// 設定の検証
    pub fn validate(&self) -> AppResult<()> {
        if self.public_base_url.is_empty() {
            return Err(AppError::configuration(
                "STORAGE_PUBLIC_BASE_URLが設定されていません",
            ));
        }

        if !self.public_base_url.starts_with("http") {
            return Err(AppError::configuration(format!(
                "公開ベースURLが不正です: {}",
                self.public_base_url
            )));
        }

        if self.session_ttl_hours <= 0 {
            return Err(AppError::configuration(
                "SESSION_TTL_HOURSは正の値である必要があります",
            ));
        }

        Ok(())
    }

    /// プロダクション環境かどうかを判定する
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// 環境に応じたデータベースファイル名を取得する
///
/// # ファイル名の規則
/// - 開発環境: "dev_bills.db"
/// - プロダクション環境: "bills.db"
fn default_database_filename(environment: &str) -> &'static str {
    if environment == "production" {
        "bills.db"
    } else {
        "dev_bills.db"
    }
}

/// 環境に応じた.envファイルを読み込む
///
/// 環境固有のファイルが見つからない場合はデフォルトの.envに
/// フォールバックし、それもなければ直接設定された環境変数を使う
pub fn load_environment_variables() {
    let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

    let env_file = match environment.as_str() {
        "production" => ".env.production",
        _ => ".env",
    };

    match dotenv::from_filename(env_file) {
        Ok(_) => {
            info!("{env_file}ファイルを読み込みました");
        }
        Err(_) => {
            if env_file != ".env" && dotenv::dotenv().is_ok() {
                warn!("{env_file}が見つからないため、デフォルトの.envファイルを読み込みました");
            } else {
                warn!("環境変数ファイルが見つかりません。直接設定された環境変数を使用します。");
            }
        }
    }
}

/// ログシステムを初期化する
///
/// # 引数
/// * `log_level` - ログレベル（error/warn/info/debug/trace）
pub fn initialize_logging_system(log_level: &str) {
    let level = match log_level.to_lowercase().as_str() {
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    };

    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp_secs()
        .format_module_path(false)
        .format_target(false)
        .init();

    info!("ログシステムを初期化しました: level={log_level}");
}

/// R2（S3互換）ストレージの設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct R2Config {
    pub account_id: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket_name: String,
    pub region: String,
}

impl R2Config {
    /// 環境変数から設定を読み込み
    pub fn from_env() -> AppResult<Self> {
        info!("R2設定を環境変数から読み込み中...");

        let account_id = env::var("R2_ACCOUNT_ID")
            .map_err(|_| AppError::configuration("R2_ACCOUNT_IDが設定されていません"))?;
        let access_key = env::var("R2_ACCESS_KEY")
            .map_err(|_| AppError::configuration("R2_ACCESS_KEYが設定されていません"))?;
        let secret_key = env::var("R2_SECRET_KEY")
            .map_err(|_| AppError::configuration("R2_SECRET_KEYが設定されていません"))?;
        let bucket_name = env::var("R2_BUCKET_NAME")
            .map_err(|_| AppError::configuration("R2_BUCKET_NAMEが設定されていません"))?;
        let region = env::var("R2_REGION").unwrap_or_else(|_| "auto".to_string());

        let config = Self {
            account_id,
            access_key,
            secret_key,
            bucket_name,
            region,
        };

        config.validate()?;

        info!("R2設定の読み込みが完了しました");
        debug!(
            "設定詳細: account_id={}, bucket_name={}, region={}",
            config.mask_account_id(),
            &config.bucket_name,
            &config.region
        );

        Ok(config)
    }

    /// 設定の検証
    pub fn validate(&self) -> AppResult<()> {
        if self.account_id.is_empty() {
            return Err(AppError::configuration("アカウントIDが空です"));
        }

        if self.access_key.is_empty() {
            return Err(AppError::configuration("アクセスキーが空です"));
        }

        if self.secret_key.is_empty() {
            return Err(AppError::configuration("シークレットキーが空です"));
        }

        if self.bucket_name.is_empty() {
            return Err(AppError::configuration("バケット名が空です"));
        }

        // バケット名の形式チェック
        if !self
            .bucket_name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            warn!("バケット名に無効な文字が含まれている可能性があります");
        }

        Ok(())
    }

    /// R2エンドポイントURLを生成
    pub fn endpoint_url(&self) -> String {
        format!("https://{}.r2.cloudflarestorage.com", self.account_id)
    }

    /// アカウントIDをマスク（ログ出力用）
    fn mask_account_id(&self) -> String {
        if self.account_id.len() > 8 {
            format!(
                "{}****{}",
                &self.account_id[..4],
                &self.account_id[self.account_id.len() - 4..]
            )
        } else {
            "****".to_string()
        }
    }
}
