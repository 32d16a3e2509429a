// ファイルストレージ関連のモジュール

pub mod local_store;
pub mod r2_client;

use crate::shared::errors::AppResult;
use async_trait::async_trait;

pub use local_store::LocalBlobStore;
pub use r2_client::R2BlobStore;

/// 保存結果
#[derive(Debug, Clone, PartialEq)]
pub struct PutOutcome {
    /// ストレージが採番したオブジェクトキー
    pub key: String,
    /// 公開アクセスURL（ストレージが自前のURLを持たない場合はNone）
    pub url: Option<String>,
}

/// ファイルストレージの抽象
///
/// キーの採番はストレージ実装に委ねる。R2はバケット内の
/// 衝突しないキーと絶対URLを返し、ローカル実装はファイル名を
/// キーとして返す（URLは返さない）
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// ファイルを保存する
    ///
    /// # 引数
    /// * `file_name` - 元のファイル名
    /// * `data` - ファイルの内容
    /// * `content_type` - メディアタイプ
    ///
    /// # 戻り値
    /// 保存結果、または失敗時はエラー
    async fn put(&self, file_name: &str, data: Vec<u8>, content_type: &str)
        -> AppResult<PutOutcome>;

    /// ファイルを削除する
    ///
    /// # 引数
    /// * `key` - 保存時に採番されたオブジェクトキー
    async fn delete(&self, key: &str) -> AppResult<()>;
}
