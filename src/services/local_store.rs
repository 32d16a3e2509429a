// ローカルディスクのファイルストレージモジュール

use crate::services::{BlobStore, PutOutcome};
use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;
use log::{info, warn};
use std::path::{Path, PathBuf};

/// ローカルディスクを使うファイルストレージ（開発・検証用）
///
/// ファイル名そのものをオブジェクトキーとして使い、公開URLは
/// 持たない（URLの導出は呼び出し側に委ねる）
#[derive(Clone)]
pub struct LocalBlobStore {
    dir: PathBuf,
}

impl LocalBlobStore {
    /// 新しいLocalBlobStoreを作成する
    ///
    /// # 引数
    /// * `dir` - 保存先ディレクトリ
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// ファイル名からパス成分を取り除く
    ///
    /// ディレクトリトラバーサルを防ぐため、最後のパス成分のみを
    /// キーとして採用する
    fn sanitize_key(file_name: &str) -> AppResult<String> {
        let name = Path::new(file_name)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| *n != "." && *n != "..")
            .ok_or_else(|| AppError::validation("ファイル名が不正です"))?;

        Ok(name.to_string())
    }

    /// 保存済みファイルを読み出す
    ///
    /// # 引数
    /// * `key` - オブジェクトキー（ファイル名）
    ///
    /// # 戻り値
    /// ファイルの内容（存在しない場合はNone）、または失敗時はエラー
    pub async fn read(&self, key: &str) -> AppResult<Option<Vec<u8>>> {
        let name = Self::sanitize_key(key)?;
        let path = self.dir.join(name);

        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(
        &self,
        file_name: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> AppResult<PutOutcome> {
        let key = Self::sanitize_key(file_name)?;

        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.dir.join(&key);
        if path.exists() {
            // 同名ファイルは上書きする（採番はファイル名のまま）
            warn!("同名の保存ファイルを上書きします: key={key}");
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::upload(format!("ローカル保存に失敗しました: {e}")))?;

        info!(
            "ファイルをローカル保存しました: key={}, content_type={}",
            key, content_type
        );

        Ok(PutOutcome { key, url: None })
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let name = Self::sanitize_key(key)?;
        let path = self.dir.join(name);

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
