use crate::features::attachments::validator;
use crate::services::BlobStore;
use crate::shared::errors::AppResult;
use log::info;
use std::sync::Arc;

/// アップロード候補のファイル
#[derive(Debug, Clone)]
pub struct AttachmentCandidate {
    /// 元のファイル名
    pub file_name: String,
    /// 申告されたメディアタイプ
    pub content_type: String,
    /// ファイルの内容
    pub data: Vec<u8>,
}

/// アップロード済み添付ファイル
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedAttachment {
    /// ストレージが採番したオブジェクトキー
    pub object_key: String,
    /// 公開アクセスURL（ストレージのURL、なければベースURLと
    /// 元のファイル名から決定的に導出したもの）
    pub file_url: String,
    /// 元のファイル名
    pub file_name: String,
    /// 申請レコードに保存するパス（ストレージがURLを返せばそのURL、
    /// 返さなければオブジェクトキー）
    pub file_path: String,
}

/// 添付ファイルの検証とアップロードを担うサービス
pub struct AttachmentUploader {
    store: Arc<dyn BlobStore>,
    /// ストレージの公開ベースURL
    public_base_url: String,
}

impl AttachmentUploader {
    /// 新しいAttachmentUploaderを作成する
    ///
    /// # 引数
    /// * `store` - ファイルストレージ
    /// * `public_base_url` - ストレージの公開ベースURL
    pub fn new(store: Arc<dyn BlobStore>, public_base_url: String) -> Self {
        Self {
            store,
            public_base_url,
        }
    }

    /// 添付ファイルを検証してストレージへ保存する
    ///
    /// 検証はストレージ呼び出しの前に行う。拒否された添付は
    /// ストレージに一切書き込まれない
    ///
    /// # 引数
    /// * `candidate` - アップロード候補のファイル
    ///
    /// # 戻り値
    /// アップロード済み添付ファイル、または失敗時はエラー
    pub async fn upload(&self, candidate: AttachmentCandidate) -> AppResult<UploadedAttachment> {
        validator::validate_file_name(&candidate.file_name)?;
        validator::validate_media_type(&candidate.content_type)?;

        let outcome = self
            .store
            .put(&candidate.file_name, candidate.data, &candidate.content_type)
            .await?;

        // ストレージがURLを持たない場合はベースURLと元のファイル名から導出する
        let (file_url, file_path) = match outcome.url {
            Some(url) => (url.clone(), url),
            None => {
                let fallback = format!(
                    "{}/{}",
                    self.public_base_url.trim_end_matches('/'),
                    candidate.file_name
                );
                (fallback, outcome.key.clone())
            }
        };

        info!(
            "添付ファイルを保存しました: key={}, url={}",
            outcome.key, file_url
        );

        Ok(UploadedAttachment {
            object_key: outcome.key,
            file_url,
            file_name: candidate.file_name,
            file_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::PutOutcome;
    use crate::shared::errors::AppError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// 呼び出しを記録するテスト用ストレージ
    struct RecordingStore {
        puts: Mutex<Vec<String>>,
        url: Option<String>,
        fail: bool,
    }

    impl RecordingStore {
        fn new(url: Option<String>) -> Self {
            Self {
                puts: Mutex::new(Vec::new()),
                url,
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                puts: Mutex::new(Vec::new()),
                url: None,
                fail: true,
            }
        }

        fn put_count(&self) -> usize {
            self.puts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl BlobStore for RecordingStore {
        async fn put(
            &self,
            file_name: &str,
            _data: Vec<u8>,
            _content_type: &str,
        ) -> AppResult<PutOutcome> {
            if self.fail {
                return Err(AppError::upload("ストレージが応答しません"));
            }

            self.puts.lock().unwrap().push(file_name.to_string());
            Ok(PutOutcome {
                key: file_name.to_string(),
                url: self.url.clone(),
            })
        }

        async fn delete(&self, _key: &str) -> AppResult<()> {
            Ok(())
        }
    }

    fn candidate(file_name: &str, content_type: &str) -> AttachmentCandidate {
        AttachmentCandidate {
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            data: b"image-bytes".to_vec(),
        }
    }

    const BASE: &str = "http://127.0.0.1:5678/public";

    #[tokio::test]
    async fn test_rejected_media_type_never_reaches_store() {
        let store = Arc::new(RecordingStore::new(None));
        let uploader = AttachmentUploader::new(Arc::clone(&store) as Arc<dyn BlobStore>, BASE.to_string());

        let result = uploader.upload(candidate("receipt.gif", "image/gif")).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        // 拒否された添付はストレージに書き込まれない
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn test_fallback_url_from_base_and_name() {
        let store = Arc::new(RecordingStore::new(None));
        let uploader = AttachmentUploader::new(store as Arc<dyn BlobStore>, BASE.to_string());

        let uploaded = uploader
            .upload(candidate("receipt.png", "image/png"))
            .await
            .unwrap();

        assert_eq!(
            uploaded.file_url,
            "http://127.0.0.1:5678/public/receipt.png"
        );
        // URLを持たないストレージではキーを保存パスとして使う
        assert_eq!(uploaded.file_path, "receipt.png");
        assert_eq!(uploaded.file_name, "receipt.png");
    }

    #[tokio::test]
    async fn test_store_url_is_preferred() {
        let absolute = "https://storage.example.com/bucket/bills/abc/receipt.png";
        let store = Arc::new(RecordingStore::new(Some(absolute.to_string())));
        let uploader = AttachmentUploader::new(store as Arc<dyn BlobStore>, BASE.to_string());

        let uploaded = uploader
            .upload(candidate("receipt.png", "image/png"))
            .await
            .unwrap();

        assert_eq!(uploaded.file_url, absolute);
        assert_eq!(uploaded.file_path, absolute);
    }

    #[tokio::test]
    async fn test_store_failure_is_propagated() {
        let store = Arc::new(RecordingStore::failing());
        let uploader = AttachmentUploader::new(store as Arc<dyn BlobStore>, BASE.to_string());

        let result = uploader.upload(candidate("receipt.png", "image/png")).await;
        assert!(matches!(result, Err(AppError::Upload(_))));
    }
}
