use thiserror::Error;

/// アプリケーション全体で使用される統一エラー型
#[derive(Debug, Error)]
pub enum AppError {
    /// 添付ファイル等の入力検証エラー（ストアへ到達する前に返す）
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// 認証主体を解決できない場合のエラー
    #[error("認証が必要です")]
    Unauthenticated,

    /// 認証済みだが対象レコードへの権限がない場合のエラー
    /// （レコード不存在も同じ扱いにして存在を漏らさない）
    #[error("権限がありません")]
    Unauthorized,

    /// ファイルストレージへの保存失敗
    #[error("アップロードエラー: {0}")]
    Upload(String),

    /// 永続化ストアでの予期しないエラー
    #[error("ストアエラー: {0}")]
    Store(String),

    /// 設定関連のエラー
    #[error("設定エラー: {0}")]
    Configuration(String),

    /// I/O関連のエラー
    #[error("I/Oエラー: {0}")]
    Io(#[from] std::io::Error),

    /// JSON解析エラー
    #[error("JSON解析エラー: {0}")]
    Json(#[from] serde_json::Error),
}

/// エラーの重要度を表す列挙型
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorSeverity {
    /// 低重要度（ユーザー入力エラーなど）
    Low,
    /// 中重要度（外部サービス一時的エラーなど）
    Medium,
    /// 高重要度（ストアエラーなど）
    High,
    /// 最重要（設定不備など）
    Critical,
}

impl AppError {
    /// ユーザーに表示するためのフレンドリーなメッセージを取得
    ///
    /// # 戻り値
    /// ユーザーに表示可能なエラーメッセージ
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            // 認証エラーと権限エラーは事由を区別できないメッセージにする
            AppError::Unauthenticated => "user must be authenticated".to_string(),
            AppError::Unauthorized => "unauthorized action".to_string(),
            AppError::Upload(_) => {
                "ファイルのアップロードに失敗しました。しばらく時間をおいて再試行してください。"
                    .to_string()
            }
            AppError::Store(msg) => msg.clone(),
            AppError::Configuration(_) => "設定エラーが発生しました".to_string(),
            AppError::Io(_) => "ファイル操作でエラーが発生しました".to_string(),
            AppError::Json(_) => "データ形式の解析でエラーが発生しました".to_string(),
        }
    }

    /// エラーの詳細情報を取得（ログ出力用）
    pub fn details(&self) -> String {
        format!("{self}")
    }

    /// エラーの重要度を取得
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AppError::Validation(_) => ErrorSeverity::Low,
            AppError::Unauthenticated => ErrorSeverity::Low,
            AppError::Unauthorized => ErrorSeverity::Low,
            AppError::Upload(_) => ErrorSeverity::Medium,
            AppError::Store(_) => ErrorSeverity::High,
            AppError::Configuration(_) => ErrorSeverity::Critical,
            AppError::Io(_) => ErrorSeverity::Medium,
            AppError::Json(_) => ErrorSeverity::Medium,
        }
    }

    /// バリデーションエラーを作成するヘルパー関数
    pub fn validation<S: Into<String>>(message: S) -> Self {
        AppError::Validation(message.into())
    }

    /// アップロードエラーを作成するヘルパー関数
    pub fn upload<S: Into<String>>(message: S) -> Self {
        AppError::Upload(message.into())
    }

    /// ストアエラーを作成するヘルパー関数
    pub fn store<S: Into<String>>(message: S) -> Self {
        AppError::Store(message.into())
    }

    /// 設定エラーを作成するヘルパー関数
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        AppError::Configuration(message.into())
    }
}

/// rusqlite::ErrorからAppErrorへの変換（ストアエラーとして扱う）
impl From<rusqlite::Error> for AppError {
    fn from(error: rusqlite::Error) -> Self {
        AppError::Store(error.to_string())
    }
}

/// Result型のエイリアス（アプリケーション全体で使用）
pub type AppResult<T> = Result<T, AppError>;
