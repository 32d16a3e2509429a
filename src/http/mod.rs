// HTTPサーバー関連のモジュール

pub mod router;
pub mod server;

use crate::features::auth::AccessGate;
use crate::features::bills::BillService;
use crate::services::LocalBlobStore;

/// リクエスト処理が参照する共有コンテキスト
pub struct AppContext {
    /// 認証・認可ゲート
    pub gate: AccessGate,
    /// 経費申請サービス
    pub bills: BillService,
    /// ローカルストレージ（/public配信用。R2構成ではNone）
    pub local_store: Option<LocalBlobStore>,
}
