use serde::{Deserialize, Serialize};

/// 添付ファイルなしを表す番兵値（元データとの互換のための文字列リテラル）
pub const NO_ATTACHMENT: &str = "null";

/// ステータスのデフォルト値
pub const STATUS_PENDING: &str = "pending";

/// 還付率（pct）のデフォルト値
pub const DEFAULT_PCT: i64 = 20;

/// 経費申請データモデル（永続化された形）
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    /// 申請キー（作成時に採番される不変の識別子）
    #[serde(rename = "id")]
    pub key: String,
    /// 所有者（作成した社員）のメールアドレス。作成後は不変
    pub email: String,
    pub name: String,
    #[serde(rename = "type")]
    pub bill_type: String,
    /// ISO形式の日付文字列（タイムスタンプではなく日付）
    pub date: String,
    pub amount: i64,
    pub vat: String,
    pub pct: i64,
    pub commentary: String,
    /// pending | accepted | refused
    pub status: String,
    /// 管理者のみが書き込めるコメント
    pub comment_admin: String,
    /// 添付ファイル名（なければ番兵値）
    pub file_name: String,
    /// ストレージ内パスまたはキー（なければ番兵値）
    pub file_path: String,
}

/// 経費申請作成用DTO
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBillDto {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub bill_type: Option<String>,
    pub date: Option<String>,
    pub amount: Option<i64>,
    pub vat: Option<String>,
    pub pct: Option<i64>,
    pub commentary: Option<String>,
    pub status: Option<String>,
    /// アップロード済みファイルのURL（二相投稿の確定時などに使う）
    pub file_url: Option<String>,
    /// アップロード済みファイルの名前
    pub file_name: Option<String>,
}

/// 経費申請更新用DTO（指定されたフィールドのみマージする）
///
/// 所有者メールアドレスとキーは更新経路から書き換えられない
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBillDto {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub bill_type: Option<String>,
    pub date: Option<String>,
    pub amount: Option<i64>,
    pub vat: Option<String>,
    pub pct: Option<i64>,
    pub commentary: Option<String>,
    pub status: Option<String>,
    pub comment_admin: Option<String>,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
}

impl UpdateBillDto {
    /// 管理者専用フィールドへの書き込みを含むかどうか
    ///
    /// statusは`pending`への書き込みのみ一般社員に許す
    pub fn touches_admin_fields(&self) -> bool {
        if self.comment_admin.is_some() {
            return true;
        }

        match self.status.as_deref() {
            Some(status) => status != STATUS_PENDING,
            None => false,
        }
    }
}

/// 表示用に正規化された経費申請
///
/// 日付とステータスは表示形へ変換済みで、`file_url`は
/// `file_path`から導出される（保存はされない）
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BillView {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(rename = "type")]
    pub bill_type: String,
    /// 表示形の日付（解析不能な場合は元の文字列のまま）
    pub date: String,
    pub amount: i64,
    pub vat: String,
    pub pct: i64,
    pub commentary: String,
    /// 表示形のステータスラベル
    pub status: String,
    pub comment_admin: String,
    pub file_name: String,
    /// 公開アクセス用URL（添付がなければNone）
    pub file_url: Option<String>,
}

/// 二相投稿の一相目（ファイル先行アップロード）のレスポンス
///
/// `key`は後続の確定更新の対象識別子になる
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BillDraft {
    pub file_url: Option<String>,
    pub key: String,
}

/// 作成操作のレスポンス（リクエストの形に応じて二通り）
#[derive(Debug, Serialize, Clone)]
#[serde(untagged)]
pub enum CreatedBill {
    /// ファイル先行アップロード時のドラフトハンドル
    Draft(BillDraft),
    /// 完全な申請の作成時は永続化レコードをそのまま返す（正規化はしない）
    Record(Bill),
}
