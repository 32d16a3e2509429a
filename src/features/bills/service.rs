use crate::features::attachments::{AttachmentCandidate, AttachmentUploader};
use crate::features::auth::gate::{can_access, can_moderate};
use crate::features::auth::models::Principal;
use crate::features::bills::models::{
    Bill, BillDraft, BillView, CreateBillDto, CreatedBill, UpdateBillDto, NO_ATTACHMENT,
    STATUS_PENDING,
};
use crate::features::bills::{presenter, repository};
use crate::shared::errors::{AppError, AppResult};
use log::info;
use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};

/// 経費申請のライフサイクルを司るサービス
///
/// すべての操作は認証済み主体を要求し、スコープ判定
/// （管理者は全件、一般社員は自分の申請のみ）を通してから
/// 永続化層へ到達する
pub struct BillService {
    db: Arc<Mutex<Connection>>,
    uploader: AttachmentUploader,
    /// ストレージの公開ベースURL
    public_base_url: String,
}

impl BillService {
    /// 新しいBillServiceを作成する
    ///
    /// # 引数
    /// * `db` - データベース接続
    /// * `uploader` - 添付ファイルアップロードサービス
    /// * `public_base_url` - ストレージの公開ベースURL
    pub fn new(
        db: Arc<Mutex<Connection>>,
        uploader: AttachmentUploader,
        public_base_url: String,
    ) -> Self {
        Self {
            db,
            uploader,
            public_base_url,
        }
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| AppError::store("データベースロックの取得に失敗しました"))
    }

    /// 対象レコードをスコープ判定付きで取得する
    ///
    /// 存在しないキーと他人のレコードはどちらも`Unauthorized`で
    /// 区別しない（存在の有無を漏らさない）
    fn load_scoped(
        conn: &Connection,
        principal: &Principal,
        key: &str,
    ) -> AppResult<Bill> {
        let bill = repository::find_by_key(conn, key)?.ok_or(AppError::Unauthorized)?;

        if !can_access(principal, &bill.email) {
            return Err(AppError::Unauthorized);
        }

        Ok(bill)
    }

    /// 経費申請を作成する
    ///
    /// リクエストの形に応じて三通りに振る舞う:
    /// 1. ファイルあり: 検証・アップロード後にドラフトを作成し、
    ///    確定更新用のキーとURLを返す（二相投稿の一相目）
    /// 2. ファイルなしでfileUrl/fileName指定あり: その参照を添付として
    ///    完全なレコードを作成する
    /// 3. どちらもなし: 添付なし（番兵値）のレコードを作成する
    ///
    /// statusをpending以外で指定できるのは管理者のみ
    ///
    /// # 引数
    /// * `principal` - 認証済み主体（所有者になる）
    /// * `dto` - 経費申請作成用DTO
    /// * `file` - アップロードするファイル
    ///
    /// # 戻り値
    /// 作成結果、または失敗時はエラー
    pub async fn create(
        &self,
        principal: Option<&Principal>,
        dto: CreateBillDto,
        file: Option<AttachmentCandidate>,
    ) -> AppResult<CreatedBill> {
        let principal = principal.ok_or(AppError::Unauthenticated)?;

        // statusをpending以外で作成できるのは管理者のみ（更新経路と同じ扱い）
        if let Some(status) = dto.status.as_deref() {
            if status != STATUS_PENDING && !can_moderate(principal) {
                return Err(AppError::Unauthorized);
            }
        }

        if let Some(file) = file {
            // アップロードはロックの外で済ませる
            let uploaded = self.uploader.upload(file).await?;

            let conn = self.lock()?;
            let bill = repository::insert(
                &conn,
                &principal.email,
                &dto,
                &uploaded.file_name,
                &uploaded.file_path,
            )?;

            info!(
                "申請ドラフトを作成しました: key={}, email={}",
                bill.key, principal.email
            );

            return Ok(CreatedBill::Draft(BillDraft {
                file_url: Some(uploaded.file_url),
                key: bill.key,
            }));
        }

        // アップロード済みファイルへの参照が両方揃っていれば添付として扱う
        let (file_name, file_path) = match (dto.file_name.as_deref(), dto.file_url.as_deref()) {
            (Some(name), Some(url)) => (name.to_string(), url.to_string()),
            _ => (NO_ATTACHMENT.to_string(), NO_ATTACHMENT.to_string()),
        };

        let conn = self.lock()?;
        let bill = repository::insert(&conn, &principal.email, &dto, &file_name, &file_path)?;

        info!(
            "申請を作成しました: key={}, email={}",
            bill.key, principal.email
        );

        Ok(CreatedBill::Record(bill))
    }

    /// 経費申請を1件取得して表示用に正規化する
    ///
    /// # 引数
    /// * `principal` - 認証済み主体
    /// * `key` - 申請キー
    ///
    /// # 戻り値
    /// 表示用に正規化された申請、または失敗時はエラー
    pub fn get(&self, principal: Option<&Principal>, key: &str) -> AppResult<BillView> {
        let principal = principal.ok_or(AppError::Unauthenticated)?;
        let conn = self.lock()?;

        let bill = Self::load_scoped(&conn, principal, key)?;
        Ok(presenter::present(&bill, &self.public_base_url))
    }

    /// 主体のスコープに応じた経費申請一覧を取得する
    ///
    /// 管理者は全件、一般社員は自分の申請のみ。結果は表示用に
    /// 正規化され、日付降順で返る
    ///
    /// # 引数
    /// * `principal` - 認証済み主体
    ///
    /// # 戻り値
    /// 表示用に正規化された申請のリスト、または失敗時はエラー
    pub fn list(&self, principal: Option<&Principal>) -> AppResult<Vec<BillView>> {
        let principal = principal.ok_or(AppError::Unauthenticated)?;

        let bills = {
            let conn = self.lock()?;
            if can_moderate(principal) {
                repository::find_all(&conn)?
            } else {
                repository::find_all_by_email(&conn, &principal.email)?
            }
        };

        let sorted = presenter::sort_for_display(bills);
        Ok(sorted
            .iter()
            .map(|bill| presenter::present(bill, &self.public_base_url))
            .collect())
    }

    /// 経費申請を更新する
    ///
    /// 指定フィールドのみマージする。管理者専用フィールド
    /// （承認・却下のstatus、commentAdmin）への書き込みは管理者のみ。
    /// 戻り値は正規化しない（永続化された形をそのまま返す）
    ///
    /// # 引数
    /// * `principal` - 認証済み主体
    /// * `key` - 申請キー
    /// * `dto` - 経費申請更新用DTO
    ///
    /// # 戻り値
    /// 更新された申請、または失敗時はエラー
    pub fn update(
        &self,
        principal: Option<&Principal>,
        key: &str,
        dto: UpdateBillDto,
    ) -> AppResult<Bill> {
        let principal = principal.ok_or(AppError::Unauthenticated)?;
        let conn = self.lock()?;

        let existing = Self::load_scoped(&conn, principal, key)?;

        if dto.touches_admin_fields() && !can_moderate(principal) {
            return Err(AppError::Unauthorized);
        }

        let updated = repository::update(&conn, key, existing, dto)?;

        info!(
            "申請を更新しました: key={}, status={}",
            updated.key, updated.status
        );

        Ok(updated)
    }

    /// 経費申請を削除する
    ///
    /// # 引数
    /// * `principal` - 認証済み主体
    /// * `key` - 申請キー
    pub fn remove(&self, principal: Option<&Principal>, key: &str) -> AppResult<()> {
        let principal = principal.ok_or(AppError::Unauthenticated)?;
        let conn = self.lock()?;

        Self::load_scoped(&conn, principal, key)?;
        repository::delete(&conn, key)?;

        info!("申請を削除しました: key={key}");

        Ok(())
    }
}
