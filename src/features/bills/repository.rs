use crate::features::bills::models::{
    Bill, CreateBillDto, UpdateBillDto, DEFAULT_PCT, STATUS_PENDING,
};
use crate::shared::errors::AppResult;
use chrono::Utc;
use chrono_tz::Asia::Tokyo;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

/// SELECT句の列並び（map_rowと対で管理する）
const BILL_COLUMNS: &str =
    "key, email, name, type, date, amount, vat, pct, commentary, status, comment_admin, file_name, file_path";

/// 行をBillへ写像する
fn map_row(row: &Row<'_>) -> Result<Bill, rusqlite::Error> {
    Ok(Bill {
        key: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        bill_type: row.get(3)?,
        date: row.get(4)?,
        amount: row.get(5)?,
        vat: row.get(6)?,
        pct: row.get(7)?,
        commentary: row.get(8)?,
        status: row.get(9)?,
        comment_admin: row.get(10)?,
        file_name: row.get(11)?,
        file_path: row.get(12)?,
    })
}

/// 経費申請を作成する
///
/// キーはここで採番され、以後不変。未指定のフィールドには
/// デフォルト値（status=pending、pct=20、添付は番兵値）を与える
///
/// # 引数
/// * `conn` - データベース接続
/// * `email` - 所有者（作成した社員）のメールアドレス
/// * `dto` - 経費申請作成用DTO
/// * `file_name` - 添付ファイル名（なければ番兵値）
/// * `file_path` - 添付のストレージ内パスまたはURL（なければ番兵値）
///
/// # 戻り値
/// 作成された経費申請、または失敗時はエラー
pub fn insert(
    conn: &Connection,
    email: &str,
    dto: &CreateBillDto,
    file_name: &str,
    file_path: &str,
) -> AppResult<Bill> {
    // JSTで現在時刻を取得
    let now = Utc::now().with_timezone(&Tokyo).to_rfc3339();
    let key = Uuid::new_v4().to_string();

    let pct = dto.pct.filter(|p| *p > 0).unwrap_or(DEFAULT_PCT);
    let status = dto.status.as_deref().unwrap_or(STATUS_PENDING);

    conn.execute(
        "INSERT INTO bills
             (key, email, name, type, date, amount, vat, pct, commentary, status,
              comment_admin, file_name, file_path, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        params![
            key,
            email,
            dto.name.as_deref().unwrap_or(""),
            dto.bill_type.as_deref().unwrap_or(""),
            dto.date.as_deref().unwrap_or(""),
            dto.amount.unwrap_or(0),
            dto.vat.as_deref().unwrap_or(""),
            pct,
            dto.commentary.as_deref().unwrap_or(""),
            status,
            "",
            file_name,
            file_path,
            now,
            now,
        ],
    )?;

    find_by_key(conn, &key)?
        .ok_or_else(|| crate::shared::errors::AppError::store("作成直後の申請を再取得できませんでした"))
}

/// キーで経費申請を取得する
///
/// # 引数
/// * `conn` - データベース接続
/// * `key` - 申請キー
///
/// # 戻り値
/// 経費申請（存在しない場合はNone）、または失敗時はエラー
pub fn find_by_key(conn: &Connection, key: &str) -> AppResult<Option<Bill>> {
    let query = format!("SELECT {BILL_COLUMNS} FROM bills WHERE key = ?1");

    match conn.query_row(&query, params![key], map_row) {
        Ok(bill) => Ok(Some(bill)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// 全件の経費申請を取得する（管理者スコープ）
///
/// # 引数
/// * `conn` - データベース接続
///
/// # 戻り値
/// 経費申請のリスト、または失敗時はエラー
pub fn find_all(conn: &Connection) -> AppResult<Vec<Bill>> {
    let query = format!("SELECT {BILL_COLUMNS} FROM bills ORDER BY date DESC");

    let mut stmt = conn.prepare(&query)?;
    let bills = stmt.query_map([], map_row)?;

    Ok(bills.collect::<Result<Vec<_>, _>>()?)
}

/// 所有者のメールアドレスで経費申請を取得する（一般社員スコープ）
///
/// # 引数
/// * `conn` - データベース接続
/// * `email` - 所有者のメールアドレス
///
/// # 戻り値
/// 経費申請のリスト、または失敗時はエラー
pub fn find_all_by_email(conn: &Connection, email: &str) -> AppResult<Vec<Bill>> {
    let query = format!("SELECT {BILL_COLUMNS} FROM bills WHERE email = ?1 ORDER BY date DESC");

    let mut stmt = conn.prepare(&query)?;
    let bills = stmt.query_map(params![email], map_row)?;

    Ok(bills.collect::<Result<Vec<_>, _>>()?)
}

/// 経費申請を更新する
///
/// 指定されたフィールドのみ既存レコードへマージする。
/// キーと所有者メールアドレスはこの経路からは書き換えられない
///
/// # 引数
/// * `conn` - データベース接続
/// * `key` - 申請キー
/// * `existing` - マージ元の既存レコード
/// * `dto` - 経費申請更新用DTO
///
/// # 戻り値
/// 更新された経費申請、または失敗時はエラー
pub fn update(
    conn: &Connection,
    key: &str,
    existing: Bill,
    dto: UpdateBillDto,
) -> AppResult<Bill> {
    // JSTで現在時刻を取得
    let now = Utc::now().with_timezone(&Tokyo).to_rfc3339();

    // 更新するフィールドを決定
    let name = dto.name.unwrap_or(existing.name);
    let bill_type = dto.bill_type.unwrap_or(existing.bill_type);
    let date = dto.date.unwrap_or(existing.date);
    let amount = dto.amount.unwrap_or(existing.amount);
    let vat = dto.vat.unwrap_or(existing.vat);
    let pct = dto.pct.unwrap_or(existing.pct);
    let commentary = dto.commentary.unwrap_or(existing.commentary);
    let status = dto.status.unwrap_or(existing.status);
    let comment_admin = dto.comment_admin.unwrap_or(existing.comment_admin);
    let file_name = dto.file_name.unwrap_or(existing.file_name);
    // 二相投稿の確定更新はfile_urlを保存パスとして引き継ぐ
    let file_path = dto.file_url.unwrap_or(existing.file_path);

    conn.execute(
        "UPDATE bills SET name = ?1, type = ?2, date = ?3, amount = ?4, vat = ?5,
             pct = ?6, commentary = ?7, status = ?8, comment_admin = ?9,
             file_name = ?10, file_path = ?11, updated_at = ?12
         WHERE key = ?13",
        params![
            name,
            bill_type,
            date,
            amount,
            vat,
            pct,
            commentary,
            status,
            comment_admin,
            file_name,
            file_path,
            now,
            key,
        ],
    )?;

    find_by_key(conn, key)?
        .ok_or_else(|| crate::shared::errors::AppError::store("更新直後の申請を再取得できませんでした"))
}

/// 経費申請を削除する
///
/// # 引数
/// * `conn` - データベース接続
/// * `key` - 申請キー
///
/// # 戻り値
/// レコードを削除したかどうか、または失敗時はエラー
pub fn delete(conn: &Connection, key: &str) -> AppResult<bool> {
    let affected_rows = conn.execute("DELETE FROM bills WHERE key = ?1", params![key])?;
    Ok(affected_rows > 0)
}
