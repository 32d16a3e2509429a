use crate::features::auth::models::{Role, UserRecord};
use crate::shared::errors::{AppError, AppResult};
use chrono::Utc;
use chrono_tz::Asia::Tokyo;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

/// ユーザーディレクトリの抽象コラボレーター
pub trait UserDirectory: Send + Sync {
    /// メールアドレスでユーザーを検索する
    ///
    /// # 引数
    /// * `email` - メールアドレス
    ///
    /// # 戻り値
    /// ユーザーレコード（存在しない場合はNone）、または失敗時はエラー
    fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>>;
}

/// SQLiteのusersテーブルを参照するユーザーディレクトリ
pub struct SqliteUserDirectory {
    db: Arc<Mutex<Connection>>,
}

impl SqliteUserDirectory {
    /// 新しいディレクトリを作成する
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    /// ユーザーを登録する（初期投入・テスト用）
    ///
    /// # 引数
    /// * `email` - メールアドレス
    /// * `role` - ロール
    /// * `name` - 表示名
    pub fn create_user(&self, email: &str, role: Role, name: &str) -> AppResult<()> {
        let now = Utc::now().with_timezone(&Tokyo).to_rfc3339();

        let conn = self
            .db
            .lock()
            .map_err(|_| AppError::store("データベースロックの取得に失敗しました"))?;

        conn.execute(
            "INSERT INTO users (email, type, name, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![email, role.as_str(), name, now],
        )?;

        Ok(())
    }
}

impl UserDirectory for SqliteUserDirectory {
    fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        let conn = self
            .db
            .lock()
            .map_err(|_| AppError::store("データベースロックの取得に失敗しました"))?;

        let row: Option<(String, String, String)> = match conn.query_row(
            "SELECT email, type, name FROM users WHERE email = ?1",
            params![email],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        ) {
            Ok(found) => Some(found),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => return Err(AppError::Store(e.to_string())),
        };

        let (email, raw_role, name) = match row {
            Some(found) => found,
            None => return Ok(None),
        };

        // ロールはCHECK制約で守られているが、解析不能なら未解決として扱う
        let role = match Role::parse(&raw_role) {
            Some(role) => role,
            None => {
                log::warn!("不明なロールを持つユーザーを無視します: email={email}, type={raw_role}");
                return Ok(None);
            }
        };

        Ok(Some(UserRecord { email, role, name }))
    }
}
