use crate::features::auth::token::token_digest;
use crate::shared::errors::{AppError, AppResult};
use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use chrono_tz::Asia::Tokyo;
use rand::RngCore;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

/// セッション発行・失効を担うサービス
///
/// パスワード検証などのログインフローはこのコアの外側にあり、
/// そのレイヤーが本サービスを呼んでベアラートークンを発行する
pub struct AuthService {
    db: Arc<Mutex<Connection>>,
    /// セッションの有効時間（時間単位）
    session_ttl_hours: i64,
}

impl AuthService {
    /// 新しいAuthServiceを作成する
    ///
    /// # 引数
    /// * `db` - データベース接続
    /// * `session_ttl_hours` - セッションの有効時間（時間単位）
    pub fn new(db: Arc<Mutex<Connection>>, session_ttl_hours: i64) -> Self {
        Self {
            db,
            session_ttl_hours,
        }
    }

    /// セッションを発行してベアラートークンを返す
    ///
    /// トークン本体は保存せず、ダイジェストのみをsessionsテーブルに残す
    ///
    /// # 引数
    /// * `email` - 認証済みユーザーのメールアドレス
    ///
    /// # 戻り値
    /// ベアラートークン、または失敗時はエラー
    pub fn create_session(&self, email: &str) -> AppResult<String> {
        let token = generate_token();
        let now = Utc::now();
        let expires_at = (now + Duration::hours(self.session_ttl_hours)).to_rfc3339();
        let created_at = now.with_timezone(&Tokyo).to_rfc3339();

        let conn = self
            .db
            .lock()
            .map_err(|_| AppError::store("データベースロックの取得に失敗しました"))?;

        conn.execute(
            "INSERT INTO sessions (token_digest, email, expires_at, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![token_digest(&token), email, expires_at, created_at],
        )?;

        log::info!("セッションを発行しました: email={email}");

        Ok(token)
    }

    /// セッションを失効させる
    ///
    /// # 引数
    /// * `token` - 失効対象のベアラートークン
    pub fn revoke_session(&self, token: &str) -> AppResult<()> {
        let conn = self
            .db
            .lock()
            .map_err(|_| AppError::store("データベースロックの取得に失敗しました"))?;

        conn.execute(
            "DELETE FROM sessions WHERE token_digest = ?1",
            params![token_digest(token)],
        )?;

        Ok(())
    }

    /// 期限切れセッションを掃除する
    ///
    /// # 戻り値
    /// 削除されたレコード数、または失敗時はエラー
    pub fn cleanup_expired_sessions(&self) -> AppResult<usize> {
        let now = Utc::now().to_rfc3339();

        let conn = self
            .db
            .lock()
            .map_err(|_| AppError::store("データベースロックの取得に失敗しました"))?;

        let removed = conn.execute(
            "DELETE FROM sessions WHERE expires_at < ?1",
            params![now],
        )?;

        if removed > 0 {
            log::info!("期限切れセッションを削除しました: count={removed}");
        }

        Ok(removed)
    }
}

/// ランダムなセッショントークンを生成する
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
