use crate::features::auth::models::Claims;
use crate::shared::errors::{AppError, AppResult};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex};

/// ベアラートークンを検証する抽象コラボレーター
///
/// 検証失敗の事由（不正・期限切れ・未知）は呼び出し側に区別させず、
/// すべて`Unauthenticated`として返す
pub trait TokenVerifier: Send + Sync {
    /// トークンを検証してクレームを取り出す
    ///
    /// # 引数
    /// * `token` - ベアラートークン
    ///
    /// # 戻り値
    /// クレーム、または検証失敗時は`AppError::Unauthenticated`
    fn verify(&self, token: &str) -> AppResult<Claims>;
}

/// セッションテーブルを参照するトークン検証器
///
/// トークンそのものは保存せず、ダイジェストで照合する
pub struct SessionTokenVerifier {
    db: Arc<Mutex<Connection>>,
}

impl SessionTokenVerifier {
    /// 新しい検証器を作成する
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }
}

impl TokenVerifier for SessionTokenVerifier {
    fn verify(&self, token: &str) -> AppResult<Claims> {
        if token.is_empty() {
            return Err(AppError::Unauthenticated);
        }

        let digest = token_digest(token);

        let conn = self
            .db
            .lock()
            .map_err(|_| AppError::store("データベースロックの取得に失敗しました"))?;

        let row: Option<(String, String)> = match conn.query_row(
            "SELECT email, expires_at FROM sessions WHERE token_digest = ?1",
            params![digest],
            |row| Ok((row.get(0)?, row.get(1)?)),
        ) {
            Ok(found) => Some(found),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => return Err(AppError::Store(e.to_string())),
        };

        let (email, expires_at) = match row {
            Some(found) => found,
            None => {
                log::debug!("未知のセッショントークンを拒否しました");
                return Err(AppError::Unauthenticated);
            }
        };

        if is_expired(&expires_at) {
            log::debug!("期限切れセッションを拒否しました: email={email}");
            // 期限切れセッションはその場で破棄する
            let _ = conn.execute(
                "DELETE FROM sessions WHERE token_digest = ?1",
                params![digest],
            );
            return Err(AppError::Unauthenticated);
        }

        Ok(Claims { email })
    }
}

/// トークンのダイジェストを計算する（保存・照合用）
pub fn token_digest(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    general_purpose::STANDARD_NO_PAD.encode(digest)
}

/// 有効期限文字列が過去かどうかを判定する
///
/// 解析できない有効期限は安全側に倒して期限切れ扱いにする
fn is_expired(expires_at: &str) -> bool {
    match DateTime::parse_from_rfc3339(expires_at) {
        Ok(expiry) => expiry < Utc::now(),
        Err(_) => {
            log::warn!("有効期限の解析に失敗しました: {expires_at}");
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::database::connection::create_in_memory_connection;
    use chrono::Duration;

    fn setup_db() -> Arc<Mutex<Connection>> {
        Arc::new(Mutex::new(create_in_memory_connection().unwrap()))
    }

    fn insert_session(db: &Arc<Mutex<Connection>>, token: &str, email: &str, expires_at: &str) {
        let conn = db.lock().unwrap();
        conn.execute(
            "INSERT INTO sessions (token_digest, email, expires_at, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                token_digest(token),
                email,
                expires_at,
                Utc::now().to_rfc3339()
            ],
        )
        .unwrap();
    }

    #[test]
    fn test_verify_valid_session() {
        let db = setup_db();
        let expires = (Utc::now() + Duration::hours(1)).to_rfc3339();
        insert_session(&db, "valid_token_123", "e@x.com", &expires);

        let verifier = SessionTokenVerifier::new(db);
        let claims = verifier.verify("valid_token_123").unwrap();
        assert_eq!(claims.email, "e@x.com");
    }

    #[test]
    fn test_verify_unknown_token() {
        let db = setup_db();
        let verifier = SessionTokenVerifier::new(db);

        let result = verifier.verify("unknown_token");
        assert!(matches!(result, Err(AppError::Unauthenticated)));
    }

    #[test]
    fn test_verify_empty_token() {
        let db = setup_db();
        let verifier = SessionTokenVerifier::new(db);

        assert!(matches!(
            verifier.verify(""),
            Err(AppError::Unauthenticated)
        ));
    }

    #[test]
    fn test_verify_expired_session_is_deleted() {
        let db = setup_db();
        let expires = (Utc::now() - Duration::hours(1)).to_rfc3339();
        insert_session(&db, "stale_token_123", "e@x.com", &expires);

        let verifier = SessionTokenVerifier::new(Arc::clone(&db));
        assert!(matches!(
            verifier.verify("stale_token_123"),
            Err(AppError::Unauthenticated)
        ));

        // 期限切れセッションは削除されている
        let count: i64 = db
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_verify_garbled_expiry_rejected() {
        let db = setup_db();
        insert_session(&db, "broken_expiry_token", "e@x.com", "not-a-date");

        let verifier = SessionTokenVerifier::new(db);
        assert!(matches!(
            verifier.verify("broken_expiry_token"),
            Err(AppError::Unauthenticated)
        ));
    }

    #[test]
    fn test_token_digest_is_stable_and_distinct() {
        assert_eq!(token_digest("abc"), token_digest("abc"));
        assert_ne!(token_digest("abc"), token_digest("abd"));
    }
}
