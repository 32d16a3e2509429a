use crate::features::auth::directory::UserDirectory;
use crate::features::auth::models::Principal;
use crate::features::auth::token::TokenVerifier;
use crate::shared::errors::{AppError, AppResult};
use std::sync::Arc;

/// 認証・認可ゲート
///
/// ベアラートークンから呼び出し主体を解決し、
/// 各操作のスコープ判定（自分の申請のみ／全件）を一手に引き受ける
#[derive(Clone)]
pub struct AccessGate {
    /// トークン検証コラボレーター
    verifier: Arc<dyn TokenVerifier>,
    /// ユーザーディレクトリコラボレーター
    directory: Arc<dyn UserDirectory>,
}

impl AccessGate {
    /// 新しいAccessGateを作成する
    ///
    /// # 引数
    /// * `verifier` - トークン検証コラボレーター
    /// * `directory` - ユーザーディレクトリコラボレーター
    pub fn new(verifier: Arc<dyn TokenVerifier>, directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            verifier,
            directory,
        }
    }

    /// ベアラートークンから呼び出し主体を解決する
    ///
    /// トークンが不正・期限切れ・未知ユーザーのいずれでも
    /// 一律`Unauthenticated`を返す（事由は区別しない）
    ///
    /// # 引数
    /// * `token` - ベアラートークン
    ///
    /// # 戻り値
    /// 認証済み主体、または失敗時は`AppError::Unauthenticated`
    pub fn resolve(&self, token: &str) -> AppResult<Principal> {
        let claims = self.verifier.verify(token)?;

        let user = self
            .directory
            .find_by_email(&claims.email)?
            .ok_or_else(|| {
                log::warn!(
                    "トークンの主張するユーザーが見つかりません: email={}",
                    claims.email
                );
                AppError::Unauthenticated
            })?;

        Ok(Principal {
            email: user.email,
            role: user.role,
        })
    }
}

/// 主体が対象レコードを読み書きできるかを判定する純粋関数
///
/// 管理者は全件、一般社員は自分の申請のみ
///
/// # 引数
/// * `principal` - 認証済み主体
/// * `owner_email` - レコードの所有者メールアドレス
pub fn can_access(principal: &Principal, owner_email: &str) -> bool {
    match principal.role {
        crate::features::auth::models::Role::Admin => true,
        crate::features::auth::models::Role::Employee => principal.email == owner_email,
    }
}

/// 主体が管理者専用フィールド（status承認・却下、commentAdmin）を
/// 書き込めるかを判定する純粋関数
pub fn can_moderate(principal: &Principal) -> bool {
    matches!(principal.role, crate::features::auth::models::Role::Admin)
}

/// AuthorizationヘッダーからBearerトークンを抽出する
///
/// # 引数
/// * `authorization_header` - Authorizationヘッダーの値
///
/// # 戻り値
/// 抽出されたトークン（ヘッダー欠如・形式不正の場合はNone）
pub fn extract_bearer_token(authorization_header: Option<&str>) -> Option<&str> {
    authorization_header
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(|token| token.trim())
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::auth::directory::SqliteUserDirectory;
    use crate::features::auth::models::Role;
    use crate::features::auth::service::AuthService;
    use crate::features::auth::token::SessionTokenVerifier;
    use crate::shared::database::connection::create_in_memory_connection;
    use rusqlite::Connection;
    use std::sync::Mutex;

    fn setup_gate() -> (AccessGate, AuthService, SqliteUserDirectory, Arc<Mutex<Connection>>) {
        let db = Arc::new(Mutex::new(create_in_memory_connection().unwrap()));
        let verifier = Arc::new(SessionTokenVerifier::new(Arc::clone(&db)));
        let directory = Arc::new(SqliteUserDirectory::new(Arc::clone(&db)));
        let gate = AccessGate::new(verifier, directory as Arc<dyn UserDirectory>);
        let service = AuthService::new(Arc::clone(&db), 24);
        (
            gate,
            service,
            SqliteUserDirectory::new(Arc::clone(&db)),
            db,
        )
    }

    fn employee(email: &str) -> Principal {
        Principal {
            email: email.to_string(),
            role: Role::Employee,
        }
    }

    fn admin(email: &str) -> Principal {
        Principal {
            email: email.to_string(),
            role: Role::Admin,
        }
    }

    #[test]
    fn test_resolve_valid_token() {
        let (gate, service, directory, _db) = setup_gate();
        directory
            .create_user("e@x.com", Role::Employee, "社員A")
            .unwrap();
        let token = service.create_session("e@x.com").unwrap();

        let principal = gate.resolve(&token).unwrap();
        assert_eq!(principal.email, "e@x.com");
        assert_eq!(principal.role, Role::Employee);
    }

    #[test]
    fn test_resolve_unknown_token() {
        let (gate, _service, _directory, _db) = setup_gate();

        assert!(matches!(
            gate.resolve("no_such_token"),
            Err(AppError::Unauthenticated)
        ));
    }

    #[test]
    fn test_resolve_token_for_missing_user() {
        let (gate, service, directory, db) = setup_gate();
        directory
            .create_user("gone@x.com", Role::Employee, "退職者")
            .unwrap();
        let token = service.create_session("gone@x.com").unwrap();

        // セッションは有効なままユーザーだけ消えた場合も解決できない
        db.lock()
            .unwrap()
            .execute("DELETE FROM users WHERE email = 'gone@x.com'", [])
            .unwrap();

        assert!(matches!(
            gate.resolve(&token),
            Err(AppError::Unauthenticated)
        ));
    }

    #[test]
    fn test_can_access_scoping() {
        let bill_owner = "owner@x.com";

        // 所有者本人はアクセスできる
        assert!(can_access(&employee("owner@x.com"), bill_owner));
        // 他の社員はアクセスできない
        assert!(!can_access(&employee("other@x.com"), bill_owner));
        // 管理者は誰の申請にもアクセスできる
        assert!(can_access(&admin("admin@x.com"), bill_owner));
    }

    #[test]
    fn test_can_moderate() {
        assert!(can_moderate(&admin("admin@x.com")));
        assert!(!can_moderate(&employee("e@x.com")));
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(
            extract_bearer_token(Some("Bearer token123")),
            Some("token123")
        );
        assert_eq!(extract_bearer_token(Some("Bearer ")), None);
        assert_eq!(extract_bearer_token(Some("token123")), None);
        assert_eq!(extract_bearer_token(None), None);
    }
}
