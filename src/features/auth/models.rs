use serde::{Deserialize, Serialize};

/// ユーザーのロール
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// 一般社員（自分の申請のみ閲覧・操作できる）
    Employee,
    /// 管理者（全申請の閲覧・承認・却下ができる）
    Admin,
}

impl Role {
    /// データベースに保存されている文字列からロールを解決する
    ///
    /// # 引数
    /// * `raw` - ロール文字列（"Employee" または "Admin"）
    ///
    /// # 戻り値
    /// ロール、不明な値の場合はNone
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Employee" => Some(Role::Employee),
            "Admin" => Some(Role::Admin),
            _ => None,
        }
    }

    /// データベース保存用の文字列表現を取得する
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "Employee",
            Role::Admin => "Admin",
        }
    }
}

/// 認証済みの呼び出し主体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// メールアドレス（一意な識別子）
    pub email: String,
    /// ロール
    pub role: Role,
}

/// トークン検証で得られるクレーム
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    /// トークンが主張するメールアドレス
    pub email: String,
}

/// ユーザーディレクトリのレコード
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// メールアドレス
    pub email: String,
    /// ロール
    pub role: Role,
    /// 表示名
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("Employee"), Some(Role::Employee));
        assert_eq!(Role::parse("Admin"), Some(Role::Admin));
        assert_eq!(Role::parse("employee"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn test_role_roundtrip() {
        for role in [Role::Employee, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
    }
}
