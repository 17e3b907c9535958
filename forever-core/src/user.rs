//! 用户注册领域模型

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{Error, Result};

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{3,32}$").expect("valid username pattern"));

const PASSWORD_MIN: usize = 6;
const PASSWORD_MAX: usize = 64;

/// 校验通过的注册参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub password: String,
}

impl NewUser {
    /// 校验用户名与密码
    ///
    /// 用户名：3~32 位字母、数字或下划线；密码：6~64 个字符。
    pub fn parse(username: &str, password: &str) -> Result<Self> {
        let username = username.trim();
        if !USERNAME_RE.is_match(username) {
            return Err(Error::InvalidParam(format!(
                "username '{}' must be 3-32 letters, digits or '_'",
                username
            )));
        }

        let len = password.chars().count();
        if !(PASSWORD_MIN..=PASSWORD_MAX).contains(&len) {
            return Err(Error::InvalidParam(format!(
                "password must be {}-{} characters",
                PASSWORD_MIN, PASSWORD_MAX
            )));
        }

        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

/// 持久化的用户记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub password_hash: String,
    pub salt: String,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn from_new(user: &NewUser) -> Self {
        let salt = Uuid::new_v4().simple().to_string();
        Self {
            username: user.username.clone(),
            password_hash: hash_password(&salt, &user.password),
            salt,
            created_at: Utc::now(),
        }
    }

    pub fn verify(&self, password: &str) -> bool {
        hash_password(&self.salt, password) == self.password_hash
    }

    /// 存储键
    pub fn key(username: &str) -> String {
        format!("user:{}", username)
    }
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// 注册结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Created,
    /// 用户名已被占用
    AlreadyExists,
    /// 同名注册正在进行
    InProgress,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn register(&self, user: &NewUser) -> Result<RegisterOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_valid_input() {
        let user = NewUser::parse("  alice_01 ", "secret1").unwrap();
        assert_eq!(user.username, "alice_01");
        assert_eq!(user.password, "secret1");
    }

    #[test]
    fn test_parse_rejects_bad_username() {
        let long = "x".repeat(33);
        for name in ["", "ab", "has space", "名字名字", long.as_str()] {
            assert!(
                matches!(NewUser::parse(name, "secret1"), Err(Error::InvalidParam(_))),
                "accepted '{}'",
                name
            );
        }
    }

    #[test]
    fn test_parse_rejects_bad_password() {
        assert!(NewUser::parse("alice", "12345").is_err());
        assert!(NewUser::parse("alice", &"p".repeat(65)).is_err());
        // 按字符计数
        assert!(NewUser::parse("alice", "密码密码密码").is_ok());
    }

    #[test]
    fn test_record_hash_and_verify() {
        let user = NewUser::parse("bob", "hunter22").unwrap();
        let a = UserRecord::from_new(&user);
        let b = UserRecord::from_new(&user);

        assert!(a.verify("hunter22"));
        assert!(!a.verify("hunter23"));
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.password_hash, b.password_hash);
        assert_eq!(a.password_hash.len(), 64);
        assert_eq!(UserRecord::key("bob"), "user:bob");
    }
}
