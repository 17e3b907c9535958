//! 业务响应码表
//!
//! 每个响应码是一个不可变的 (HTTP 状态, 业务码, 英文信息, 中文信息) 四元组，
//! 在进程生命周期内保持不变。

use serde::{Serialize, Serializer, ser::SerializeStruct};

/// 错误输出数据结构
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Code {
    /// HTTP 状态
    pub status: u16,
    /// 业务错误码
    pub code: i32,
    /// 业务错误信息（英文）
    pub message_en: &'static str,
    /// 业务错误信息（中文）
    pub message_cn: &'static str,
}

impl Code {
    const fn new(status: u16, code: i32, message_en: &'static str, message_cn: &'static str) -> Self {
        Self {
            status,
            code,
            message_en,
            message_cn,
        }
    }

    /// 是否表示业务成功
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS.code
    }

    /// 全部响应码
    pub fn all() -> &'static [Code] {
        &CATALOG
    }
}

impl Serialize for Code {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Code", 4)?;
        state.serialize_field("status", &self.status)?;
        state.serialize_field("code", &self.code)?;
        state.serialize_field("message", self.message_en)?;
        state.serialize_field("text", self.message_cn)?;
        state.end()
    }
}

pub const SUCCESS: Code = Code::new(200, 0, "success", "成功");
pub const FAILED: Code = Code::new(200, -1, "failed", "失败");
pub const SERVER_ERROR: Code = Code::new(200, 500, "ServerError", "服务器内部异常");
// 参数相关（200~299）
pub const PARAM_ERR: Code = Code::new(200, 200, "param err", "参数错误");
pub const LOGIN_ERROR: Code = Code::new(200, 302, "account or password error", "用户名或者密码错误");
// 请求相关（400~499）
pub const REQUEST_FAIL: Code = Code::new(200, 402, "request fail", "请求失败，请检查");

static CATALOG: [Code; 6] = [SUCCESS, FAILED, SERVER_ERROR, PARAM_ERR, LOGIN_ERROR, REQUEST_FAIL];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_tuples_are_fixed() {
        assert_eq!((SUCCESS.status, SUCCESS.code), (200, 0));
        assert_eq!((SUCCESS.message_en, SUCCESS.message_cn), ("success", "成功"));
        assert_eq!((FAILED.status, FAILED.code), (200, -1));
        assert_eq!((FAILED.message_en, FAILED.message_cn), ("failed", "失败"));
        assert_eq!((SERVER_ERROR.status, SERVER_ERROR.code), (200, 500));
        assert_eq!(SERVER_ERROR.message_cn, "服务器内部异常");
        assert_eq!((PARAM_ERR.status, PARAM_ERR.code), (200, 200));
        assert_eq!(PARAM_ERR.message_en, "param err");
        assert_eq!((LOGIN_ERROR.status, LOGIN_ERROR.code), (200, 302));
        assert_eq!(LOGIN_ERROR.message_cn, "用户名或者密码错误");
        assert_eq!((REQUEST_FAIL.status, REQUEST_FAIL.code), (200, 402));
        assert_eq!(REQUEST_FAIL.message_en, "request fail");
    }

    #[test]
    fn test_catalog_codes_are_unique() {
        let all = Code::all();
        assert_eq!(all.len(), 6);
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a.code, b.code, "{} 与 {} 业务码重复", a.message_en, b.message_en);
            }
        }
        assert!(SUCCESS.is_success());
        assert!(!FAILED.is_success());
    }

    #[test]
    fn test_serialize_uses_wire_names() {
        let value = serde_json::to_value(PARAM_ERR).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "status": 200,
                "code": 200,
                "message": "param err",
                "text": "参数错误"
            })
        );
    }
}
