use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error};

use super::error::{RequestError, Result};

/// 后端约定的成功码
pub const SUCCESS_CODE: i64 = 200;

/// 直接透传、不做信封解析的内容类型
const BINARY_CONTENT_TYPES: [&str; 5] = [
    "application/octet-stream",
    "application/pdf",
    "image/",
    "audio/",
    "video/",
];

/// 通用响应格式
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i64,
    #[serde(default)]
    pub data: T,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    #[allow(dead_code)]
    pub timestamp: Option<i64>,
}

/// 响应拦截后的结果
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Binary { content_type: String, bytes: Vec<u8> },
}

impl Payload {
    pub fn into_json(self) -> Result<Value> {
        match self {
            Payload::Json(value) => Ok(value),
            Payload::Binary { content_type, .. } => {
                Err(RequestError::UnexpectedBinary { content_type })
            }
        }
    }
}

pub fn is_binary_content(content_type: &str) -> bool {
    BINARY_CONTENT_TYPES
        .iter()
        .any(|marker| content_type.contains(marker))
}

/// 按状态码分类记录错误日志
pub fn handle_error_status(status: i64, message: &str) {
    match status {
        401 => error!("未登录或 token 过期"),
        403 => error!("没有权限"),
        404 => error!("请求的资源不存在"),
        500 => error!("服务器错误"),
        _ => error!("{}", message),
    }
}

/// 响应拦截：HTTP 状态检查、二进制透传、信封解包
pub fn interpret_response(
    status: StatusCode,
    content_type: Option<&str>,
    body: &[u8],
    raw_response: bool,
) -> Result<Payload> {
    if !status.is_success() {
        let message = serde_json::from_slice::<Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .map(str::to_string)
                    .unwrap_or_else(|| status.to_string())
            });
        error!("响应拦截器错误：HTTP {} {}", status.as_u16(), message);
        handle_error_status(i64::from(status.as_u16()), &message);
        return Err(RequestError::Http { status, message });
    }

    if let Some(ct) = content_type {
        if is_binary_content(ct) {
            debug!("二进制响应 ({})，{} 字节，直接返回", ct, body.len());
            return Ok(Payload::Binary {
                content_type: ct.to_string(),
                bytes: body.to_vec(),
            });
        }
    }

    if raw_response {
        return Ok(Payload::Json(serde_json::from_slice(body)?));
    }

    let envelope: ApiResponse<Option<Value>> = serde_json::from_slice(body)?;
    unwrap_envelope(envelope).map(Payload::Json)
}

/// 成功码返回 data，否则记录日志并以服务端消息失败
pub fn unwrap_envelope(envelope: ApiResponse<Option<Value>>) -> Result<Value> {
    if envelope.code == SUCCESS_CODE {
        return Ok(envelope.data.unwrap_or(Value::Null));
    }
    handle_error_status(envelope.code, &envelope.message);
    let message = if envelope.message.is_empty() {
        "请求失败".to_string()
    } else {
        envelope.message
    };
    Err(RequestError::Api {
        code: envelope.code,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn test_success_envelope_yields_data() {
        let raw = body(json!({"code": 200, "data": {"id": 1}, "message": "ok"}));
        let payload =
            interpret_response(StatusCode::OK, Some("application/json"), &raw, false).unwrap();
        assert_eq!(payload, Payload::Json(json!({"id": 1})));
    }

    #[test]
    fn test_failure_envelope_carries_message() {
        let raw = body(json!({"code": 500, "data": null, "message": "文件不存在"}));
        let err = interpret_response(StatusCode::OK, Some("application/json"), &raw, false)
            .unwrap_err();
        match err {
            RequestError::Api { code, message } => {
                assert_eq!(code, 500);
                assert_eq!(message, "文件不存在");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_failure_envelope_without_message_uses_fallback() {
        let raw = body(json!({"code": 1001, "data": null}));
        let err = interpret_response(StatusCode::OK, None, &raw, false).unwrap_err();
        assert_eq!(err.to_string(), "请求失败");
    }

    #[test]
    fn test_missing_data_is_null() {
        let raw = body(json!({"code": 200, "message": "merged"}));
        let payload = interpret_response(StatusCode::OK, None, &raw, false).unwrap();
        assert_eq!(payload, Payload::Json(Value::Null));
    }

    #[test]
    fn test_binary_content_passes_through() {
        let bytes = vec![0x25, 0x50, 0x44, 0x46];
        for ct in [
            "application/octet-stream",
            "application/pdf",
            "image/png",
            "audio/mpeg",
            "video/mp4",
        ] {
            let payload = interpret_response(StatusCode::OK, Some(ct), &bytes, false).unwrap();
            assert_eq!(
                payload,
                Payload::Binary {
                    content_type: ct.to_string(),
                    bytes: bytes.clone()
                }
            );
        }
    }

    #[test]
    fn test_raw_response_skips_unwrapping() {
        let raw = body(json!({"code": 403, "data": null, "message": "no"}));
        let payload = interpret_response(StatusCode::OK, None, &raw, true).unwrap();
        assert_eq!(payload.into_json().unwrap()["code"], 403);
    }

    #[test]
    fn test_http_error_prefers_body_message() {
        let raw = body(json!({"message": "token 已失效"}));
        let err = interpret_response(StatusCode::UNAUTHORIZED, None, &raw, false).unwrap_err();
        match err {
            RequestError::Http { status, message } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(message, "token 已失效");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_http_error_falls_back_to_reason() {
        let err = interpret_response(StatusCode::NOT_FOUND, None, b"<html>", false).unwrap_err();
        assert_eq!(err.to_string(), "HTTP 404 Not Found: Not Found");
    }

    #[test]
    fn test_binary_payload_is_not_json() {
        let payload = Payload::Binary {
            content_type: "image/png".to_string(),
            bytes: vec![],
        };
        assert!(matches!(
            payload.into_json(),
            Err(RequestError::UnexpectedBinary { .. })
        ));
    }
}
