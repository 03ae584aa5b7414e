use reqwest::StatusCode;
use thiserror::Error;

/// HTTP 封装层的错误
#[derive(Error, Debug)]
pub enum RequestError {
    /// 网络或超时等传输层错误，原样向上抛出
    #[error("请求发送失败: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {status}: {message}")]
    Http { status: StatusCode, message: String },
    /// 业务响应码不是成功码
    #[error("{message}")]
    Api { code: i64, message: String },
    #[error("响应解析失败: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("期望 JSON 响应，却收到二进制内容 ({content_type})")]
    UnexpectedBinary { content_type: String },
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RequestError>;
