use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

use super::envelope::{Payload, interpret_response};
use super::error::{RequestError, Result};
use super::token::TokenStore;
use crate::app::AppConfig;

/// 表单中的一个字段
#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    Text(String),
    File { file_name: String, bytes: Vec<u8> },
}

/// multipart 表单，发送时再转换为 reqwest 的 Form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    parts: Vec<(String, FormPart)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.parts
            .push((name.to_string(), FormPart::Text(value.into())));
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, bytes: Vec<u8>) -> Self {
        self.parts.push((
            name.to_string(),
            FormPart::File {
                file_name: file_name.to_string(),
                bytes,
            },
        ));
        self
    }

    #[cfg(test)]
    pub fn parts(&self) -> &[(String, FormPart)] {
        &self.parts
    }

    #[cfg(test)]
    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.parts.iter().find_map(|(n, part)| match part {
            FormPart::Text(v) if n == name => Some(v.as_str()),
            _ => None,
        })
    }

    fn into_form(self) -> Form {
        self.parts
            .into_iter()
            .fold(Form::new(), |form, (name, part)| match part {
                FormPart::Text(value) => form.text(name, value),
                FormPart::File { file_name, bytes } => {
                    form.part(name, Part::bytes(bytes).file_name(file_name))
                }
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Form(FormData),
}

/// 请求配置
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// 额外的请求头
    pub headers: Vec<(String, String)>,
    /// 是否添加防缓存时间戳
    pub add_timestamp: bool,
    /// 是否返回完整 JSON，不解包信封
    pub raw_response: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            headers: Vec::new(),
            add_timestamp: true,
            raw_response: false,
        }
    }
}

/// 经过请求拦截处理、待发送的请求
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

/// 请求拦截：注入 token 与时间戳
pub fn prepare_request(
    method: Method,
    path: &str,
    mut query: Vec<(String, String)>,
    mut body: Option<RequestBody>,
    options: &RequestOptions,
    token: Option<&str>,
    timestamp: i64,
) -> PreparedRequest {
    let mut headers = Vec::new();
    if let Some(token) = token {
        headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
    }
    headers.extend(options.headers.iter().cloned());

    let is_form = matches!(body, Some(RequestBody::Form(_)));
    if options.add_timestamp && !is_form {
        if method == Method::GET {
            query.push(("timestamp".to_string(), timestamp.to_string()));
        } else {
            body = match body {
                Some(RequestBody::Json(Value::Object(mut map))) => {
                    map.insert("timestamp".to_string(), Value::from(timestamp));
                    Some(RequestBody::Json(Value::Object(map)))
                }
                None => {
                    let mut map = Map::new();
                    map.insert("timestamp".to_string(), Value::from(timestamp));
                    Some(RequestBody::Json(Value::Object(map)))
                }
                other => other,
            };
        }
    }

    PreparedRequest {
        method,
        path: path.to_string(),
        query,
        headers,
        body,
    }
}

/// 从 Content-Disposition 中取出文件名，去掉路径部分
pub fn filename_from_disposition(header: &str) -> Option<String> {
    let mut plain = None;
    for param in header.split(';').map(str::trim) {
        if let Some(encoded) = param.strip_prefix("filename*=") {
            let value = encoded
                .split_once("''")
                .map(|(_, v)| v)
                .unwrap_or(encoded)
                .trim_matches('"');
            if let Ok(decoded) = urlencoding::decode(value) {
                return sanitize_download_name(&decoded);
            }
        } else if let Some(value) = param.strip_prefix("filename=") {
            plain = sanitize_download_name(value.trim_matches('"'));
        }
    }
    plain
}

fn sanitize_download_name(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("").trim();
    (!base.is_empty() && base != "." && base != "..").then(|| base.to_string())
}

/// HTTP 客户端封装，替代全局单例，显式构造后按引用传递
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    tokens: TokenStore,
}

impl HttpClient {
    pub fn new(base_url: &str, timeout: Duration, tokens: TokenStore) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            config.base_url(),
            Duration::from_secs(config.timeout_secs),
            TokenStore::new(config.token_file.clone()),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// 发送请求并经过响应拦截
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: Vec<(String, String)>,
        body: Option<RequestBody>,
        options: RequestOptions,
    ) -> Result<Payload> {
        let token = self.tokens.get()?;
        let prepared = prepare_request(
            method,
            path,
            query,
            body,
            &options,
            token.as_deref(),
            Utc::now().timestamp_millis(),
        );
        let response = self.send(prepared).await?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(|e| {
            error!("读取响应失败：{}", e);
            e
        })?;
        interpret_response(status, content_type.as_deref(), &bytes, options.raw_response)
    }

    /// 封装 GET 请求
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> Result<T> {
        let payload = self
            .request(Method::GET, path, query, None, RequestOptions::default())
            .await?;
        decode(payload)
    }

    /// 封装 POST 请求
    pub async fn post<T: DeserializeOwned>(&self, path: &str, data: Option<Value>) -> Result<T> {
        let payload = self
            .request(
                Method::POST,
                path,
                Vec::new(),
                data.map(RequestBody::Json),
                RequestOptions::default(),
            )
            .await?;
        decode(payload)
    }

    /// 封装表单提交请求
    pub async fn post_form<T: DeserializeOwned>(&self, path: &str, form: FormData) -> Result<T> {
        let payload = self
            .request(
                Method::POST,
                path,
                Vec::new(),
                Some(RequestBody::Form(form)),
                RequestOptions::default(),
            )
            .await?;
        decode(payload)
    }

    /// 下载文件，流式写入 `dest`；`dest` 为目录时使用响应头中的文件名
    pub async fn download(
        &self,
        path: &str,
        query: Vec<(String, String)>,
        dest: &Path,
    ) -> Result<PathBuf> {
        let token = self.tokens.get()?;
        let prepared = prepare_request(
            Method::GET,
            path,
            query,
            None,
            &RequestOptions::default(),
            token.as_deref(),
            Utc::now().timestamp_millis(),
        );
        let response = self.send(prepared).await?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let disposition_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_disposition);

        if !status.is_success() {
            // 只有 HTTP 错误交给响应拦截处理，2xx 响应体一律原样落盘
            let bytes = response.bytes().await?;
            interpret_response(status, content_type.as_deref(), &bytes, false)?;
            return Err(RequestError::Http {
                status,
                message: status.to_string(),
            });
        }
        debug!("下载内容类型: {}", content_type.as_deref().unwrap_or("未知"));

        let target = resolve_target(dest, disposition_name);
        let mut file = tokio::fs::File::create(&target).await?;
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        info!("✅ 下载完成: {} ({} 字节)", target.display(), written);
        Ok(target)
    }

    async fn send(&self, prepared: PreparedRequest) -> Result<Response> {
        let url = format!("{}{}", self.base_url, prepared.path);
        debug!("➡️ {} {}", prepared.method, url);

        let mut builder = self.client.request(prepared.method, &url);
        if !prepared.query.is_empty() {
            builder = builder.query(&prepared.query);
        }
        for (name, value) in &prepared.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match prepared.body {
            None => builder,
            Some(RequestBody::Json(value)) => builder.json(&value),
            Some(RequestBody::Form(form)) => builder.multipart(form.into_form()),
        };

        builder.send().await.map_err(|e| {
            error!("响应拦截器错误：{}", e);
            RequestError::Transport(e)
        })
    }
}

fn resolve_target(dest: &Path, disposition_name: Option<String>) -> PathBuf {
    if dest.is_dir() {
        dest.join(disposition_name.unwrap_or_else(|| "download".to_string()))
    } else {
        dest.to_path_buf()
    }
}

fn decode<T: DeserializeOwned>(payload: Payload) -> Result<T> {
    Ok(serde_json::from_value(payload.into_json()?)?)
}
