use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 文件状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileStatus {
    Success,
    Failed,
    Uploading,
}

impl FileStatus {
    /// 状态显示文本
    pub fn text(self) -> &'static str {
        match self {
            FileStatus::Success => "上传成功",
            FileStatus::Failed => "上传失败",
            FileStatus::Uploading => "上传中",
        }
    }

    /// 状态标签类型
    pub fn tag_type(self) -> &'static str {
        match self {
            FileStatus::Success => "success",
            FileStatus::Failed => "danger",
            FileStatus::Uploading => "warning",
        }
    }
}

/// 文件信息，由服务端创建和维护
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub id: i64,
    pub file_name: String,
    pub original_file_name: String,
    pub file_ext: String,
    pub storage_type: String,
    pub access_url: String,
    #[serde(default)]
    pub md5: Option<String>,
    #[serde(default)]
    pub upload_id: Option<String>,
    pub status: FileStatus,
    pub bucket_name: String,
    pub file_size: u64,
    pub create_time: String,
    pub update_time: String,
}

/// 分页响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResponse<T> {
    pub records: Vec<T>,
    pub total: u64,
    pub size: u64,
    pub current: u64,
    pub pages: u64,
}

/// 分页参数
#[derive(Debug, Clone, PartialEq)]
pub struct PageParams {
    pub page: u32,
    pub size: u32,
    pub file_name: Option<String>,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: 1,
            size: 10,
            file_name: None,
        }
    }
}

impl PageParams {
    /// 转为查询参数，未设置的文件名不出现在查询中
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = vec![
            ("page".to_string(), self.page.to_string()),
            ("size".to_string(), self.size.to_string()),
        ];
        if let Some(name) = self.file_name.as_deref().filter(|n| !n.is_empty()) {
            query.push(("fileName".to_string(), name.to_string()));
        }
        query
    }
}

/// 初始化分片上传的请求体
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateUploadRequest {
    pub file_name: String,
    pub file_size: u64,
    pub chunk_size: u64,
    pub total_chunks: u32,
    pub md5: String,
}

/// 初始化分片上传的响应，可能是裸字符串，也可能是带 uploadId 的对象
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum InitiateUploadResponse {
    Id(String),
    Session {
        #[serde(rename = "uploadId")]
        upload_id: String,
    },
}

impl InitiateUploadResponse {
    pub fn into_upload_id(self) -> String {
        match self {
            InitiateUploadResponse::Id(id) => id,
            InitiateUploadResponse::Session { upload_id } => upload_id,
        }
    }
}

/// 上传或合并完成后服务端返回的结果
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum UploadOutcome {
    Url(String),
    File(Box<FileInfo>),
    Other(Value),
}

impl UploadOutcome {
    /// 文件访问地址（如果能取到）
    pub fn access_url(&self) -> Option<&str> {
        match self {
            UploadOutcome::Url(url) => Some(url.as_str()),
            UploadOutcome::File(info) => Some(info.access_url.as_str()),
            UploadOutcome::Other(value) => value.get("accessUrl").and_then(Value::as_str),
        }
    }
}
