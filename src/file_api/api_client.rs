use std::fmt::Display;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, info};

use crate::file_api::models::{
    FileInfo, InitiateUploadRequest, InitiateUploadResponse, PageParams, PageResponse,
    UploadOutcome,
};
use crate::request::{FormData, HttpClient};

/// 文件管理相关接口
#[derive(Debug, Clone)]
pub struct FileApi {
    http: HttpClient,
}

impl FileApi {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// 分页获取文件列表
    pub async fn get_file_list(&self, params: &PageParams) -> Result<PageResponse<FileInfo>> {
        debug!("获取文件列表: {:?}", params);
        let page = self
            .http
            .get("/file/getByPage", params.to_query())
            .await
            .context("获取文件列表失败")?;
        Ok(page)
    }

    /// 获取文件详情
    pub async fn get_file_detail(&self, id: i64) -> Result<FileInfo> {
        let info = self
            .http
            .get(&format!("/file/detail/{}", id), Vec::new())
            .await
            .with_context(|| format!("获取文件详情失败: {}", id))?;
        Ok(info)
    }

    /// 获取文件预览链接，`preview` 为 false 时是下载链接
    pub fn get_preview_url(&self, id: impl Display, preview: bool) -> String {
        build_preview_url(self.http.base_url(), id, preview)
    }

    /// 下载文件到 `dest`
    pub async fn download_file(&self, id: impl Display, dest: &Path) -> Result<PathBuf> {
        let id = id.to_string();
        info!("📥 正在下载文件 {}...", id);
        let path = format!("/file/view/{}", urlencoding::encode(&id));
        let target = self
            .http
            .download(&path, vec![("preview".to_string(), "false".to_string())], dest)
            .await
            .with_context(|| format!("下载文件失败: {}", id))?;
        Ok(target)
    }

    /// 获取服务端上传配置
    pub async fn get_config(&self) -> Result<Value> {
        let config = self
            .http
            .get("/file/config", Vec::new())
            .await
            .context("获取服务端配置失败")?;
        Ok(config)
    }

    /// 直接上传整个文件
    pub async fn upload_file(&self, file_path: &Path, md5: &str) -> Result<UploadOutcome> {
        let file_name = file_name_of(file_path)?;
        let bytes = tokio::fs::read(file_path)
            .await
            .with_context(|| format!("读取文件失败: {}", file_path.display()))?;
        info!("📤 正在上传文件 {} ({} 字节)...", file_name, bytes.len());

        let form = FormData::new()
            .file("file", &file_name, bytes)
            .text("md5", md5);
        let outcome = self
            .http
            .post_form("/file/upload", form)
            .await
            .with_context(|| format!("上传文件失败: {}", file_name))?;
        Ok(outcome)
    }

    /// 初始化分片上传，返回服务端分配的 uploadId
    pub async fn initiate_multipart_upload(&self, request: &InitiateUploadRequest) -> Result<String> {
        let body = serde_json::to_value(request)?;
        let response: InitiateUploadResponse = self
            .http
            .post("/file/initiateMultipartUpload", Some(body))
            .await
            .context("初始化分片上传失败")?;
        Ok(response.into_upload_id())
    }

    /// 上传单个分片
    pub async fn upload_chunk(
        &self,
        upload_id: &str,
        chunk_number: u32,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<()> {
        let form = FormData::new()
            .file("file", file_name, bytes)
            .text("chunkNumber", chunk_number.to_string())
            .text("uploadId", upload_id);
        let _: Value = self
            .http
            .post_form("/file/uploadChunk", form)
            .await
            .with_context(|| format!("上传分片 {} 失败", chunk_number))?;
        Ok(())
    }

    /// 合并分片
    pub async fn merge_chunks(&self, upload_id: &str) -> Result<UploadOutcome> {
        let form = FormData::new().text("uploadId", upload_id);
        let outcome = self
            .http
            .post_form("/file/mergeChunks", form)
            .await
            .with_context(|| format!("合并分片失败: {}", upload_id))?;
        Ok(outcome)
    }
}

pub fn build_preview_url(base_url: &str, id: impl Display, preview: bool) -> String {
    format!(
        "{}/file/view/{}?preview={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(&id.to_string()),
        preview
    )
}

pub(crate) fn file_name_of(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("无效的文件路径: {}", path.display()))
}
