use std::io::SeekFrom;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, error, info};

use crate::app::AppConfig;
use crate::file_api::api_client::file_name_of;
use crate::file_api::models::{InitiateUploadRequest, UploadOutcome};
use crate::file_api::{FileApi, format_file_size};
use crate::upload::chunk::{ChunkInfo, ChunkStatus, split_file};
use crate::upload::hash::file_digest;

/// 上传流程用到的服务端接口
#[allow(async_fn_in_trait)]
pub trait ChunkTransport {
    async fn initiate(&self, request: &InitiateUploadRequest) -> Result<String>;

    async fn upload_chunk(
        &self,
        upload_id: &str,
        chunk_number: u32,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<()>;

    async fn merge(&self, upload_id: &str) -> Result<UploadOutcome>;

    /// 不分片，直接上传整个文件
    async fn upload_whole(&self, file_path: &Path, md5: &str) -> Result<UploadOutcome>;
}

impl ChunkTransport for FileApi {
    async fn initiate(&self, request: &InitiateUploadRequest) -> Result<String> {
        self.initiate_multipart_upload(request).await
    }

    async fn upload_chunk(
        &self,
        upload_id: &str,
        chunk_number: u32,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<()> {
        FileApi::upload_chunk(self, upload_id, chunk_number, file_name, bytes).await
    }

    async fn merge(&self, upload_id: &str) -> Result<UploadOutcome> {
        self.merge_chunks(upload_id).await
    }

    async fn upload_whole(&self, file_path: &Path, md5: &str) -> Result<UploadOutcome> {
        self.upload_file(file_path, md5).await
    }
}

/// 一次上传的结果
#[derive(Debug, Clone)]
pub struct UploadReport {
    pub file_name: String,
    pub file_size: u64,
    /// 整个文件的 SHA-256
    pub digest: String,
    /// 分片上传时服务端分配的会话标识
    pub upload_id: Option<String>,
    pub chunks: Vec<ChunkInfo>,
    pub outcome: UploadOutcome,
}

/// 顺序执行的上传编排：初始化会话、逐片上传、合并
pub struct ChunkUploader<T> {
    transport: T,
    /// 分片大小，单位 MB
    chunk_size_mb: f64,
    chunk_size: u64,
    upload_size_limit: u64,
}

impl<T: ChunkTransport> ChunkUploader<T> {
    pub fn new(transport: T, chunk_size_mb: f64, upload_size_limit: u64) -> Self {
        Self {
            transport,
            chunk_size_mb,
            chunk_size: (chunk_size_mb * 1024.0 * 1024.0) as u64,
            upload_size_limit,
        }
    }

    pub fn from_config(transport: T, config: &AppConfig) -> Self {
        Self::new(
            transport,
            config.chunk_size,
            config.upload_size_limit_bytes(),
        )
    }

    /// 上传文件：不超过一个分片时直接上传，否则走分片流程
    pub async fn upload<F>(&self, file_path: &Path, on_chunk: F) -> Result<UploadReport>
    where
        F: FnMut(&ChunkInfo),
    {
        let file_name = file_name_of(file_path)?;
        let file_size = tokio::fs::metadata(file_path)
            .await
            .with_context(|| format!("读取文件信息失败: {}", file_path.display()))?
            .len();

        if file_size > self.upload_size_limit {
            bail!(
                "文件 {} 大小 {} 超过上传限制 {}",
                file_name,
                format_file_size(file_size),
                format_file_size(self.upload_size_limit)
            );
        }

        let digest = file_digest(file_path).await?;
        debug!("文件摘要: {} -> {}", file_name, digest);

        if file_size <= self.chunk_size {
            info!("📤 文件 {} 不超过一个分片，直接上传", file_name);
            let outcome = self.transport.upload_whole(file_path, &digest).await?;
            info!("✅ 上传成功: {}", file_name);
            return Ok(UploadReport {
                file_name,
                file_size,
                digest,
                upload_id: None,
                chunks: Vec::new(),
                outcome,
            });
        }

        self.upload_chunked(file_path, &file_name, file_size, digest, on_chunk)
            .await
    }

    /// 分片上传，任意分片失败即中止，不会请求合并
    pub async fn upload_chunked<F>(
        &self,
        file_path: &Path,
        file_name: &str,
        file_size: u64,
        digest: String,
        mut on_chunk: F,
    ) -> Result<UploadReport>
    where
        F: FnMut(&ChunkInfo),
    {
        let mut chunks = split_file(file_name, file_size, self.chunk_size_mb)?;
        if chunks.is_empty() {
            bail!("文件 {} 为空，无法分片上传", file_name);
        }
        let total = chunks.len();

        info!("--- 阶段1: 初始化分片上传 ({} 个分片) ---", total);
        let request = InitiateUploadRequest {
            file_name: file_name.to_string(),
            file_size,
            chunk_size: self.chunk_size,
            total_chunks: total as u32,
            md5: digest.clone(),
        };
        let upload_id = self.transport.initiate(&request).await?;
        info!("✅ 获取到 uploadId: {}", upload_id);

        info!("--- 阶段2: 逐片上传 ---");
        let mut file = tokio::fs::File::open(file_path)
            .await
            .with_context(|| format!("打开文件失败: {}", file_path.display()))?;

        for chunk in chunks.iter_mut() {
            chunk.status = ChunkStatus::Uploading;
            chunk.progress = 0;
            on_chunk(chunk);

            let sent = async {
                let bytes = read_range(&mut file, chunk).await?;
                self.transport
                    .upload_chunk(&upload_id, chunk.index, file_name, bytes)
                    .await
            }
            .await;

            match sent {
                Ok(()) => {
                    chunk.status = ChunkStatus::Success;
                    chunk.progress = 100;
                    on_chunk(chunk);
                    debug!("分片 {}/{} 上传成功 ({})", chunk.index + 1, total, chunk.hash);
                }
                Err(e) => {
                    chunk.status = ChunkStatus::Error;
                    on_chunk(chunk);
                    error!("❌ 分片 {}/{} 上传失败: {}", chunk.index + 1, total, e);
                    return Err(e.context(format!(
                        "分片 {}/{} 上传失败，上传已中止",
                        chunk.index + 1,
                        total
                    )));
                }
            }
        }

        info!("--- 阶段3: 请求合并分片 ---");
        let outcome = self.transport.merge(&upload_id).await?;
        info!("🎉 分片上传完成: {}", file_name);

        Ok(UploadReport {
            file_name: file_name.to_string(),
            file_size,
            digest,
            upload_id: Some(upload_id),
            chunks,
            outcome,
        })
    }
}

async fn read_range(file: &mut tokio::fs::File, chunk: &ChunkInfo) -> Result<Vec<u8>> {
    file.seek(SeekFrom::Start(chunk.start)).await?;
    let mut buf = vec![0u8; chunk.len() as usize];
    file.read_exact(&mut buf)
        .await
        .with_context(|| format!("读取分片 {} 失败", chunk.index))?;
    Ok(buf)
}
