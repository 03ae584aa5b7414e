mod app;
mod file_api;
mod logger;
mod request;
mod upload;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use app::AppConfig;
use file_api::{FileApi, FileInfo, PageParams, format_file_size};
use request::HttpClient;
use upload::{ChunkStatus, ChunkUploader};

// ============================================================================
// 命令行定义
// ============================================================================

#[derive(Parser)]
#[command(name = "file-manager")]
#[command(about = "文件管理命令行客户端", long_about = None)]
struct Cli {
    /// 配置文件路径，默认 ./config.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 分页列出文件
    List {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
        #[arg(short, long, default_value_t = 10)]
        size: u32,
        /// 按文件名过滤
        #[arg(short, long)]
        name: Option<String>,
    },

    /// 查看文件详情
    Detail { id: i64 },

    /// 输出预览链接
    PreviewUrl {
        id: i64,
        /// 输出下载链接而不是预览链接
        #[arg(long)]
        download: bool,
    },

    /// 下载文件
    Download {
        id: i64,
        /// 保存路径，目录时使用服务端给出的文件名
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// 上传文件，超过分片大小时自动分片
    Upload { file: PathBuf },

    /// 查看服务端上传配置
    ServerConfig,

    /// 保存登录 token
    Login { token: String },

    /// 清除登录 token
    Logout,
}

// ============================================================================
// 输出
// ============================================================================

fn print_file_row(file: &FileInfo) {
    println!(
        "{:>6}  {:<32}  {:>12}  {:<8}  {}",
        file.id,
        file.original_file_name,
        format_file_size(file.file_size),
        file.status.text(),
        file.create_time
    );
}

fn print_file_detail(file: &FileInfo) {
    println!("ID:       {}", file.id);
    println!("文件名:   {}", file.original_file_name);
    println!("存储名:   {}", file.file_name);
    println!("扩展名:   {}", file.file_ext);
    println!("大小:     {}", format_file_size(file.file_size));
    println!("状态:     {} ({})", file.status.text(), file.status.tag_type());
    println!("存储:     {} / {}", file.storage_type, file.bucket_name);
    println!("访问地址: {}", file.access_url);
    if let Some(md5) = &file.md5 {
        println!("摘要:     {}", md5);
    }
    if let Some(upload_id) = &file.upload_id {
        println!("uploadId: {}", upload_id);
    }
    println!("创建时间: {}", file.create_time);
    println!("更新时间: {}", file.update_time);
}

// ============================================================================
// 主函数
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    logger::init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    debug!("{} 配置: {:?}", config.title, config);

    let http = HttpClient::from_config(&config)?;
    let api = FileApi::new(http);

    match cli.command {
        Commands::List { page, size, name } => {
            let params = PageParams {
                page,
                size,
                file_name: name,
            };
            let result = api.get_file_list(&params).await?;
            for file in &result.records {
                print_file_row(file);
            }
            println!(
                "第 {}/{} 页，共 {} 个文件",
                result.current, result.pages, result.total
            );
        }
        Commands::Detail { id } => {
            let file = api.get_file_detail(id).await?;
            print_file_detail(&file);
        }
        Commands::PreviewUrl { id, download } => {
            println!("{}", api.get_preview_url(id, !download));
        }
        Commands::Download { id, output } => {
            let target = api.download_file(id, &output).await?;
            println!("{}", target.display());
        }
        Commands::Upload { file } => {
            let uploader = ChunkUploader::from_config(api.clone(), &config);
            let report = uploader
                .upload(&file, |chunk| match chunk.status {
                    ChunkStatus::Uploading => info!(
                        "⏳ 分片 {} ({}) 上传中...",
                        chunk.index,
                        format_file_size(chunk.len())
                    ),
                    ChunkStatus::Success => {
                        info!("✅ 分片 {} 完成 {}%", chunk.index, chunk.progress)
                    }
                    other => debug!("分片 {} 状态: {}", chunk.index, other.as_str()),
                })
                .await?;
            info!(
                "🎉 {} 上传完成 ({}，{} 个分片)",
                report.file_name,
                format_file_size(report.file_size),
                report.chunks.len()
            );
            debug!("文件摘要: {}", report.digest);
            if let Some(upload_id) = &report.upload_id {
                debug!("uploadId: {}", upload_id);
            }
            match report.outcome.access_url() {
                Some(url) => println!("{}", url),
                None => println!("{:?}", report.outcome),
            }
        }
        Commands::ServerConfig => {
            let server = api.get_config().await?;
            println!("{}", serde_json::to_string_pretty(&server)?);
            println!(
                "本地: 上传限制 {}，分片大小 {}",
                format_file_size(config.upload_size_limit_bytes()),
                format_file_size(config.chunk_size_bytes())
            );
        }
        Commands::Login { token } => {
            api.http().tokens().set(&token)?;
            info!("✅ token 已保存到 {}", api.http().tokens().path().display());
        }
        Commands::Logout => {
            api.http().tokens().clear()?;
            info!("token 已清除");
        }
    }

    Ok(())
}
