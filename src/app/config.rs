use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// 上传大小限制，单位 MB
    #[serde(default = "default_upload_size_limit")]
    pub upload_size_limit: f64,
    /// 分片大小，单位 MB
    #[serde(default = "default_chunk_size")]
    pub chunk_size: f64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,
}

impl AppConfig {
    /// 读取配置文件，再叠加环境变量
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = config_path.unwrap_or_else(|| Path::new("config.toml"));
        let mut cfg = if path.exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
            toml::from_str::<AppConfig>(&raw)
                .with_context(|| format!("解析配置文件失败: {}", path.display()))?
        } else {
            AppConfig::default()
        };
        cfg.apply_overrides(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// 用 `lookup` 提供的值覆盖配置项
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("FILE_MANAGER_TITLE") {
            self.title = v;
        }
        if let Some(v) = lookup("FILE_MANAGER_API_URL") {
            self.api_url = v;
        }
        if let Some(v) = lookup("FILE_MANAGER_UPLOAD_SIZE_LIMIT") {
            self.upload_size_limit = v
                .trim()
                .parse()
                .with_context(|| format!("FILE_MANAGER_UPLOAD_SIZE_LIMIT 不是数字: {}", v))?;
        }
        if let Some(v) = lookup("FILE_MANAGER_CHUNK_SIZE") {
            self.chunk_size = v
                .trim()
                .parse()
                .with_context(|| format!("FILE_MANAGER_CHUNK_SIZE 不是数字: {}", v))?;
        }
        if let Some(v) = lookup("FILE_MANAGER_TIMEOUT_SECS") {
            self.timeout_secs = v
                .trim()
                .parse()
                .with_context(|| format!("FILE_MANAGER_TIMEOUT_SECS 不是整数: {}", v))?;
        }
        if let Some(v) = lookup("FILE_MANAGER_TOKEN_FILE") {
            self.token_file = PathBuf::from(v);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        // 换算成字节后为 0 的值同样无效
        if self.chunk_size_bytes() == 0 {
            bail!("分片大小必须至少 1 字节，当前为 {} MB", self.chunk_size);
        }
        if self.upload_size_limit_bytes() == 0 {
            bail!("上传大小限制必须至少 1 字节，当前为 {} MB", self.upload_size_limit);
        }
        Ok(())
    }

    pub fn upload_size_limit_bytes(&self) -> u64 {
        (self.upload_size_limit * MB) as u64
    }

    pub fn chunk_size_bytes(&self) -> u64 {
        (self.chunk_size * MB) as u64
    }

    /// 去掉末尾斜杠的 API 地址
    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            api_url: default_api_url(),
            upload_size_limit: default_upload_size_limit(),
            chunk_size: default_chunk_size(),
            timeout_secs: default_timeout_secs(),
            token_file: default_token_file(),
        }
    }
}

fn default_title() -> String {
    "文件管理系统".to_string()
}

fn default_api_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_upload_size_limit() -> f64 {
    1024.0
}

fn default_chunk_size() -> f64 {
    5.0
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_token_file() -> PathBuf {
    PathBuf::from(".file_manager_token")
}
