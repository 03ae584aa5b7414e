use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

const READ_BUF: usize = 1024 * 1024;

/// 计算整个文件的 SHA-256，返回十六进制字符串
pub async fn file_digest(path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("打开文件失败: {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_BUF];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
pub fn digest_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABC_SHA256: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    #[test]
    fn test_digest_bytes() {
        assert_eq!(digest_bytes(b"abc"), ABC_SHA256);
    }

    #[tokio::test]
    async fn test_file_digest_matches_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(file_digest(&path).await.unwrap(), ABC_SHA256);

        // 跨越读缓冲区的大文件
        let big: Vec<u8> = (0..(READ_BUF * 2 + 17)).map(|i| (i % 251) as u8).collect();
        let big_path = dir.path().join("big.bin");
        std::fs::write(&big_path, &big).unwrap();
        assert_eq!(file_digest(&big_path).await.unwrap(), digest_bytes(&big));
    }

    #[tokio::test]
    async fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(file_digest(&dir.path().join("nope")).await.is_err());
    }
}
