use anyhow::{Result, bail};

const MB: f64 = 1024.0 * 1024.0;

/// 分片状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStatus {
    Ready,
    Uploading,
    Success,
    Error,
}

impl ChunkStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ChunkStatus::Ready => "ready",
            ChunkStatus::Uploading => "uploading",
            ChunkStatus::Success => "success",
            ChunkStatus::Error => "error",
        }
    }
}

/// 文件的一个分片，字节范围为 `[start, end)`
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkInfo {
    pub index: u32,
    pub start: u64,
    pub end: u64,
    /// 分片标识，格式为 `文件名-序号`，不是内容摘要
    pub hash: String,
    /// 上传进度百分比
    pub progress: u8,
    pub status: ChunkStatus,
}

impl ChunkInfo {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }
}

/// 按字节数切分文件，最后一片取余数；空文件得到零个分片
pub fn split_chunks(file_name: &str, file_size: u64, chunk_size: u64) -> Result<Vec<ChunkInfo>> {
    if chunk_size == 0 {
        bail!("分片大小必须大于 0");
    }
    let count = file_size.div_ceil(chunk_size);
    if count > u64::from(u32::MAX) {
        bail!("分片数量过多: {}", count);
    }

    let chunks = (0..count)
        .map(|i| {
            let start = i * chunk_size;
            let end = (start + chunk_size).min(file_size);
            ChunkInfo {
                index: i as u32,
                start,
                end,
                hash: format!("{}-{}", file_name, i),
                progress: 0,
                status: ChunkStatus::Ready,
            }
        })
        .collect();
    Ok(chunks)
}

/// 以 MB 为单位的分片大小切分
pub fn split_file(file_name: &str, file_size: u64, chunk_size_mb: f64) -> Result<Vec<ChunkInfo>> {
    if !(chunk_size_mb > 0.0) {
        bail!("分片大小必须大于 0，当前为 {} MB", chunk_size_mb);
    }
    split_chunks(file_name, file_size, (chunk_size_mb * MB) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_MB: u64 = 1024 * 1024;

    fn assert_partition(chunks: &[ChunkInfo], file_size: u64) {
        let mut expected_start = 0;
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index as usize, i);
            assert_eq!(chunk.start, expected_start);
            assert!(chunk.end > chunk.start);
            expected_start = chunk.end;
        }
        assert_eq!(expected_start, file_size);
        assert_eq!(chunks.iter().map(ChunkInfo::len).sum::<u64>(), file_size);
    }

    #[test]
    fn test_two_and_a_half_mb_in_one_mb_chunks() {
        let size = 5 * ONE_MB / 2;
        let chunks = split_file("video.mp4", size, 1.0).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), ONE_MB / 2);
        assert_partition(&chunks, size);
    }

    #[test]
    fn test_chunk_count_is_ceiling() {
        for (size, chunk_mb) in [
            (1u64, 1.0),
            (ONE_MB, 1.0),
            (ONE_MB + 1, 1.0),
            (10 * ONE_MB, 3.0),
            (123_456_789, 5.0),
            (7 * ONE_MB, 0.5),
        ] {
            let chunk_bytes = (chunk_mb * MB) as u64;
            let chunks = split_file("f", size, chunk_mb).unwrap();
            assert_eq!(chunks.len() as u64, size.div_ceil(chunk_bytes));
            assert_partition(&chunks, size);
        }
    }

    #[test]
    fn test_initial_state_and_hash() {
        let chunks = split_chunks("报告.pdf", 10, 4).unwrap();
        assert_eq!(chunks.len(), 3);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.status, ChunkStatus::Ready);
            assert_eq!(chunk.progress, 0);
            assert_eq!(chunk.hash, format!("报告.pdf-{}", i));
        }
        assert_eq!((chunks[2].start, chunks[2].end), (8, 10));
    }

    #[test]
    fn test_empty_file_has_no_chunks() {
        assert!(split_file("empty", 0, 1.0).unwrap().is_empty());
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        assert!(split_chunks("f", 10, 0).is_err());
        assert!(split_file("f", 10, 0.0).is_err());
        assert!(split_file("f", 10, -1.0).is_err());
    }
}
