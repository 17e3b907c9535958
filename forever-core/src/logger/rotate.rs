//! 按大小分割的日志文件

use std::{fs, io, path::Path, time::Duration};

use file_rotate::{
    ContentLimit, FileRotate,
    compression::Compression,
    suffix::{AppendTimestamp, DateFrom, FileLimit},
};

use crate::config::LoggerSettings;

const MEGABYTE: u64 = 1024 * 1024;
const DEFAULT_MAX_SIZE_MB: u64 = 100;
/// 旧文件后缀：`<文件名>.<时间>`，同一秒内多次分割再追加 `.N`
const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

/// 写满后分割的日志文件
pub type RotatingFile = FileRotate<AppendTimestamp>;

/// 分割与清理策略
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    /// 单个文件最大字节数
    pub max_size: u64,
    /// 保留旧文件最大个数，0 表示不限
    pub max_backups: usize,
    /// 保留旧文件最长时间，`None` 表示不限
    pub max_age: Option<Duration>,
    /// 是否 gzip 压缩旧文件
    pub compress: bool,
}

impl RotationPolicy {
    pub fn from_settings(settings: &LoggerSettings) -> Self {
        let max_size_mb = if settings.max_size == 0 {
            DEFAULT_MAX_SIZE_MB
        } else {
            settings.max_size
        };

        Self {
            max_size: max_size_mb.saturating_mul(MEGABYTE),
            max_backups: settings.max_backups,
            max_age: (settings.max_age > 0)
                .then(|| Duration::from_secs(settings.max_age.saturating_mul(24 * 3600))),
            compress: settings.compress,
        }
    }

    /// 旧文件清理方式
    ///
    /// 同时配置了个数与时间时按个数清理。
    pub fn file_limit(&self) -> FileLimit {
        match (self.max_backups, self.max_age) {
            (0, Some(age)) => chrono::Duration::from_std(age)
                .map_or(FileLimit::Unlimited, FileLimit::Age),
            (0, None) => FileLimit::Unlimited,
            (max_files, _) => FileLimit::MaxFiles(max_files),
        }
    }

    fn compression(&self) -> Compression {
        if self.compress {
            Compression::OnRotate(0)
        } else {
            Compression::None
        }
    }

    /// 以追加方式打开 `path`，必要时创建父目录
    pub fn open(&self, path: &Path) -> io::Result<RotatingFile> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let max_size = usize::try_from(self.max_size).unwrap_or(usize::MAX);

        Ok(FileRotate::new(
            path,
            AppendTimestamp::with_format(BACKUP_TIME_FORMAT, self.file_limit(), DateFrom::Now),
            ContentLimit::BytesSurpassed(max_size),
            self.compression(),
            #[cfg(unix)]
            None,
        ))
    }
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self::from_settings(&LoggerSettings::default())
    }
}
