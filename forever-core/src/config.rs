//! 服务配置
//!
//! 按运行模式（debug / test / release）选择对应的 YAML 文件，解析后填充
//! `server`、`database`、`redis`、`pika`、`logger` 五个配置段。缺失的键取零值，
//! 不做任何校验；读取失败由调用方决定是否终止进程。

use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use serde::Deserialize;

use crate::{Error, Result};

/// 运行模式，决定读取哪个配置文件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// 本地开发
    #[default]
    Debug,
    /// 测试
    Test,
    /// 线上必须使用 release
    Release,
}

impl RunMode {
    pub const ALL: [RunMode; 3] = [RunMode::Debug, RunMode::Test, RunMode::Release];

    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Debug => "debug",
            RunMode::Test => "test",
            RunMode::Release => "release",
        }
    }

    /// 该模式对应的配置文件路径：`<dir>/<mode>.yaml`
    pub fn config_path(&self, dir: impl AsRef<Path>) -> PathBuf {
        dir.as_ref().join(format!("{}.yaml", self.as_str()))
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(RunMode::Debug),
            "test" => Ok(RunMode::Test),
            "release" => Ok(RunMode::Release),
            other => Err(format!(
                "unknown run mode '{}', expected one of debug, test, release",
                other
            )),
        }
    }
}

/// server 基服务本配置结构
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub port: u16,
    #[serde(with = "duration", alias = "readTimeout", alias = "readtimeout")]
    pub read_timeout: Duration,
    #[serde(with = "duration", alias = "writeTimeout", alias = "writetimeout")]
    pub write_timeout: Duration,
    #[serde(alias = "jwtSecret", alias = "jwtsecret")]
    pub jwt_secret: String,
    #[serde(alias = "jwtExpire", alias = "jwtexpire")]
    pub jwt_expire: i64,
    #[serde(alias = "PrefixUrl", alias = "prefixUrl", alias = "prefixurl")]
    pub prefix_url: String,
    #[serde(alias = "staticRootPath", alias = "staticrootpath")]
    pub static_root_path: String,
    #[serde(alias = "uploadImagePath", alias = "uploadimagepath")]
    pub upload_image_path: String,
    #[serde(alias = "imageFormats", alias = "imageformats")]
    pub image_formats: Vec<String>,
    #[serde(alias = "uploadLimit", alias = "uploadlimit")]
    pub upload_limit: f64,
}

/// database 数据库配置结构
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    #[serde(alias = "dbType", alias = "dbtype")]
    pub db_type: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    #[serde(alias = "dbName", alias = "dbname")]
    pub db_name: String,
    #[serde(alias = "tablePrefix", alias = "tableprefix")]
    pub table_prefix: String,
    pub debug: bool,
}

/// redis / pika 配置结构，两者协议相同
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    pub password: String,
    pub db: i64,
    #[serde(alias = "maxIdle", alias = "maxidle")]
    pub max_idle: u32,
    #[serde(alias = "maxActive", alias = "maxactive")]
    pub max_active: u32,
    #[serde(with = "duration", alias = "idleTimeout", alias = "idletimeout")]
    pub idle_timeout: Duration,
}

impl RedisSettings {
    /// 生成 `redis://` 连接地址
    ///
    /// `host` 已包含端口（`127.0.0.1:6379`）时直接使用，否则拼接 `port`。
    pub fn url(&self) -> String {
        let host = if self.host.is_empty() {
            "127.0.0.1"
        } else {
            self.host.as_str()
        };
        let addr = if host.contains(':') || self.port == 0 {
            host.to_string()
        } else {
            format!("{}:{}", host, self.port)
        };

        if self.password.is_empty() {
            format!("redis://{}/{}", addr, self.db)
        } else {
            format!("redis://:{}@{}/{}", self.password, addr, self.db)
        }
    }
}

/// logger 配置结构
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggerSettings {
    pub level: String,
    pub pretty: bool,
    pub color: bool,
    /// 为 true 时按级别拆分写入三个文件，否则输出到控制台
    #[serde(alias = "console")]
    pub to_file: bool,
    #[serde(alias = "debugLogPath", alias = "debuglogpath")]
    pub debug_log_path: String,
    #[serde(alias = "infoLogPath", alias = "infologpath")]
    pub info_log_path: String,
    #[serde(alias = "errorLogPath", alias = "errorlogpath")]
    pub error_log_path: String,
    /// 日志文件最大大小（MB）
    pub max_size: u64,
    /// 保留旧文件最大个数
    pub max_backups: usize,
    /// 保留旧文件最大天数
    pub max_age: u64,
    /// 是否压缩、归档旧文件
    pub compress: bool,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: String::new(),
            pretty: false,
            color: false,
            to_file: false,
            debug_log_path: String::new(),
            info_log_path: String::new(),
            error_log_path: String::new(),
            max_size: 100,
            max_backups: 10,
            max_age: 1,
            compress: false,
        }
    }
}

/// 全部配置段
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub redis: RedisSettings,
    pub pika: RedisSettings,
    pub logger: LoggerSettings,
}

impl Settings {
    /// 读取 `<dir>/<mode>.yaml` 并解析
    pub fn load(mode: RunMode, dir: impl AsRef<Path>) -> Result<Self> {
        let path = mode.config_path(dir);
        let content = std::fs::read_to_string(&path).map_err(|source| Error::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;

        tracing::debug!("读取配置文件: {}", path.display());
        Self::from_yaml_str(&content)
    }

    /// 解析 YAML 文本
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Yaml))
            .build()?
            .try_deserialize::<Settings>()?;

        Ok(settings)
    }
}

/// 时长字段：整数表示秒，字符串支持 `ms`/`s`/`m`/`h` 后缀
mod duration {
    use std::{fmt, time::Duration};

    use serde::{Deserializer, de};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(DurationVisitor)
    }

    struct DurationVisitor;

    impl de::Visitor<'_> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("seconds as an integer, or a string like \"500ms\", \"60s\", \"5m\", \"1h\"")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Duration, E> {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Duration, E> {
            u64::try_from(v)
                .map(Duration::from_secs)
                .map_err(|_| E::custom(format!("negative duration: {}", v)))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Duration, E> {
            Duration::try_from_secs_f64(v).map_err(E::custom)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
            parse(v).ok_or_else(|| E::custom(format!("invalid duration: '{}'", v)))
        }

        fn visit_unit<E: de::Error>(self) -> Result<Duration, E> {
            Ok(Duration::ZERO)
        }
    }

    pub(super) fn parse(text: &str) -> Option<Duration> {
        let text = text.trim();
        if text.is_empty() {
            return Some(Duration::ZERO);
        }

        let split = text
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(text.len());
        let (number, unit) = text.split_at(split);
        let number: u64 = number.parse().ok()?;

        match unit.trim() {
            "" | "s" => Some(Duration::from_secs(number)),
            "ms" => Some(Duration::from_millis(number)),
            "m" => number.checked_mul(60).map(Duration::from_secs),
            "h" => number.checked_mul(3600).map(Duration::from_secs),
            _ => None,
        }
    }
}
