//! 日志输出端：按级别区间路由到控制台或拆分的文件

use std::{io, path::PathBuf};

use tracing::{Level, Metadata};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    filter::filter_fn,
    fmt::{self, MakeWriter, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use super::{LogLevel, RotationPolicy};
use crate::{Error, Result, config::LoggerSettings};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 本服务自己的日志 target，依赖库只输出 info 及以上
const APP_TARGETS: [&str; 3] = ["forever_core", "forever_server", "server"];

/// 输出端接受的级别区间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelBand {
    /// 只接受 debug
    DebugOnly,
    /// 接受 info 及以上
    InfoAndAbove,
    /// 只接受 warn，且要求 warn 不低于配置的最低级别
    WarnAtThreshold(LogLevel),
    /// 接受不低于给定级别的全部记录（控制台）
    AtLeast(LogLevel),
}

impl LevelBand {
    pub fn accepts(&self, level: LogLevel) -> bool {
        match *self {
            Self::DebugOnly => level == LogLevel::Debug,
            Self::InfoAndAbove => level >= LogLevel::Info,
            Self::WarnAtThreshold(min) => level == LogLevel::Warn && level >= min,
            Self::AtLeast(min) => level >= min,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkTarget {
    Stdout,
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sink {
    pub target: SinkTarget,
    pub band: LevelBand,
}

/// 级别 → 输出端 的路由表
#[derive(Debug, Clone)]
pub struct SinkPlan {
    pub sinks: Vec<Sink>,
    pub pretty: bool,
    pub color: bool,
    pub rotation: RotationPolicy,
}

impl SinkPlan {
    pub fn from_settings(settings: &LoggerSettings) -> Self {
        let level = LogLevel::parse(&settings.level);

        let sinks = if settings.to_file {
            vec![
                Sink {
                    target: SinkTarget::File(log_file(&settings.debug_log_path)),
                    band: LevelBand::DebugOnly,
                },
                Sink {
                    target: SinkTarget::File(log_file(&settings.info_log_path)),
                    band: LevelBand::InfoAndAbove,
                },
                Sink {
                    target: SinkTarget::File(log_file(&settings.error_log_path)),
                    band: LevelBand::WarnAtThreshold(level),
                },
            ]
        } else {
            vec![Sink {
                target: SinkTarget::Stdout,
                band: LevelBand::AtLeast(level),
            }]
        };

        Self {
            sinks,
            pretty: settings.pretty,
            color: settings.color,
            rotation: RotationPolicy::from_settings(settings),
        }
    }

    /// 给定级别的记录会写入的输出端
    pub fn route(&self, level: LogLevel) -> impl Iterator<Item = &Sink> {
        self.sinks.iter().filter(move |sink| sink.band.accepts(level))
    }

    pub(super) fn build_layers(
        &self,
    ) -> Result<(Vec<Box<dyn Layer<Registry> + Send + Sync>>, Vec<WorkerGuard>)> {
        let mut layers = Vec::with_capacity(self.sinks.len());
        let mut guards = Vec::new();

        for sink in &self.sinks {
            let band = sink.band;
            let by_band = filter_fn(move |meta| sink_accepts(band, meta));

            let layer = match &sink.target {
                SinkTarget::Stdout => {
                    let layer = fmt_layer(io::stdout, self.pretty, self.color);
                    // RUST_LOG 优先于配置的级别
                    match EnvFilter::try_from_default_env() {
                        Ok(env_filter) => layer.with_filter(env_filter).boxed(),
                        Err(_) => layer.with_filter(by_band).boxed(),
                    }
                }
                SinkTarget::File(path) => {
                    let file = self.rotation.open(path)?;
                    let (writer, guard) = tracing_appender::non_blocking(file);
                    guards.push(guard);
                    fmt_layer(writer, self.pretty, false)
                        .with_filter(by_band)
                        .boxed()
                }
            };
            layers.push(layer);
        }

        Ok((layers, guards))
    }
}

/// 持有非阻塞写入器的后台线程，释放时刷新剩余日志
#[derive(Debug)]
pub struct LogGuard {
    _workers: Vec<WorkerGuard>,
}

/// 按配置安装全局 tracing subscriber
pub fn init_logging(settings: &LoggerSettings) -> Result<LogGuard> {
    let plan = SinkPlan::from_settings(settings);
    let (layers, workers) = plan.build_layers()?;

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| Error::Internal(format!("Failed to install logger: {}", e)))?;

    Ok(LogGuard { _workers: workers })
}

/// trace 一律丢弃；debug 只保留本服务的记录
pub(super) fn sink_accepts(band: LevelBand, meta: &Metadata<'_>) -> bool {
    let level = *meta.level();
    if level == Level::TRACE || (level == Level::DEBUG && !is_app_target(meta.target())) {
        return false;
    }
    band.accepts(LogLevel::from(level))
}

fn is_app_target(target: &str) -> bool {
    APP_TARGETS.iter().any(|app| {
        target
            .strip_prefix(app)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
    })
}

fn log_file(base: &str) -> PathBuf {
    PathBuf::from(format!("{}.log", base))
}

fn fmt_layer<W>(writer: W, pretty: bool, ansi: bool) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()));

    if pretty {
        layer.pretty().boxed()
    } else {
        layer.boxed()
    }
}
