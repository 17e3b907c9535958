//! 请求关联日志
//!
//! 每次调用都会附加当前请求的路由名与直接调用者的 `文件:行号`，
//! 再按级别分发到 [`sink`] 中配置的输出。
//!
//! ```rust
//! use std::sync::Arc;
//! use forever_core::logger::{ExecutionId, Logger, RouteTable};
//!
//! let routes = Arc::new(RouteTable::new());
//! let log = Logger::new(routes.clone());
//!
//! let id = ExecutionId::next();
//! let _guard = routes.enter(id, "UserRegister");
//! id.sync_scope(|| forever_core::infof!(log, "processing {}", "input"));
//! ```

pub mod context;
pub mod rotate;
pub mod sink;


use std::{
    ffi::OsStr,
    fmt,
    panic::Location,
    path::Path,
    sync::{Arc, Mutex},
};

pub use context::{ExecutionId, RequestContext, RouteGuard, RouteTable};
pub use rotate::{RotatingFile, RotationPolicy};
pub use sink::{LevelBand, LogGuard, Sink, SinkPlan, SinkTarget, init_logging};

/// 日志级别，按严重程度递增排序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    /// 解析配置中的级别，无法识别时使用 info
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" | "trace" => Self::Debug,
            "warn" | "warning" => Self::Warn,
            "error" => Self::Error,
            "fatal" | "panic" | "dpanic" => Self::Fatal,
            _ => Self::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }
}

impl From<tracing::Level> for LogLevel {
    fn from(level: tracing::Level) -> Self {
        if level == tracing::Level::ERROR {
            Self::Error
        } else if level == tracing::Level::WARN {
            Self::Warn
        } else if level == tracing::Level::INFO {
            Self::Info
        } else {
            Self::Debug
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 调用者位置（文件名 + 行号）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub file: String,
    pub line: u32,
}

impl Caller {
    /// 取文件路径的最后一段；取不到时记录内部错误并返回空位置
    pub fn resolve(file: &str, line: u32) -> Self {
        match Path::new(file).file_name().and_then(OsStr::to_str) {
            Some(name) => Self {
                file: name.to_string(),
                line,
            },
            None => {
                tracing::error!("get caller info failed: '{}' has no file name", file);
                Self::default()
            }
        }
    }

    fn from_location(location: &Location<'_>) -> Self {
        Self::resolve(location.file(), location.line())
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.file.is_empty() {
            Ok(())
        } else {
            write!(f, "{}:{}", self.file, self.line)
        }
    }
}

/// 一条待输出的日志
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub level: LogLevel,
    pub message: String,
    pub route: String,
    pub caller: Caller,
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, route={}, caller={}",
            self.message, self.route, self.caller
        )
    }
}

impl Record {
    /// 路由名与调用位置同时作为结构化字段输出
    fn emit(&self) {
        let (route, caller) = (self.route.as_str(), &self.caller);
        match self.level {
            LogLevel::Debug => tracing::debug!(route, caller = %caller, "{}", self),
            LogLevel::Info => tracing::info!(route, caller = %caller, "{}", self),
            LogLevel::Warn => tracing::warn!(route, caller = %caller, "{}", self),
            LogLevel::Error => tracing::error!(route, caller = %caller, "{}", self),
            LogLevel::Fatal => {
                tracing::error!(route, caller = %caller, fatal = true, "{}", self)
            }
        }
    }
}

/// 请求关联日志记录器
///
/// 通过路由表按当前执行单元查找路由名；需要显式上下文时用 [`Logger::scoped`]。
#[derive(Debug, Clone, Default)]
pub struct Logger {
    routes: Arc<RouteTable>,
    guard: Arc<Mutex<Option<LogGuard>>>,
}

impl Logger {
    pub fn new(routes: Arc<RouteTable>) -> Self {
        Self {
            routes,
            guard: Arc::default(),
        }
    }

    /// 持有输出端的守卫，fatal 退出前会先刷新
    pub fn with_guard(self, guard: LogGuard) -> Self {
        if let Ok(mut slot) = self.guard.lock() {
            *slot = Some(guard);
        }
        self
    }

    pub fn routes(&self) -> &Arc<RouteTable> {
        &self.routes
    }

    /// 使用显式请求上下文的记录器
    pub fn scoped<'a>(&'a self, ctx: &'a RequestContext) -> ScopedLogger<'a> {
        ScopedLogger { logger: self, ctx }
    }

    /// 构造一条日志但不输出
    #[track_caller]
    pub fn record(&self, level: LogLevel, message: impl fmt::Display) -> Record {
        Record {
            level,
            message: message.to_string(),
            route: self.routes.current_route(),
            caller: Caller::from_location(Location::caller()),
        }
    }

    #[track_caller]
    pub fn log(&self, level: LogLevel, message: impl fmt::Display) {
        self.record(level, message).emit();
    }

    #[track_caller]
    pub fn debug(&self, message: impl fmt::Display) {
        self.log(LogLevel::Debug, message);
    }

    #[track_caller]
    pub fn info(&self, message: impl fmt::Display) {
        self.log(LogLevel::Info, message);
    }

    #[track_caller]
    pub fn warn(&self, message: impl fmt::Display) {
        self.log(LogLevel::Warn, message);
    }

    #[track_caller]
    pub fn error(&self, message: impl fmt::Display) {
        self.log(LogLevel::Error, message);
    }

    /// 输出后以状态码 1 退出进程
    #[track_caller]
    pub fn fatal(&self, message: impl fmt::Display) -> ! {
        self.log(LogLevel::Fatal, message);
        self.exit()
    }

    fn exit(&self) -> ! {
        // 丢弃守卫以刷新非阻塞写入器
        if let Ok(mut slot) = self.guard.lock() {
            slot.take();
        }
        std::process::exit(1)
    }
}

/// 绑定了 [`RequestContext`] 的记录器，不经过路由表
#[derive(Debug, Clone, Copy)]
pub struct ScopedLogger<'a> {
    logger: &'a Logger,
    ctx: &'a RequestContext,
}

impl ScopedLogger<'_> {
    #[track_caller]
    pub fn record(&self, level: LogLevel, message: impl fmt::Display) -> Record {
        Record {
            level,
            message: message.to_string(),
            route: self.ctx.route.to_string(),
            caller: Caller::from_location(Location::caller()),
        }
    }

    #[track_caller]
    pub fn log(&self, level: LogLevel, message: impl fmt::Display) {
        self.record(level, message).emit();
    }

    #[track_caller]
    pub fn debug(&self, message: impl fmt::Display) {
        self.log(LogLevel::Debug, message);
    }

    #[track_caller]
    pub fn info(&self, message: impl fmt::Display) {
        self.log(LogLevel::Info, message);
    }

    #[track_caller]
    pub fn warn(&self, message: impl fmt::Display) {
        self.log(LogLevel::Warn, message);
    }

    #[track_caller]
    pub fn error(&self, message: impl fmt::Display) {
        self.log(LogLevel::Error, message);
    }

    #[track_caller]
    pub fn fatal(&self, message: impl fmt::Display) -> ! {
        self.log(LogLevel::Fatal, message);
        self.logger.exit()
    }
}

/// 格式化输出 debug 日志：`debugf!(log, "processing {}", name)`
#[macro_export]
macro_rules! debugf {
    ($logger:expr, $($arg:tt)+) => {
        $logger.debug(::std::format_args!($($arg)+))
    };
}

/// 格式化输出 info 日志
#[macro_export]
macro_rules! infof {
    ($logger:expr, $($arg:tt)+) => {
        $logger.info(::std::format_args!($($arg)+))
    };
}

/// 格式化输出 warn 日志
#[macro_export]
macro_rules! warnf {
    ($logger:expr, $($arg:tt)+) => {
        $logger.warn(::std::format_args!($($arg)+))
    };
}

/// 格式化输出 error 日志
#[macro_export]
macro_rules! errorf {
    ($logger:expr, $($arg:tt)+) => {
        $logger.error(::std::format_args!($($arg)+))
    };
}

/// 格式化输出 fatal 日志后退出进程
#[macro_export]
macro_rules! fatalf {
    ($logger:expr, $($arg:tt)+) => {
        $logger.fatal(::std::format_args!($($arg)+))
    };
}
