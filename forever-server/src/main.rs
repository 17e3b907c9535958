mod cache;
mod handlers;
mod middleware;
mod router;
mod server;
mod store;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use forever_core::{Logger, RunMode, Settings, infof, logger};

use crate::{cache::RedisCache, handlers::AppState, store::KvUserStore};

/// 所有键的公共前缀
const KEY_PREFIX: &str = "forever";

#[derive(Parser)]
#[command(name = "server", about = "Forever backend server", version)]
struct Cli {
    /// 运行模式，决定读取哪个配置文件 (debug, test, release)
    #[arg(short, long, env = "FOREVER_MODE", default_value = "debug")]
    mode: RunMode,

    /// 配置文件目录
    #[arg(short, long, env = "FOREVER_CONFIG_DIR", default_value = "config")]
    config_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 读取配置，失败直接退出
    let settings = Settings::load(cli.mode, &cli.config_dir)
        .with_context(|| format!("failed to load {} settings", cli.mode))?;

    // 初始化日志
    let guard = logger::init_logging(&settings.logger)?;
    let log = Logger::new(Arc::new(logger::RouteTable::new())).with_guard(guard);
    infof!(log, "running in {} mode", cli.mode);

    // 初始化 redis（注册锁）与 pika（用户数据）
    let redis = RedisCache::new("redis", &settings.redis, KEY_PREFIX)?;
    let pika = RedisCache::new("pika", &settings.pika, KEY_PREFIX)?;

    let state = AppState::new(log, Arc::new(KvUserStore::new(redis, pika)));
    let app = router::routers(state);

    server::start_server(app, settings.server.port).await
}
