//! Точка входа `notice-server`.
//!
//! Жизненный цикл:
//! - парсинг CLI, загрузка расписания уроков
//! - bind reply-сокета
//! - цикл recv -> dispatch -> send с пересозданием сокета при сбоях транспорта
//! - корректная остановка по `Ctrl+C` / SIGTERM с освобождением сокета

mod cli;
mod config;
mod dispatch;
mod lessons;
mod server;

use std::sync::{Arc, atomic::AtomicBool, atomic::Ordering};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::info;
use notice_core::ReplySocket;

use crate::dispatch::{Dispatcher, LogNotifier, SystemClock};

fn main() -> anyhow::Result<()> {
    // Логи через RUST_LOG, по умолчанию info
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let shutdown = Arc::new(AtomicBool::new(false));

    // Ctrl+C / SIGTERM => ставим shutdown=true
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            shutdown.store(true, Ordering::Relaxed);
            info!("shutting down...");
        })?;
    }

    let args = cli::Args::parse();

    let schedule = config::load_schedule(args.lessons_file.as_deref())
        .with_context(|| format!("load lessons from {:?}", args.lessons_file))?;
    let offset = config::utc_offset(args.utc_offset_minutes)?;

    info!(
        "Starting notice-server: bind={}, lessons={}, utc_offset={}",
        args.bind,
        schedule.len(),
        offset
    );

    let dispatcher = Dispatcher::new(
        Box::new(LogNotifier),
        Box::new(SystemClock::new(offset)),
        schedule,
    );

    let socket = ReplySocket::bind(args.bind)
        .with_context(|| format!("bind reply socket {}", args.bind))?;

    server::run_server(
        socket,
        &dispatcher,
        Duration::from_millis(args.poll_ms),
        shutdown,
    );

    Ok(())
}
