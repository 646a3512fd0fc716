//! Точка входа `notice-subscriber`: печатает всё, что рассылает издатель,
//! пока не остановят по `Ctrl+C` / SIGTERM.

use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::{Arc, atomic::AtomicBool, atomic::Ordering};

use anyhow::Context;
use clap::Parser;
use log::info;
use notice_core::DEFAULT_PUBLISHER_ADDR;
use notice_pubsub::run_subscriber;

/// Notice Subscriber - принимает broadcast-сообщения издателя
#[derive(Parser, Debug)]
#[command(name = "notice-subscriber", version, about)]
struct Args {
    /// Адрес издателя, например 127.0.0.1:5556 или localhost:5556
    #[arg(long, default_value = DEFAULT_PUBLISHER_ADDR)]
    connect: String,
}

fn resolve(addr: &str) -> anyhow::Result<SocketAddr> {
    addr.to_socket_addrs()?
        .next()
        .context("no addresses resolved")
}

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

    let args = Args::parse();
    let addr =
        resolve(&args.connect).with_context(|| format!("resolve publisher {}", args.connect))?;

    info!("Subscriber started, connecting to {addr}");
    // каждое сообщение уже залогировано внутри цикла приёма
    run_subscriber(addr, shutdown, |_, _| {});

    Ok(())
}
