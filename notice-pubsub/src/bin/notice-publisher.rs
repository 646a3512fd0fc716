//! Точка входа `notice-publisher`: ждёт подписчиков, публикует серию
//! сообщений с интервалом и выходит.

use std::net::SocketAddr;
use std::sync::{Arc, atomic::AtomicBool, atomic::Ordering};
use std::time::Duration;

use clap::Parser;
use log::{debug, info};
use notice_pubsub::{Publisher, sleep_unless};

/// Notice Publisher - рассылает текстовые сообщения всем подписчикам
#[derive(Parser, Debug)]
#[command(name = "notice-publisher", version, about)]
struct Args {
    /// Адрес для приёма подписчиков
    #[arg(long, default_value = "0.0.0.0:5556")]
    bind: SocketAddr,

    /// Сколько сообщений опубликовать
    #[arg(long, default_value_t = 10)]
    count: u32,

    /// Пауза между сообщениями, мс
    #[arg(long, default_value_t = 2000)]
    interval_ms: u64,

    /// Сколько ждать подписчиков перед первой публикацией, мс
    #[arg(long, default_value_t = 1000)]
    warmup_ms: u64,

    /// Текст сообщения; публикуется как `Message <i>: <text>`
    #[arg(long, default_value = "Hello from publisher!")]
    message: String,
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
    let publisher = Publisher::bind(args.bind)?;
    info!(
        "Publisher started on {}, ready to publish messages...",
        publisher.local_addr()
    );

    // ждём подписчиков
    sleep_unless(&shutdown, Duration::from_millis(args.warmup_ms));

    for i in 1..=args.count {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }

        let text = format!("Message {i}: {}", args.message);
        let stats = publisher.publish(&text);
        info!("Published: {text}");
        if stats.not_empty() {
            debug!("broadcast {stats}");
        }

        if i < args.count {
            sleep_unless(&shutdown, Duration::from_millis(args.interval_ms));
        }
    }

    info!("Publisher finished, closing...");
    drop(publisher);
    Ok(())
}
