//! Точка входа `notice-client`.
//!
//! Жизненный цикл:
//! - парсинг CLI и резолвинг адреса сервера
//! - один запрос (или демо-серия) через [`client::NoticeClient`]
//! - печать ответа как JSON; код выхода 1, если ответа не получили

mod cli;
mod client;

use anyhow::{Context, anyhow};
use clap::Parser;
use log::{info, warn};
use notice_core::{PROTOCOL_VERSION, Request, Response};
use serde_json::json;

use crate::cli::Cmd;
use crate::client::NoticeClient;

fn main() -> anyhow::Result<()> {
    // Логи через RUST_LOG, по умолчанию info
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = cli::Args::parse();
    let addr = args
        .server_socket_addr()
        .with_context(|| format!("resolve server address {}", args.server))?;

    info!(
        "Starting notice-client: server={}, timeout={}ms",
        addr, args.timeout_ms
    );

    let mut client = NoticeClient::new(addr, args.timeout());

    let response = match &args.command {
        Cmd::Demo => return run_demo(&mut client),
        Cmd::Raw { json } => {
            let value: serde_json::Value =
                serde_json::from_str(json).context("raw request is not valid JSON")?;
            client.send_request(&value)
        }
        Cmd::Ping => client.send_request(&Request::new("ping")),
        Cmd::Time => client.send_request(&Request::new("time")),
        Cmd::GetLesson => client.send_request(&Request::new("get_lesson")),
        Cmd::Notice { tokens } => {
            client.send_request(&Request::with_args("notice", tokens.clone()))
        }
    };

    let response = response.map_err(|f| anyhow!("request failed: {f}"))?;
    print_response(&response)
}

fn print_response(response: &Response) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(())
}

/// Серия запросов, показывающая все ветки диспетчера.
/// Сбой одного запроса не прерывает серию.
fn run_demo(client: &mut NoticeClient) -> anyhow::Result<()> {
    let steps = [
        ("ping", serde_json::to_value(Request::new("ping"))?),
        ("unknown command", serde_json::to_value(Request::new("nonexistent"))?),
        (
            "request without command",
            json!({ "version": PROTOCOL_VERSION, "message": "Test without command" }),
        ),
        (
            "notice",
            serde_json::to_value(Request::with_args(
                "notice",
                vec![
                    "Break time".to_string(),
                    "--context=Demo".to_string(),
                    "--allow-break=false".to_string(),
                    "--mask-duration=2.5".to_string(),
                ],
            ))?,
        ),
        (
            "notice without title",
            serde_json::to_value(Request::with_args(
                "notice",
                vec!["--context=oops".to_string()],
            ))?,
        ),
        ("time", serde_json::to_value(Request::new("time"))?),
        ("get_lesson", serde_json::to_value(Request::new("get_lesson"))?),
    ];

    for (name, payload) in &steps {
        println!("--- {name}");
        match client.send_request(payload) {
            Ok(response) => print_response(&response)?,
            Err(f) => {
                warn!("demo step {name:?} failed: {f}");
                println!("request failed: {f}");
            }
        }
    }

    Ok(())
}
