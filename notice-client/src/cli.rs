use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use clap::{Parser, Subcommand};
use notice_core::{DEFAULT_SERVER_ADDR, REQUEST_TIMEOUT};

/// Notice Client - отправляет одну JSON-команду notice-server и печатает ответ.
///
/// Один запрос за раз; если ответ не пришёл за --timeout-ms,
/// соединение пересоздаётся, а запрос считается неудавшимся.
#[derive(Parser, Debug, Clone)]
#[command(name = "notice-client", version, about)]
pub(crate) struct Args {
    /// Адрес notice-server, например 127.0.0.1:5555 или host.example.com:5555
    #[arg(long, default_value = DEFAULT_SERVER_ADDR)]
    pub(crate) server: String,

    /// Сколько ждать ответ на запрос, мс
    #[arg(
        long,
        default_value_t = REQUEST_TIMEOUT.as_millis() as u64,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub(crate) timeout_ms: u64,

    #[command(subcommand)]
    pub(crate) command: Cmd,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum Cmd {
    /// Проверка связи
    Ping,

    /// Текущее время на сервере
    Time,

    /// Текущий или следующий урок
    GetLesson,

    /// Уведомление: <title> [--context=..] [--allow-break=..]
    /// [--mask-duration=..] [--overlay-duration=..]
    Notice {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        tokens: Vec<String>,
    },

    /// Отправить произвольный JSON как есть
    Raw { json: String },

    /// Прогнать демонстрационную серию запросов
    Demo,
}

impl Args {
    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub(crate) fn server_socket_addr(&self) -> std::io::Result<SocketAddr> {
        // Берём первый результат резолвинга
        self.server.to_socket_addrs()?.next().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses resolved")
        })
    }
}
