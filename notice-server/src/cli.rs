use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::config;

/// Notice Server - принимает JSON-команды (ping, notice, time, get_lesson)
/// по request/reply сокету и отвечает статусом.
#[derive(Parser, Debug, Clone)]
#[command(name = "notice-server", version, about)]
pub(crate) struct Args {
    /// Адрес reply-сокета, например 0.0.0.0:5555
    #[arg(long, default_value = config::REP_BIND_ADDR)]
    pub(crate) bind: SocketAddr,

    /// Расписание уроков для get_lesson: `HH:MM-HH:MM Название` на строку,
    /// поддержка # комментариев. Без флага - встроенное расписание
    #[arg(long)]
    pub(crate) lessons_file: Option<PathBuf>,

    /// Смещение местного времени от UTC в минутах (для time и get_lesson)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub(crate) utc_offset_minutes: i32,

    /// Период опроса сокета и флага остановки, мс
    #[arg(
        long,
        default_value_t = config::POLL_TICK_MS,
        value_parser = clap::value_parser!(u64).range(1..=10_000)
    )]
    pub(crate) poll_ms: u64,
}
