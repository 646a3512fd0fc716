use std::io::Cursor;
use std::path::Path;

use anyhow::Context;
use time::UtcOffset;

use crate::lessons::{LessonSchedule, LessonsError};

const DEFAULT_LESSONS: &str = include_str!("../assets/lessons.txt");

pub(crate) const REP_BIND_ADDR: &str = "0.0.0.0:5555";

/// Как часто цикл сервера проверяет флаг остановки, пока ждёт запрос
pub(crate) const POLL_TICK_MS: u64 = 200;

pub(crate) fn load_schedule(path: Option<&Path>) -> Result<LessonSchedule, LessonsError> {
    match path {
        Some(p) => LessonSchedule::read_from_path(p),
        None => LessonSchedule::read(Cursor::new(DEFAULT_LESSONS)),
    }
}

pub(crate) fn utc_offset(minutes: i32) -> anyhow::Result<UtcOffset> {
    let seconds = minutes
        .checked_mul(60)
        .with_context(|| format!("utc offset out of range: {minutes} minutes"))?;
    UtcOffset::from_whole_seconds(seconds)
        .with_context(|| format!("utc offset out of range: {minutes} minutes"))
}
