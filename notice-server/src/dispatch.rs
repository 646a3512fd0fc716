use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use log::{error, info};
use notice_core::envelope::{self, Request, Response, Status};
use notice_core::{NoticeParams, PROTOCOL_VERSION};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

use crate::lessons::{LessonSchedule, LessonStatus, hhmm};

pub(crate) const MSG_OK: &str = "OK";
pub(crate) const MSG_MISSING_COMMAND: &str = "Missing or invalid 'command' parameter";
pub(crate) const MSG_MISSING_VERSION: &str = "Missing or invalid 'version' parameter";
pub(crate) const MSG_MISSING_TITLE: &str = "Missing required parameter 'title'";
pub(crate) const MSG_NOTICE_SENT: &str = "Notice sent successfully";
pub(crate) const MSG_NOT_FOUND: &str = "Command not found";
pub(crate) const MSG_INTERNAL: &str = "Internal server error";

/// Непредвиденный сбой при выполнении команды (-> 500)
#[derive(Debug, Error)]
pub(crate) enum DispatchError {
    #[error("notice delivery failed: {0}")]
    Notify(String),

    #[error("failed to format current time")]
    Clock(#[from] time::error::Format),
}

/// Доставка уведомления пользователю
pub(crate) trait Notifier: Send {
    fn deliver(&self, notice: &NoticeParams) -> anyhow::Result<()>;
}

/// Пишет уведомление в лог
pub(crate) struct LogNotifier;

impl Notifier for LogNotifier {
    fn deliver(&self, notice: &NoticeParams) -> anyhow::Result<()> {
        info!(
            "NOTICE {:?} context={:?} allow_break={} mask={}s overlay={}s",
            notice.title,
            notice.context,
            notice.allow_break,
            notice.mask_duration,
            notice.overlay_duration
        );
        Ok(())
    }
}

/// Источник текущего времени для `time` / `get_lesson`
pub(crate) trait Clock: Send {
    fn now(&self) -> OffsetDateTime;
}

pub(crate) struct SystemClock {
    offset: UtcOffset,
}

impl SystemClock {
    pub(crate) fn new(offset: UtcOffset) -> Self {
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.offset)
    }
}

/// Таблица команд. Сам по себе в сокет не ходит.
pub(crate) struct Dispatcher {
    notifier: Box<dyn Notifier>,
    clock: Box<dyn Clock>,
    schedule: LessonSchedule,
}

impl Dispatcher {
    pub(crate) fn new(
        notifier: Box<dyn Notifier>,
        clock: Box<dyn Clock>,
        schedule: LessonSchedule,
    ) -> Self {
        Self {
            notifier,
            clock,
            schedule,
        }
    }

    pub(crate) fn dispatch(&self, req: &Request) -> Result<Response, DispatchError> {
        let Some(command) = req.command.as_deref() else {
            return Ok(Response::new(Status::BadRequest, MSG_MISSING_COMMAND));
        };

        match req.version {
            Some(PROTOCOL_VERSION) => {}
            Some(v) => {
                return Ok(Response::new(
                    Status::BadRequest,
                    format!("Unsupported protocol version {v}, expected {PROTOCOL_VERSION}"),
                ));
            }
            None => return Ok(Response::new(Status::BadRequest, MSG_MISSING_VERSION)),
        }

        match command {
            "ping" => Ok(Response::new(Status::Ok, MSG_OK)),
            "notice" => self.notice(req.args()),
            "time" => self.time(),
            "get_lesson" => Ok(self.lesson()),
            _ => Ok(Response::new(Status::NotFound, MSG_NOT_FOUND)),
        }
    }

    /// Сырые байты запроса -> ответ. Всегда что-то отвечает:
    /// битый JSON -> 400, сбой или паника внутри команды -> 500.
    pub(crate) fn handle_payload(&self, payload: &[u8]) -> Response {
        let req: Request = match envelope::decode(payload) {
            Ok(r) => r,
            Err(e) => {
                info!("rejecting undecodable request: {e}");
                return Response::new(Status::BadRequest, format!("Invalid request: {e}"));
            }
        };

        match panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(&req))) {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                error!("command {:?} failed: {e}", req.command);
                Response::new(Status::InternalError, MSG_INTERNAL)
            }
            Err(panic) => {
                error!(
                    "command {:?} panicked: {}",
                    req.command,
                    panic_message(panic.as_ref())
                );
                Response::new(Status::InternalError, MSG_INTERNAL)
            }
        }
    }

    fn notice(&self, args: &[String]) -> Result<Response, DispatchError> {
        let params = NoticeParams::parse(args);
        if params.title.is_empty() {
            return Ok(Response::new(Status::BadRequest, MSG_MISSING_TITLE));
        }

        self.notifier
            .deliver(&params)
            .map_err(|e| DispatchError::Notify(format!("{e:#}")))?;

        let status = if params.allow_break {
            Status::Ok
        } else {
            Status::Accepted
        };
        Ok(Response::new(status, MSG_NOTICE_SENT))
    }

    fn time(&self) -> Result<Response, DispatchError> {
        let now = self.clock.now().format(&Rfc3339)?;
        Ok(Response::new(Status::Ok, now))
    }

    fn lesson(&self) -> Response {
        let now = self.clock.now().time();
        let msg = match self.schedule.at(now) {
            LessonStatus::InProgress(l) => format!("Current lesson: {} ({})", l.name, l.span()),
            LessonStatus::Next(l) => {
                format!("No lesson in progress, next: {} at {}", l.name, hhmm(l.start))
            }
            LessonStatus::Over => "No more lessons today".to_string(),
        };
        Response::new(Status::Ok, msg)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

/// Подставные коллабораторы для тестов
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;
    use time::macros::datetime;

    pub(crate) struct FixedClock(pub(crate) OffsetDateTime);

    impl Clock for FixedClock {
        fn now(&self) -> OffsetDateTime {
            self.0
        }
    }

    /// Запоминает доставленные уведомления
    #[derive(Clone, Default)]
    pub(crate) struct RecordingNotifier(pub(crate) Arc<Mutex<Vec<NoticeParams>>>);

    impl Notifier for RecordingNotifier {
        fn deliver(&self, notice: &NoticeParams) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(notice.clone());
            Ok(())
        }
    }

    pub(crate) struct FailingNotifier;

    impl Notifier for FailingNotifier {
        fn deliver(&self, _notice: &NoticeParams) -> anyhow::Result<()> {
            anyhow::bail!("display is gone")
        }
    }

    pub(crate) struct PanickingNotifier;

    impl Notifier for PanickingNotifier {
        fn deliver(&self, _notice: &NoticeParams) -> anyhow::Result<()> {
            panic!("notifier exploded")
        }
    }

    /// Доставляет, но долго: имитирует занятый сервер
    pub(crate) struct SlowNotifier(pub(crate) Duration);

    impl Notifier for SlowNotifier {
        fn deliver(&self, _notice: &NoticeParams) -> anyhow::Result<()> {
            thread::sleep(self.0);
            Ok(())
        }
    }

    pub(crate) const NOW: OffsetDateTime = datetime!(2024-09-02 08:30:00 UTC);

    pub(crate) fn schedule() -> LessonSchedule {
        LessonSchedule::read(Cursor::new(
            "08:00-08:45 Mathematics\n08:55-09:40 Literature\n",
        ))
        .unwrap()
    }

    pub(crate) fn dispatcher_with(notifier: impl Notifier + 'static) -> Dispatcher {
        Dispatcher::new(Box::new(notifier), Box::new(FixedClock(NOW)), schedule())
    }

    pub(crate) fn dispatcher() -> Dispatcher {
        dispatcher_with(RecordingNotifier::default())
    }
}
