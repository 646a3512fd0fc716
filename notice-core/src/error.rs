use std::io;

use thiserror::Error;

/// Ошибки сериализации конверта
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Не удалось сериализовать значение
    #[error("{0}")]
    Encode(#[source] serde_json::Error),

    /// Не удалось разобрать входные байты
    #[error("{0}")]
    Decode(#[source] serde_json::Error),
}

/// Ошибки фрейминга
#[derive(Debug, Error)]
pub enum FrameError {
    /// Заявленная длина больше допустимой
    #[error("frame too large: {len} bytes (max {max})")]
    TooLarge {
        /// Длина из заголовка
        len: usize,
        /// Допустимый максимум
        max: usize,
    },
}

/// Ошибки сокета. После любой из них сессия в неизвестном состоянии:
/// сбой соединения лечится сбросом собеседника, сбой listener'а - bind заново.
#[derive(Debug, Error)]
pub enum SocketError {
    /// Ошибка ввода-вывода
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Ответ не пришёл до дедлайна
    #[error("timed out waiting for reply")]
    Timeout,

    /// Нарушено чередование recv/send
    #[error("cannot {op} while {state}")]
    State {
        /// Операция, которую пытались выполнить
        op: &'static str,
        /// Состояние сокета в этот момент
        state: &'static str,
    },

    /// Собеседник закрыл соединение посреди обмена
    #[error("peer closed connection")]
    Closed,

    /// Сокет не привязан (после неудачного пересоздания)
    #[error("socket is not bound")]
    NotBound,

    /// Сломался сам listener: accept вернул ошибку
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    /// Битый фрейм
    #[error(transparent)]
    Frame(#[from] FrameError),
}

impl SocketError {
    /// Сбой listener'а, а не конкретного собеседника: лечится только
    /// повторным bind. Остальные ошибки касаются одного соединения.
    pub fn is_listener_fault(&self) -> bool {
        matches!(self, SocketError::NotBound | SocketError::Accept(_))
    }
}

/// Категория сбоя запроса.
///
/// `Local` - сессия в порядке, пересоздавать не нужно.
/// `Transport` - сессия рассинхронизирована и уже пересоздана.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Сбой на своей стороне, соединение цело
    Local,
    /// Таймаут или обрыв, соединение пересоздано
    Transport,
}

/// Неудачный исход одного запроса на стороне клиента
#[derive(Debug, Error)]
pub enum RequestFailure {
    /// Ответ не пришёл вовремя
    #[error("timeout")]
    Timeout,

    /// Ошибка транспорта (connect/write/read, нарушение чередования)
    #[error("transport_error: {0}")]
    Transport(SocketError),

    /// Запрос не сериализовался или ответ не разобрался
    #[error("json_error: {0}")]
    Json(#[from] EnvelopeError),
}

impl RequestFailure {
    /// К какой категории относится сбой
    pub fn kind(&self) -> FailureKind {
        match self {
            RequestFailure::Timeout | RequestFailure::Transport(_) => FailureKind::Transport,
            RequestFailure::Json(_) => FailureKind::Local,
        }
    }
}

impl From<SocketError> for RequestFailure {
    fn from(e: SocketError) -> Self {
        match e {
            SocketError::Timeout => RequestFailure::Timeout,
            other => RequestFailure::Transport(other),
        }
    }
}
