use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::PROTOCOL_VERSION;
use crate::error::EnvelopeError;

/// Запрос клиента:
/// `{"version": 0, "command": "<name>", "args": ["<token>", ...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Версия протокола; поддерживается только `0`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,

    /// Нестроковое значение `command` читается как отсутствующее
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_or_none"
    )]
    pub command: Option<String>,

    /// Токены аргументов команды
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
}

impl Request {
    /// Запрос текущей версии без аргументов
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            version: Some(PROTOCOL_VERSION),
            command: Some(command.into()),
            args: None,
        }
    }

    /// Запрос текущей версии с аргументами
    pub fn with_args(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            args: Some(args),
            ..Self::new(command)
        }
    }

    /// `args` или пустой список, если поле не передано
    pub fn args(&self) -> &[String] {
        self.args.as_deref().unwrap_or_default()
    }
}

fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    })
}

/// HTTP-подобные коды ответа
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// 200
    Ok,
    /// 202: уведомление принято, но без перемены
    Accepted,
    /// 400
    BadRequest,
    /// 404: неизвестная команда
    NotFound,
    /// 500
    InternalError,
}

impl Status {
    /// Числовой код для `status_code`
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::Accepted => 202,
            Status::BadRequest => 400,
            Status::NotFound => 404,
            Status::InternalError => 500,
        }
    }
}

/// Ответ сервера: `{"status_code": <int>, "message": "<string>"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Код из [`Status`]
    pub status_code: u16,
    /// Текст для человека
    pub message: String,
}

impl Response {
    /// Ответ с кодом `status`
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status_code: status.code(),
            message: message.into(),
        }
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status_code, self.message)
    }
}

/// Сериализует значение в JSON (UTF-8 без экранирования не-ASCII)
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, EnvelopeError> {
    serde_json::to_vec(value).map_err(EnvelopeError::Encode)
}

/// Разбирает JSON из байтов фрейма
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, EnvelopeError> {
    serde_json::from_slice(bytes).map_err(EnvelopeError::Decode)
}
