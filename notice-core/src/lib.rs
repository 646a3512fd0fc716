//! # notice-core
//!
//! Базовые типы и протокол для notice-server / notice-client.
//!
//! Этот крейт содержит:
//!
//! - [`envelope`] - JSON-конверты запроса/ответа и их кодек
//! - [`notice`] - разбор аргументов команды `notice`
//! - [`frame`] - фрейминг сообщений поверх TCP (длина + payload)
//! - [`socket`] - сокеты request/reply со строгим чередованием
//! - [`error`] - типы ошибок, которые возвращают компоненты `notice-core`
//!
//! ## Быстрый пример: запрос `ping`
//!
//! ```rust
//! use notice_core::envelope::{decode, encode, Request};
//!
//! let bytes = encode(&Request::new("ping")).unwrap();
//! assert_eq!(bytes, br#"{"version":0,"command":"ping"}"#);
//!
//! let back: Request = decode(&bytes).unwrap();
//! assert_eq!(back.command.as_deref(), Some("ping"));
//! ```
//!
//! ## Пример: аргументы `notice`
//!
//! ```rust
//! use notice_core::NoticeParams;
//!
//! let p = NoticeParams::parse(&["Hello", "--allow-break=false", "--mask-duration=abc"]);
//! assert_eq!(p.title, "Hello");
//! assert!(!p.allow_break);
//! assert_eq!(p.mask_duration, 3.0); // битое значение -> default
//! ```
//!
//! ## Дизайн
//!
//! `notice-core` задуман как “нулевая” зависимость для всех частей системы:
//! сервер, клиент, broadcast, тесты. Поэтому здесь держим только:
//! чистые типы, кодек, фрейминг и блокирующие сокеты на std,
//! без runtime/async и без логирования.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// JSON-конверты `Request` / `Response`.
pub mod envelope;

/// Грамматика аргументов команды `notice`.
pub mod notice;

/// Фрейминг `[len: u32 BE][payload]`.
pub mod frame;

/// Блокирующие сокеты request/reply.
pub mod socket;

/// Ошибки `notice-core`.
pub mod error;

/// Общие константы
mod constants;
pub use constants::{
    DEFAULT_PUBLISHER_ADDR, DEFAULT_SERVER_ADDR, MAX_FRAME_LEN, PROTOCOL_VERSION, REQUEST_TIMEOUT,
};

// --- Re-exports (публичный фасад API) ---

pub use crate::envelope::{Request, Response, Status};
pub use crate::error::{
    EnvelopeError, FailureKind, FrameError, RequestFailure, SocketError,
};
pub use crate::notice::NoticeParams;
pub use crate::socket::{ReplySocket, ReplyState, RequestSocket, RequestState};
