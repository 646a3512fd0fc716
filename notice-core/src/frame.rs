//! Фрейминг поверх байтового потока: `[len: u32 BE][payload]`.

use std::io::{self, Write};

use crate::constants::MAX_FRAME_LEN;
use crate::error::FrameError;

const HEADER_LEN: usize = 4;

/// Пишет один фрейм целиком и делает flush
pub fn write_frame<W: Write>(w: &mut W, payload: &[u8]) -> io::Result<()> {
    if payload.len() > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            FrameError::TooLarge {
                len: payload.len(),
                max: MAX_FRAME_LEN,
            },
        ));
    }

    let len = payload.len() as u32;
    w.write_all(&len.to_be_bytes())?;
    w.write_all(payload)?;
    w.flush()
}

/// Накопитель входящих байтов.
///
/// Чтение с таймаутом может оборвать фрейм на середине, поэтому байты
/// копятся здесь между вызовами `read`, а фрейм отдаётся только целиком.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: Vec<u8>,
}

impl FrameBuffer {
    /// Пустой буфер
    pub fn new() -> Self {
        Self::default()
    }

    /// Дописывает прочитанные байты
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Достаёт следующий полный фрейм, если он уже есть
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        let Some(header) = self.buf.get(..HEADER_LEN) else {
            return Ok(None);
        };

        let mut len_bytes = [0u8; HEADER_LEN];
        len_bytes.copy_from_slice(header);
        let len = u32::from_be_bytes(len_bytes) as usize;

        if len > MAX_FRAME_LEN {
            return Err(FrameError::TooLarge {
                len,
                max: MAX_FRAME_LEN,
            });
        }

        if self.buf.len() < HEADER_LEN + len {
            return Ok(None);
        }

        let payload = self.buf[HEADER_LEN..HEADER_LEN + len].to_vec();
        self.buf.drain(..HEADER_LEN + len);
        Ok(Some(payload))
    }

    /// Нет ни одного недочитанного байта
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Сбрасывает недочитанный хвост (при смене соединения)
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}
