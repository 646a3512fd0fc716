//! Сокеты request/reply со строгим чередованием.
//!
//! [`ReplySocket`] (сервер): `recv` -> `send` -> `recv` -> ...
//! [`RequestSocket`] (клиент): `send` -> `recv` -> `send` -> ...
//!
//! Вызов не в своём состоянии - [`SocketError::State`]. Сокет после любой
//! [`SocketError`] не чинится, а пересоздаётся через `rebuild()`.

use std::fmt;
use std::io::{self, Read};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::SocketError;
use crate::frame::{FrameBuffer, write_frame};

const READ_CHUNK: usize = 4096;
const MIN_TICK: Duration = Duration::from_millis(1);
const REPLY_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Состояние серверного сокета
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyState {
    /// Ждёт запрос (начальное)
    ReadyToReceive,
    /// Запрос принят, должен уйти ответ
    ReadyToSend,
}

impl ReplyState {
    fn as_str(self) -> &'static str {
        match self {
            ReplyState::ReadyToReceive => "ready to receive",
            ReplyState::ReadyToSend => "ready to send",
        }
    }
}

impl fmt::Display for ReplyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Серверная сторона: слушает адрес, обслуживает одного собеседника за раз.
pub struct ReplySocket {
    /// Фактический адрес после bind (порт 0 уже заменён на настоящий)
    addr: SocketAddr,
    listener: Option<TcpListener>,
    peer: Option<TcpStream>,
    inbox: FrameBuffer,
    state: ReplyState,
}

impl ReplySocket {
    /// Слушает `addr`; порт 0 - любой свободный
    pub fn bind(addr: SocketAddr) -> Result<Self, SocketError> {
        let listener = bind_listener(addr)?;
        let addr = listener.local_addr()?;

        Ok(Self {
            addr,
            listener: Some(listener),
            peer: None,
            inbox: FrameBuffer::new(),
            state: ReplyState::ReadyToReceive,
        })
    }

    /// Фактический адрес listener'а
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Текущее состояние
    pub fn state(&self) -> ReplyState {
        self.state
    }

    /// Есть ли сейчас подключённый собеседник
    pub fn has_peer(&self) -> bool {
        self.peer.is_some()
    }

    /// Ждёт следующий запрос не дольше `tick`.
    ///
    /// `Ok(None)` - за `tick` полный фрейм не пришёл, состояние не меняется.
    /// Отключение собеседника между запросами ошибкой не считается: сокет
    /// просто начинает ждать следующего.
    pub fn recv_timeout(&mut self, tick: Duration) -> Result<Option<Vec<u8>>, SocketError> {
        if self.state != ReplyState::ReadyToReceive {
            return Err(SocketError::State {
                op: "receive",
                state: self.state.as_str(),
            });
        }
        let tick = tick.max(MIN_TICK);

        // хвост предыдущего чтения
        if let Some(frame) = self.inbox.next_frame()? {
            return Ok(Some(self.received(frame)));
        }

        if self.peer.is_none() && !self.accept_peer(tick)? {
            return Ok(None);
        }
        let Some(peer) = self.peer.as_mut() else {
            return Ok(None);
        };

        peer.set_read_timeout(Some(tick))?;
        let mut chunk = [0u8; READ_CHUNK];
        match peer.read(&mut chunk) {
            Ok(0) => {
                if !self.inbox.is_empty() {
                    // оборвали посреди фрейма
                    return Err(SocketError::Closed);
                }
                self.drop_peer();
                return Ok(None);
            }
            Ok(n) => self.inbox.push(&chunk[..n]),
            Err(e) if is_tick(&e) => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        match self.inbox.next_frame()? {
            Some(frame) => Ok(Some(self.received(frame))),
            None => Ok(None),
        }
    }

    /// Отправляет ответ на последний принятый запрос
    pub fn send(&mut self, payload: &[u8]) -> Result<(), SocketError> {
        if self.state != ReplyState::ReadyToSend {
            return Err(SocketError::State {
                op: "send",
                state: self.state.as_str(),
            });
        }

        let peer = self.peer.as_mut().ok_or(SocketError::Closed)?;
        write_frame(peer, payload)?;
        self.state = ReplyState::ReadyToReceive;
        Ok(())
    }

    /// Бросает текущего собеседника после сбоя на его соединении.
    ///
    /// Listener остаётся: клиенты, уже стоящие в очереди на accept, не
    /// теряются. Следующий `recv_timeout` примет нового собеседника.
    pub fn reset_peer(&mut self) {
        self.drop_peer();
        self.state = ReplyState::ReadyToReceive;
    }

    /// Закрывает всё и заново слушает тот же адрес.
    ///
    /// Если bind не удался, сокет остаётся без listener и `recv_timeout`
    /// вернёт [`SocketError::NotBound`] до следующего успешного `rebuild`.
    pub fn rebuild(&mut self) -> Result<(), SocketError> {
        self.teardown();
        self.listener = Some(bind_listener(self.addr)?);
        Ok(())
    }

    fn received(&mut self, frame: Vec<u8>) -> Vec<u8> {
        self.state = ReplyState::ReadyToSend;
        frame
    }

    fn accept_peer(&mut self, tick: Duration) -> Result<bool, SocketError> {
        let listener = self.listener.as_ref().ok_or(SocketError::NotBound)?;

        match listener.accept() {
            Ok((stream, _addr)) => {
                stream.set_nonblocking(false)?;
                stream.set_nodelay(true).ok();
                stream.set_write_timeout(Some(REPLY_WRITE_TIMEOUT)).ok();

                self.inbox.clear();
                self.peer = Some(stream);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                // нет новых соединений прямо сейчас
                thread::sleep(tick);
                Ok(false)
            }
            Err(e) => Err(SocketError::Accept(e)),
        }
    }

    fn drop_peer(&mut self) {
        if let Some(peer) = self.peer.take() {
            peer.shutdown(Shutdown::Both).ok();
        }
        self.inbox.clear();
    }

    fn teardown(&mut self) {
        self.drop_peer();
        self.listener = None;
        self.state = ReplyState::ReadyToReceive;
    }
}

impl Drop for ReplySocket {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Состояние клиентского сокета
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Можно отправлять (начальное)
    ReadyToSend,
    /// Запрос ушёл, ждём ответ
    AwaitingReply,
}

impl RequestState {
    fn as_str(self) -> &'static str {
        match self {
            RequestState::ReadyToSend => "ready to send",
            RequestState::AwaitingReply => "awaiting reply",
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Клиентская сторона. Соединяется лениво, при первой отправке.
pub struct RequestSocket {
    addr: SocketAddr,
    stream: Option<TcpStream>,
    inbox: FrameBuffer,
    state: RequestState,
}

impl RequestSocket {
    /// Сокет к серверу `addr`; соединение откроет первый `send`
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            stream: None,
            inbox: FrameBuffer::new(),
            state: RequestState::ReadyToSend,
        }
    }

    /// Адрес сервера
    pub fn peer_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Текущее состояние
    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Открыто ли соединение
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Отправляет запрос; `timeout` ограничивает connect и запись
    pub fn send(&mut self, payload: &[u8], timeout: Duration) -> Result<(), SocketError> {
        if self.state != RequestState::ReadyToSend {
            return Err(SocketError::State {
                op: "send",
                state: self.state.as_str(),
            });
        }

        if self.stream.is_none() {
            self.stream = Some(connect(self.addr, timeout)?);
        }
        let stream = self.stream.as_mut().ok_or(SocketError::Closed)?;

        write_frame(stream, payload)?;
        self.state = RequestState::AwaitingReply;
        Ok(())
    }

    /// Ждёт ответ до `deadline`, иначе [`SocketError::Timeout`]
    pub fn recv_deadline(&mut self, deadline: Instant) -> Result<Vec<u8>, SocketError> {
        if self.state != RequestState::AwaitingReply {
            return Err(SocketError::State {
                op: "receive",
                state: self.state.as_str(),
            });
        }

        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(frame) = self.inbox.next_frame()? {
                self.state = RequestState::ReadyToSend;
                return Ok(frame);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(SocketError::Timeout);
            }

            let stream = self.stream.as_mut().ok_or(SocketError::Closed)?;
            stream.set_read_timeout(Some(remaining.max(MIN_TICK)))?;
            match stream.read(&mut chunk) {
                Ok(0) => return Err(SocketError::Closed),
                Ok(n) => self.inbox.push(&chunk[..n]),
                Err(e) if is_tick(&e) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Бросает текущее соединение; следующий `send` подключится заново
    pub fn rebuild(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.shutdown(Shutdown::Both).ok();
        }
        self.inbox.clear();
        self.state = RequestState::ReadyToSend;
    }
}

impl Drop for RequestSocket {
    fn drop(&mut self) {
        self.rebuild();
    }
}

fn bind_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    let listener = TcpListener::bind(addr)?;
    listener.set_nonblocking(true)?;
    Ok(listener)
}

fn connect(addr: SocketAddr, timeout: Duration) -> io::Result<TcpStream> {
    let stream = TcpStream::connect_timeout(&addr, timeout.max(MIN_TICK))?;
    stream.set_nodelay(true).ok();
    stream.set_write_timeout(Some(timeout.max(MIN_TICK)))?;
    Ok(stream)
}

fn is_tick(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut
}
