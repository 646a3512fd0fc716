use std::net::SocketAddr;
use std::time::{Duration, Instant};

use log::{info, warn};
use notice_core::{RequestFailure, RequestSocket, Response, envelope};
use serde::Serialize;

/// Клиент notice-server: один запрос в полёте, дедлайн на ответ.
///
/// После таймаута или сбоя транспорта сокет пересоздаётся, и следующий
/// запрос идёт уже по новому соединению.
pub(crate) struct NoticeClient {
    socket: RequestSocket,
    timeout: Duration,
}

impl NoticeClient {
    pub(crate) fn new(addr: SocketAddr, timeout: Duration) -> Self {
        Self {
            socket: RequestSocket::new(addr),
            timeout,
        }
    }

    pub(crate) fn send_request<T: Serialize + ?Sized>(
        &mut self,
        payload: &T,
    ) -> Result<Response, RequestFailure> {
        let bytes = envelope::encode(payload)?;
        info!(
            "Sending request to {}: {}",
            self.socket.peer_addr(),
            String::from_utf8_lossy(&bytes)
        );

        let deadline = Instant::now() + self.timeout;
        let exchange = self
            .socket
            .send(&bytes, self.timeout)
            .and_then(|()| self.socket.recv_deadline(deadline));

        let reply = match exchange {
            Ok(reply) => reply,
            Err(e) => {
                let failure = RequestFailure::from(e);
                let server = self.socket.peer_addr();
                match &failure {
                    RequestFailure::Timeout => {
                        warn!("Request to {server} timed out, recreating socket")
                    }
                    other => warn!("Request to {server} failed: {other}; recreating socket"),
                }
                self.socket.rebuild();
                return Err(failure);
            }
        };

        // битый ответ не ломает чередование: сокет уже ReadyToSend
        let response: Response = envelope::decode(&reply).inspect_err(|e| {
            warn!("Failed to parse response: {e}");
        })?;
        info!("Received response: {response}");
        Ok(response)
    }

    #[cfg(test)]
    fn is_connected(&self) -> bool {
        self.socket.is_connected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notice_core::frame::{FrameBuffer, write_frame};
    use notice_core::{FailureKind, ReplySocket, Request, Status};
    use std::io::Read;
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    const SHORT: Duration = Duration::from_millis(200);
    const WAIT: Duration = Duration::from_secs(5);

    fn read_request(stream: &mut TcpStream, inbox: &mut FrameBuffer) -> Request {
        stream.set_read_timeout(Some(WAIT)).unwrap();
        let mut chunk = [0u8; 512];
        loop {
            if let Some(frame) = inbox.next_frame().unwrap() {
                return envelope::decode(&frame).unwrap();
            }
            let n = stream.read(&mut chunk).unwrap();
            assert!(n > 0, "client closed connection early");
            inbox.push(&chunk[..n]);
        }
    }

    fn reply(stream: &mut TcpStream, body: &[u8]) {
        write_frame(stream, body).unwrap();
    }

    #[test]
    fn talks_to_a_reply_socket() {
        let mut server = ReplySocket::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = server.local_addr();

        let handle = thread::spawn(move || {
            let start = Instant::now();
            loop {
                if let Some(payload) = server.recv_timeout(Duration::from_millis(20)).unwrap() {
                    let req: Request = envelope::decode(&payload).unwrap();
                    assert_eq!(req.command.as_deref(), Some("ping"));
                    let resp = envelope::encode(&Response::new(Status::Ok, "OK")).unwrap();
                    server.send(&resp).unwrap();
                    return;
                }
                assert!(start.elapsed() < WAIT, "no request arrived");
            }
        });

        let mut client = NoticeClient::new(addr, WAIT);
        let resp = client.send_request(&Request::new("ping")).unwrap();
        assert_eq!(resp, Response::new(Status::Ok, "OK"));
        handle.join().unwrap();
    }

    #[test]
    fn timeout_rebuilds_and_next_request_succeeds() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            // первое соединение: читаем запрос и молчим
            let (mut silent, _) = listener.accept().unwrap();
            let first = read_request(&mut silent, &mut FrameBuffer::new());
            assert_eq!(first.command.as_deref(), Some("time"));

            // клиент должен прийти заново
            let (mut fresh, _) = listener.accept().unwrap();
            let second = read_request(&mut fresh, &mut FrameBuffer::new());
            assert_eq!(second.command.as_deref(), Some("ping"));
            reply(&mut fresh, br#"{"status_code":200,"message":"OK"}"#);
            drop(silent);
        });

        let mut client = NoticeClient::new(addr, SHORT);

        let started = Instant::now();
        let err = client.send_request(&Request::new("time")).unwrap_err();
        assert!(matches!(err, RequestFailure::Timeout), "{err}");
        assert_eq!(err.to_string(), "timeout");
        assert_eq!(err.kind(), FailureKind::Transport);
        assert!(started.elapsed() >= SHORT);
        assert!(!client.is_connected());

        client.timeout = WAIT;
        let resp = client.send_request(&Request::new("ping")).unwrap();
        assert_eq!(resp.status_code, 200);
        handle.join().unwrap();
    }

    #[test]
    fn garbage_reply_is_json_error_without_reconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut inbox = FrameBuffer::new();

            read_request(&mut stream, &mut inbox);
            reply(&mut stream, b"<html>not json</html>");

            // второй запрос приходит по тому же соединению
            read_request(&mut stream, &mut inbox);
            reply(&mut stream, br#"{"status_code":200,"message":"OK"}"#);
        });

        let mut client = NoticeClient::new(addr, WAIT);

        let err = client.send_request(&Request::new("ping")).unwrap_err();
        assert!(matches!(err, RequestFailure::Json(_)), "{err}");
        assert!(err.to_string().starts_with("json_error: "));
        assert_eq!(err.kind(), FailureKind::Local);
        assert!(client.is_connected());

        let resp = client.send_request(&Request::new("ping")).unwrap();
        assert_eq!(resp.status_code, 200);
        handle.join().unwrap();
    }

    #[test]
    fn refused_connection_is_transport_error() {
        // занимаем порт и сразу освобождаем: на нём никто не слушает
        let addr = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();

        let mut client = NoticeClient::new(addr, SHORT);
        let err = client.send_request(&Request::new("ping")).unwrap_err();
        assert!(matches!(err, RequestFailure::Transport(_)), "{err}");
        assert!(err.to_string().starts_with("transport_error: "));
    }

    #[test]
    fn server_hangup_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            read_request(&mut stream, &mut FrameBuffer::new());
            // закрываем, не ответив
        });

        let mut client = NoticeClient::new(addr, WAIT);
        let err = client.send_request(&Request::new("ping")).unwrap_err();
        handle.join().unwrap();
        assert!(matches!(err, RequestFailure::Transport(_)), "{err}");
        assert!(!client.is_connected());
    }
}
