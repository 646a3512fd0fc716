use log::{info, warn};
use notice_core::frame::FrameBuffer;
use std::io::{self, Read};
use std::net::{SocketAddr, TcpStream};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

const READ_TICK: Duration = Duration::from_millis(200);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const RECONNECT_DELAY: Duration = Duration::from_millis(500);

/// Чем закончилась одна сессия с издателем
enum SessionEnd {
    Shutdown,
    Lost(io::Error),
}

/// Подписывается на издателя и отдаёт каждое текстовое сообщение в
/// `on_message(n, text)`, где `n` - сквозной номер сообщения.
///
/// Потеря соединения не фатальна: подписчик переподключается, пока не
/// поднят `shutdown`. Не-UTF-8 сообщения пропускаются с предупреждением,
/// но номер всё равно занимают.
pub fn run_subscriber<F>(addr: SocketAddr, shutdown: Arc<AtomicBool>, mut on_message: F)
where
    F: FnMut(u64, &str),
{
    let mut count: u64 = 0;

    while !shutdown.load(Ordering::Relaxed) {
        let stream = match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
            Ok(s) => s,
            Err(e) => {
                warn!("connect to {addr} failed: {e}; retrying");
                crate::sleep_unless(&shutdown, RECONNECT_DELAY);
                continue;
            }
        };
        info!("Subscriber connected to {addr}, waiting for messages...");

        match receive(stream, &shutdown, &mut count, &mut on_message) {
            SessionEnd::Shutdown => break,
            SessionEnd::Lost(e) => {
                warn!("connection to {addr} lost: {e}; reconnecting");
                crate::sleep_unless(&shutdown, RECONNECT_DELAY);
            }
        }
    }

    info!("Shutting down subscriber...");
}

fn receive<R, F>(
    mut stream: R,
    shutdown: &AtomicBool,
    count: &mut u64,
    on_message: &mut F,
) -> SessionEnd
where
    R: Read + ReadTimeout,
    F: FnMut(u64, &str),
{
    if let Err(e) = stream.set_tick(READ_TICK) {
        return SessionEnd::Lost(e);
    }

    let mut inbox = FrameBuffer::new();
    let mut chunk = [0u8; 4096];

    loop {
        loop {
            match inbox.next_frame() {
                Ok(Some(frame)) => {
                    *count += 1;
                    match std::str::from_utf8(&frame) {
                        Ok(text) => {
                            info!("Received message #{count}: {text}");
                            on_message(*count, text);
                        }
                        Err(e) => warn!(
                            "Received message #{count}: not UTF-8 ({} bytes): {e}",
                            frame.len()
                        ),
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    return SessionEnd::Lost(io::Error::new(io::ErrorKind::InvalidData, e));
                }
            }
        }

        if shutdown.load(Ordering::Relaxed) {
            return SessionEnd::Shutdown;
        }

        match stream.read(&mut chunk) {
            Ok(0) => {
                return SessionEnd::Lost(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "publisher closed connection",
                ));
            }
            Ok(n) => inbox.push(&chunk[..n]),
            Err(e)
                if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut =>
            {
                // просто "тик" цикла
            }
            Err(e) => return SessionEnd::Lost(e),
        }
    }
}

/// Источник, которому можно выставить таймаут чтения
trait ReadTimeout {
    fn set_tick(&self, tick: Duration) -> io::Result<()>;
}

impl ReadTimeout for TcpStream {
    fn set_tick(&self, tick: Duration) -> io::Result<()> {
        self.set_read_timeout(Some(tick))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::Publisher;
    use notice_core::frame::write_frame;
    use std::io::Cursor;
    use std::net::TcpListener;
    use std::sync::Mutex;
    use std::thread;
    use std::time::Instant;

    const WAIT: Duration = Duration::from_secs(5);

    impl ReadTimeout for Cursor<Vec<u8>> {
        fn set_tick(&self, _tick: Duration) -> io::Result<()> {
            Ok(())
        }
    }

    fn frames(messages: &[&[u8]]) -> Cursor<Vec<u8>> {
        let mut bytes = Vec::new();
        for m in messages {
            write_frame(&mut bytes, m).unwrap();
        }
        Cursor::new(bytes)
    }

    #[test]
    fn numbers_messages_and_skips_non_utf8() {
        let input = frames(&[b"first", &[0xff, 0xfe], "третье".as_bytes()]);
        let shutdown = AtomicBool::new(false);
        let mut count = 0;
        let mut got = Vec::new();

        let end = receive(input, &shutdown, &mut count, &mut |n, text: &str| {
            got.push((n, text.to_string()))
        });

        // поток кончился -> соединение потеряно
        assert!(matches!(end, SessionEnd::Lost(e) if e.kind() == io::ErrorKind::UnexpectedEof));
        assert_eq!(count, 3);
        assert_eq!(got, [(1, "first".to_string()), (3, "третье".to_string())]);
    }

    #[test]
    fn oversized_frame_drops_the_connection() {
        let bytes = u32::MAX.to_be_bytes().to_vec();
        let shutdown = AtomicBool::new(false);
        let mut count = 0;

        let end = receive(Cursor::new(bytes), &shutdown, &mut count, &mut |_, _: &str| {});
        assert!(matches!(end, SessionEnd::Lost(e) if e.kind() == io::ErrorKind::InvalidData));
        assert_eq!(count, 0);
    }

    #[test]
    fn receives_from_publisher_until_shutdown() {
        let publisher = Publisher::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = publisher.local_addr();
        let shutdown = Arc::new(AtomicBool::new(false));
        let got = Arc::new(Mutex::new(Vec::new()));

        let handle = {
            let shutdown = shutdown.clone();
            let got = got.clone();
            thread::spawn(move || {
                let stop = shutdown.clone();
                run_subscriber(addr, shutdown, move |n, text| {
                    got.lock().unwrap().push((n, text.to_string()));
                    if n == 2 {
                        stop.store(true, Ordering::Relaxed);
                    }
                })
            })
        };

        let start = Instant::now();
        while publisher.subscriber_count() == 0 {
            assert!(start.elapsed() < WAIT, "subscriber did not connect");
            thread::sleep(Duration::from_millis(10));
        }
        publisher.publish("Message 1: Hello from publisher!");
        publisher.publish("Message 2: Hello from publisher!");

        handle.join().unwrap();
        let got = got.lock().unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[1], (2, "Message 2: Hello from publisher!".to_string()));
    }

    #[test]
    fn reconnects_and_keeps_counting() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        // два коротких подключения по одному сообщению
        let server = thread::spawn(move || {
            for text in ["one", "two"] {
                let (mut s, _) = listener.accept().unwrap();
                write_frame(&mut s, text.as_bytes()).unwrap();
            }
        });

        let shutdown = Arc::new(AtomicBool::new(false));
        let stop = shutdown.clone();
        let mut got = Vec::new();
        run_subscriber(addr, shutdown, |n, text| {
            got.push((n, text.to_string()));
            if n == 2 {
                stop.store(true, Ordering::Relaxed);
            }
        });

        server.join().unwrap();
        assert_eq!(got, [(1, "one".to_string()), (2, "two".to_string())]);
    }

    #[test]
    fn gives_up_only_on_shutdown() {
        // никто не слушает: крутим переподключения, пока не попросят выйти
        let addr = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let shutdown = Arc::new(AtomicBool::new(false));

        let handle = {
            let shutdown = shutdown.clone();
            thread::spawn(move || run_subscriber(addr, shutdown, |_, _| {}))
        };
        thread::sleep(Duration::from_millis(300));
        assert!(!handle.is_finished());

        shutdown.store(true, Ordering::Relaxed);
        let start = Instant::now();
        handle.join().unwrap();
        assert!(start.elapsed() < WAIT);
    }
}
