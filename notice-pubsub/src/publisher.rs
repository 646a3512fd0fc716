use anyhow::Context;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{info, warn};
use notice_core::frame::write_frame;
use std::io::{self, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::hub::{BroadcastStats, Hub, Message, SubscriberId};

const ACCEPT_TICK: Duration = Duration::from_millis(50);
const WRITER_TICK: Duration = Duration::from_millis(200);
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Издатель: принимает подписчиков в фоне, рассылает через [`Hub`].
///
/// `publish` не блокируется. Каждому подписчику пишет свой поток, так что
/// зависший подписчик тормозит только себя.
pub struct Publisher {
    hub: Arc<Hub>,
    local_addr: SocketAddr,
    stop: Arc<AtomicBool>,
    acceptor: Option<JoinHandle<()>>,
}

impl Publisher {
    pub fn bind(addr: SocketAddr) -> anyhow::Result<Self> {
        Self::with_hub(addr, Arc::new(Hub::default()))
    }

    pub fn with_hub(addr: SocketAddr, hub: Arc<Hub>) -> anyhow::Result<Self> {
        let listener =
            TcpListener::bind(addr).with_context(|| format!("bind publisher {addr}"))?;
        listener
            .set_nonblocking(true)
            .context("listener.set_nonblocking(true)")?;
        let local_addr = listener.local_addr()?;

        let stop = Arc::new(AtomicBool::new(false));
        let acceptor = {
            let hub = hub.clone();
            let stop = stop.clone();
            thread::Builder::new()
                .name("publisher-accept".into())
                .spawn(move || run_acceptor(listener, hub, stop))
                .context("spawn accept thread")?
        };

        Ok(Self {
            hub,
            local_addr,
            stop,
            acceptor: Some(acceptor),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn subscriber_count(&self) -> usize {
        self.hub.len()
    }

    pub fn publish(&self, text: &str) -> BroadcastStats {
        self.hub.broadcast(text)
    }
}

impl Drop for Publisher {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(h) = self.acceptor.take() {
            if h.join().is_err() {
                warn!("accept thread panicked");
            }
        }
    }
}

fn run_acceptor(listener: TcpListener, hub: Arc<Hub>, stop: Arc<AtomicBool>) {
    let mut writers = Vec::new();

    loop {
        reap_finished_writers(&mut writers);

        if stop.load(Ordering::Relaxed) {
            break;
        }

        match listener.accept() {
            Ok((stream, peer)) => match prepare_stream(&stream) {
                Ok(()) => {
                    let (id, rx) = hub.subscribe();
                    info!("Subscriber #{id} connected from {peer}");

                    let hub = hub.clone();
                    let stop = stop.clone();
                    writers.push(thread::spawn(move || {
                        if let Err(e) = run_writer(id, stream, &rx, &stop) {
                            warn!("Subscriber #{id} dropped: {e}");
                        }
                        hub.unsubscribe(id);
                    }));
                }
                Err(e) => warn!("failed to set up subscriber {peer}: {e}"),
            },
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                // нет новых подписчиков прямо сейчас
                thread::sleep(ACCEPT_TICK);
            }
            Err(e) => {
                warn!("accept error: {e}");
                thread::sleep(ACCEPT_TICK);
            }
        }
    }

    for h in writers {
        if h.join().is_err() {
            warn!("writer thread panicked");
        }
    }
}

fn prepare_stream(stream: &TcpStream) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_nodelay(true).ok();
    stream.set_write_timeout(Some(WRITE_TIMEOUT))
}

fn reap_finished_writers(handles: &mut Vec<JoinHandle<()>>) {
    let mut i = 0;
    while i < handles.len() {
        if handles[i].is_finished() {
            let h = handles.swap_remove(i);
            if h.join().is_err() {
                warn!("writer thread panicked");
            }
        } else {
            i += 1;
        }
    }
}

/// Пишет очередь подписчика в сокет. Уже поставленные в очередь
/// сообщения дописываются и после `stop`.
fn run_writer<W: Write>(
    id: SubscriberId,
    mut out: W,
    rx: &Receiver<Message>,
    stop: &AtomicBool,
) -> io::Result<()> {
    loop {
        match rx.recv_timeout(WRITER_TICK) {
            Ok(msg) => {
                write_frame(&mut out, msg.as_bytes())?;
                out.flush()?;
            }
            Err(RecvTimeoutError::Timeout) => {
                if stop.load(Ordering::Relaxed) {
                    info!("Subscriber #{id}: publisher closing");
                    return Ok(());
                }
            }
            Err(RecvTimeoutError::Disconnected) => return Ok(()),
        }
    }
}
