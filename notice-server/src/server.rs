use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use log::{error, info, warn};
use notice_core::{ReplySocket, SocketError};
use notice_core::envelope;

use crate::dispatch::Dispatcher;

/// Ответ на случай, если не сериализовался даже сам ответ
const INTERNAL_ERROR_JSON: &[u8] = br#"{"status_code":500,"message":"Internal server error"}"#;

/// Цикл обработки: recv -> dispatch -> send, по одному запросу за раз.
///
/// Сбой соединения с клиентом -> бросаем только этого клиента, listener
/// и очередь accept сохраняются. Сбой самого listener'а -> bind заново на
/// том же адресе. Выход только по флагу `shutdown`; сокет освобождается
/// при выходе из функции.
pub(crate) fn run_server(
    mut socket: ReplySocket,
    dispatcher: &Dispatcher,
    poll: Duration,
    shutdown: Arc<AtomicBool>,
) {
    info!(
        "Server started on {}, waiting for requests...",
        socket.local_addr()
    );

    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!("Shutting down server...");
            break;
        }

        match socket.recv_timeout(poll) {
            Ok(None) => {
                // просто тик
            }
            Ok(Some(payload)) => serve_one(&mut socket, dispatcher, &payload, poll),
            Err(e) => {
                warn!("Socket error: {e}");
                recover(&mut socket, &e, poll);
            }
        }
    }
}

fn serve_one(socket: &mut ReplySocket, dispatcher: &Dispatcher, payload: &[u8], poll: Duration) {
    info!("Received request: {}", String::from_utf8_lossy(payload));

    let response = dispatcher.handle_payload(payload);
    let bytes = match envelope::encode(&response) {
        Ok(b) => b,
        Err(e) => {
            error!("failed to encode response {response:?}: {e}");
            INTERNAL_ERROR_JSON.to_vec()
        }
    };

    match socket.send(&bytes) {
        Ok(()) => info!("Sent response: {}", String::from_utf8_lossy(&bytes)),
        Err(e) => {
            warn!("Failed to send response: {e}");
            recover(socket, &e, poll);
        }
    }
}

fn recover(socket: &mut ReplySocket, err: &SocketError, poll: Duration) {
    if err.is_listener_fault() {
        recreate(socket, poll);
    } else {
        socket.reset_peer();
        info!("Dropped client connection, waiting for the next one");
    }
}

fn recreate(socket: &mut ReplySocket, poll: Duration) {
    let addr = socket.local_addr();
    match socket.rebuild() {
        Ok(()) => info!("Socket recreated and bound to {addr}"),
        Err(e) => {
            // следующий recv_timeout вернёт NotBound, и попробуем снова
            error!("Failed to rebind {addr}: {e}; retrying");
            thread::sleep(poll);
        }
    }
}
