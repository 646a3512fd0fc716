//! # notice-pubsub
//!
//! Односторонний broadcast-канал: издатель рассылает текстовые сообщения
//! всем подключённым подписчикам.
//!
//! - [`hub`] - реестр подписчиков с ограниченной очередью на каждого
//! - [`publisher`] - приём подписчиков и рассылка по TCP
//! - [`subscriber`] - цикл приёма с переподключением
//!
//! Фрейминг тот же, что у request/reply: [`notice_core::frame`].
//! Издатель никогда не блокируется на медленном подписчике: если очередь
//! подписчика полна, сообщение для него теряется.

#![forbid(unsafe_code)]

pub mod hub;
pub mod publisher;
pub mod subscriber;

pub use hub::{BroadcastStats, Hub, SubscriberId};
pub use publisher::Publisher;
pub use subscriber::run_subscriber;

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Спит `total`, просыпаясь каждые 50 мс, чтобы заметить `shutdown`
pub fn sleep_unless(shutdown: &AtomicBool, total: Duration) {
    let step = Duration::from_millis(50);
    let mut left = total;
    while !left.is_zero() && !shutdown.load(Ordering::Relaxed) {
        let d = left.min(step);
        thread::sleep(d);
        left -= d;
    }
}
