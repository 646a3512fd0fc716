use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

pub type SubscriberId = u64;

/// Сообщение рассылки; одно на всех подписчиков
pub type Message = Arc<str>;

/// Сколько сообщений может ждать отправки у одного подписчика
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastStats {
    pub sent: usize,
    pub dropped_full: usize,
    pub dropped_dead: usize,
}

impl fmt::Display for BroadcastStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sent={} dropped_full={} dropped_dead={}",
            self.sent, self.dropped_full, self.dropped_dead
        )
    }
}

impl BroadcastStats {
    pub fn not_empty(&self) -> bool {
        self.sent + self.dropped_dead + self.dropped_full > 0
    }
}

pub struct Hub {
    subscribers: Mutex<HashMap<SubscriberId, Sender<Message>>>,
    capacity_per_subscriber: usize,
    next_id: AtomicU64,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl Hub {
    pub fn new(capacity_per_subscriber: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            capacity_per_subscriber: capacity_per_subscriber.max(1),
            next_id: AtomicU64::new(1),
        }
    }

    /// Регистрирует подписчика и отдаёт его очередь
    pub fn subscribe(&self) -> (SubscriberId, Receiver<Message>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = crossbeam_channel::bounded(self.capacity_per_subscriber);
        self.lock().insert(id, tx);
        (id, rx)
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.lock().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Кладёт сообщение в очередь каждому подписчику, не блокируясь.
    /// Отвалившиеся подписчики удаляются из реестра.
    pub fn broadcast(&self, text: &str) -> BroadcastStats {
        let msg: Message = Arc::from(text);

        let snapshot: Vec<(SubscriberId, Sender<Message>)> = self
            .lock()
            .iter()
            .map(|(&id, tx)| (id, tx.clone()))
            .collect();

        let mut stats = BroadcastStats::default();
        let mut dead: Vec<SubscriberId> = Vec::new();

        for (id, tx) in &snapshot {
            match tx.try_send(msg.clone()) {
                Ok(()) => stats.sent += 1,
                Err(TrySendError::Full(_)) => stats.dropped_full += 1,
                Err(TrySendError::Disconnected(_)) => dead.push(*id),
            }
        }

        for id in &dead {
            self.unsubscribe(*id);
        }
        stats.dropped_dead = dead.len();
        stats
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SubscriberId, Sender<Message>>> {
        match self.subscribers.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(), // продолжаем, несмотря на poison
        }
    }
}
