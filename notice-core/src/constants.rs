use std::time::Duration;

/// Единственная поддерживаемая версия протокола
pub const PROTOCOL_VERSION: i64 = 0;

/// Сколько клиент ждёт ответ на один запрос
pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(5000);

/// Максимальный размер полезной нагрузки одного фрейма (1 MiB)
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Адрес request/reply сервера по умолчанию (для клиента)
pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:5555";

/// Адрес broadcast-публикатора по умолчанию (для подписчика)
pub const DEFAULT_PUBLISHER_ADDR: &str = "127.0.0.1:5556";
