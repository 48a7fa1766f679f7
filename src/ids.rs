use std::sync::{LazyLock, Mutex, PoisonError};
use std::time::Duration;

use ulid::Generator;

static GENERATOR: LazyLock<Mutex<Generator>> = LazyLock::new(|| Mutex::new(Generator::new()));

/// Returns a fresh ULID string.
///
/// Ids from one process are strictly increasing, so two calls never collide
/// and later ids sort after earlier ones.
pub fn next_id() -> String {
    let mut generator = GENERATOR.lock().unwrap_or_else(PoisonError::into_inner);
    loop {
        match generator.generate() {
            Ok(id) => return id.to_string(),
            // Random part exhausted within one millisecond; wait for the next one.
            Err(_) => std::thread::sleep(Duration::from_millis(1)),
        }
    }
}
