use std::time::{SystemTime, UNIX_EPOCH};

use sentinel_types::Clock;

/// The production [`Clock`] implementation: milliseconds since the Unix
/// epoch, read from the system clock. Every other crate only ever sees
/// `u64` timestamps injected through this trait, so swapping in a fixed or
/// sequential clock for tests (as every `#[cfg(test)]` module in this
/// workspace does) never touches production code.
#[derive(Clone, Copy, Debug, Default)]
pub struct WallClock;

impl Clock for WallClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the Unix epoch")
            .as_millis() as u64
    }
}
