/// Abstracts "what time is it" so the policy engine and session manager
/// stay pure functions of their explicit inputs (§4.1: "No I/O, no time
/// dependency beyond timestamping the result").
///
/// Implementations live at the edges: `sentinel-kernel` provides a
/// wall-clock implementation for production use and a fixed/sequential one
/// for tests, so every timestamped record in a test is reproducible.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now(&self) -> u64;
}

/// A clock that always returns the same instant. Useful as a building block
/// for deterministic tests; does not itself advance.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now(&self) -> u64 {
        self.0
    }
}
