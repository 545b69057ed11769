use ethers::types::{Address, U256};
use sentinel_types::PolicyHash;
use tokio::sync::broadcast;

/// The three events the real contracts would emit (§6's on-chain interface
/// table). Fanned out on a [`broadcast::Sender`] the way
/// `engine/src/relayer/sinks/{logger,stdout,state_chain}.rs` fan a single
/// event stream to multiple sinks: the audit log is one subscriber, a test
/// assertion is another.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainEvent {
    SessionSettled {
        session_id: String,
        operator: Address,
        usdc_delta: i128,
        eth_delta: i128,
        timestamp: u64,
    },
    Executed {
        target: Address,
        value: U256,
        data: Vec<u8>,
    },
    PolicyUpdated {
        old_hash: PolicyHash,
        new_hash: PolicyHash,
        timestamp: u64,
    },
}

/// Default capacity for the broadcast channel backing a fresh event bus. A
/// lagging subscriber only loses events it was too slow to read; the guard
/// and vault never block on a subscriber.
const EVENT_BUS_CAPACITY: usize = 256;

/// A cheaply-cloneable handle to the chain's event stream. Every
/// [`crate::guard::PolicyGuard`] and [`crate::vault::Vault`] instance that
/// shares one `EventBus` publishes to the same subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ChainEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _receiver) = broadcast::channel(EVENT_BUS_CAPACITY);
        EventBus { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChainEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. A send error only happens when there are zero
    /// subscribers, which is not an error condition for a contract emitting
    /// a log nobody is listening to yet.
    pub fn publish(&self, event: ChainEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
