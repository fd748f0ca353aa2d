// devnet-rpc/src/sequencer.rs

use devnet_crypto::create_hash;
use devnet_engine::BlockDescriptor;
use std::fmt;

type Clock = Box<dyn Fn() -> u64 + Send + Sync>;

/// Hands out one synthetic block per accepted transaction.
///
/// Heights start at 1 and live only as long as the process. The dispatcher
/// keeps the sequencer behind its submission gate, so taking `&mut self` is
/// what makes each increment exclusive.
pub struct BlockSequencer {
    height: u64,
    clock: Clock,
}

impl BlockSequencer {
    pub fn new() -> Self {
        Self::with_clock(now_micros)
    }

    /// Use a custom microsecond clock
    pub fn with_clock(clock: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        Self {
            height: 0,
            clock: Box::new(clock),
        }
    }

    pub fn next_block(&mut self) -> BlockDescriptor {
        self.height += 1;
        let timestamp = (self.clock)();
        BlockDescriptor {
            block_height: self.height,
            block_hash: create_hash(&timestamp.to_be_bytes()),
            timestamp,
        }
    }

    /// Height of the last block handed out (0 before the first)
    pub fn height(&self) -> u64 {
        self.height
    }
}

impl Default for BlockSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BlockSequencer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockSequencer").field("height", &self.height).finish()
    }
}

fn now_micros() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_micros()).unwrap_or(0)
}
