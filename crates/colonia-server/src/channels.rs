//! Renet channel configuration.
//!
//! Commands and their replies share one ReliableOrdered channel, which is
//! what keeps handling strictly request/response per connection.

use std::time::Duration;

use renet::ChannelConfig;

/// Channel IDs for different message types
pub mod channel_id {
    /// Command elements and replies - must arrive in order
    pub const COMMANDS: u8 = 0;
}

/// Maximum bytes per channel
const MAX_CHANNEL_MEMORY: usize = 5 * 1024 * 1024; // 5 MB

pub fn create_channel_configs() -> Vec<ChannelConfig> {
    vec![ChannelConfig {
        channel_id: channel_id::COMMANDS,
        max_memory_usage_bytes: MAX_CHANNEL_MEMORY,
        send_type: renet::SendType::ReliableOrdered {
            resend_time: Duration::from_millis(300),
        },
    }]
}
