//! Wire constants and timing defaults.

use std::time::Duration;

/// Magic sequence marking the start of every frame: ASCII `Snif`.
pub const MAGIC: [u8; 4] = [0x53, 0x6E, 0x69, 0x66];
pub const MAGIC_LEN: usize = MAGIC.len();

/// Largest payload a single length byte can describe.
pub const MAX_FRAME_LEN: usize = u8::MAX as usize;

/// Size of the frame header on the wire (magic + length byte).
pub const HEADER_LEN: usize = MAGIC_LEN + 1;

/// Control sequence prefix understood by the replayer firmware: ASCII `ctrl`.
pub const CONTROL: [u8; 4] = [0x63, 0x74, 0x72, 0x6C];

// Timing defaults
pub const DEFAULT_RECONNECT_WAIT: Duration = Duration::from_secs(5);
pub const DEFAULT_FORWARD_DELAY: Duration = Duration::from_millis(300);
pub const DEFAULT_SNIFFER_SUPPRESSION: Duration = Duration::from_secs(1);
pub const DEFAULT_REPLAYER_SUPPRESSION: Duration = Duration::from_millis(500);
