/// Length of a room code
pub const CODE_LENGTH: usize = 6;

/// Symbols a room code is drawn from (no 0/O or 1/I to keep codes typable)
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Draws attempted before giving up on finding a free code
pub const MAX_CODE_ATTEMPTS: usize = 32;

/// Longest accepted display name, in characters
pub const MAX_NAME_LENGTH: usize = 20;

/// Players needed before the host may start
pub const MIN_PLAYERS: usize = 2;

/// Players per team when the creator does not pick a size
pub const DEFAULT_TEAM_SIZE: usize = 4;

/// Team sizes a room may be created with
pub const ALLOWED_TEAM_SIZES: [usize; 2] = [3, 4];

/// Rooms with no subscribers and no mutation for this long are swept (30 minutes)
pub const IDLE_ROOM_TIMEOUT_SECONDS: u64 = 1800;

/// Completed rooms are kept this long so clients can see the final state (5 minutes)
pub const COMPLETED_ROOM_GRACE_SECONDS: u64 = 300;

/// Interval between background sweeps
pub const SWEEP_INTERVAL_SECONDS: u64 = 60;

/// Snapshots queued per subscriber before deliveries start failing
pub const SUBSCRIBER_BUFFER: usize = 32;

/// Consecutive failed deliveries after which a subscriber is dropped
pub const MAX_DELIVERY_FAILURES: u32 = 3;

/// Largest text frame accepted from a WebSocket client
pub const MAX_CLIENT_MESSAGE_BYTES: usize = 1024;
