pub mod room_sweeper;
pub mod session_gateway;

pub use room_sweeper::spawn_room_sweeper;
pub use session_gateway::{Attached, ConnectionId, SessionGateway};
