pub mod broadcast_hub;
pub mod code_generator;
pub mod constants;
pub mod player;
pub mod room;
pub mod room_store;

pub use broadcast_hub::{BroadcastHub, PublishReport, SubscriberId, Subscription};
pub use code_generator::{normalize_code, CodeGenerator, RandomCodeGenerator};
pub use constants::*;
pub use player::{validate_player_name, Player, Team};
pub use room::{LeaveOutcome, Phase, PlayerSnapshot, Room, RoomSnapshot, TeamCounts};
pub use room_store::{CreatedRoom, RoomStore, StoreConfig, StoreStats};
