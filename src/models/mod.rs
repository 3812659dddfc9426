pub mod requests;
pub mod responses;

pub use requests::{ClientMessage, CreateGameRequest, JoinGameRequest, SwitchTeamRequest};
pub use responses::{HealthResponse, JoinResponse, PongResponse, ServerMessage};
