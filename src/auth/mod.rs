pub mod middleware;
pub mod token;

pub use middleware::AuthenticatedPlayer;
pub use token::{issue_seat_token, verify_seat_token, SeatClaims};
