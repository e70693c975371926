pub mod auth;
pub mod extract;
pub mod levels;
pub mod matches;
pub mod sets;
pub mod standings;
pub mod teams;
pub mod tournaments;
pub mod venues;

pub use auth::{router as auth_router, AppState};
pub use extract::ApiJson;
pub use levels::router as levels_router;
pub use matches::router as matches_router;
pub use sets::router as sets_router;
pub use standings::router as standings_router;
pub use teams::router as teams_router;
pub use tournaments::router as tournaments_router;
pub use venues::router as venues_router;
