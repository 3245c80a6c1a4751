mod admin;
mod agent;
mod blocking;
pub mod dto;
mod project;
pub mod response;
mod router;
mod session;

pub use router::{AppState, create_router};
