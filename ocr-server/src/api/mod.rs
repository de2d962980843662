//! HTTP surface: `GET /` and `POST /upload`.

mod handlers;
pub mod response;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
