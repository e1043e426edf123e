pub mod batch;
pub mod handlers;
pub mod middleware;
pub mod progress;
pub mod renamer;
pub mod routes;
pub mod search;
pub mod upload;

pub use routes::create_router;
