pub mod activity;
pub mod automation;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod servers;

pub use routes::create_router;
