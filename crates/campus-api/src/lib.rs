pub mod auth;
pub mod complaints;
pub mod error;
pub mod extract;
pub mod messages;
pub mod middleware;
pub mod routes;
pub mod stats;
