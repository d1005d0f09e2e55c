pub mod admin;
pub mod health;
pub mod latency;
pub mod routes;
