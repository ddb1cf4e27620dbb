//! Event-driven media processing: turns uploaded videos into HLS packages
//! with optional captions and announces the result on the message bus.

pub mod app;
pub mod config;
pub mod infrastructure;
pub mod modules;
pub mod routes;
pub mod state;
pub mod workers;
