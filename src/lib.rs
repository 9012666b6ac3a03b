//! Recruit Bridge - HTTP front end for an out-of-process recruitment worker.

pub mod bridge;
pub mod chat;
pub mod commands;
pub mod config;
pub mod display;
pub mod server;
pub mod store;
