pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod render;
pub mod repository;
pub mod router;
pub mod shell;
pub mod transport;
pub mod workflow;
pub mod workspace;
