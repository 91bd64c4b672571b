#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod connection;
pub mod display;
pub mod generate;
pub mod models;
pub mod sqlite;
pub mod utils;
pub mod viz;

pub use cli::app::{Cli, Command};
