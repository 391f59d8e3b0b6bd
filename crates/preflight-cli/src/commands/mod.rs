//! CLI commands

pub mod check_upgrade;
pub mod components;
pub mod config;
pub mod image;
pub mod prepare;
