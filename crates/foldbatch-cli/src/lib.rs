//! Foldbatch CLI library: the Chromium-backed remote form, configuration
//! resolution, operator checkpoints and the subcommand handlers.

pub mod cli;
pub mod config;
pub mod operator;
pub mod renderer;
pub mod session;
