pub mod config;
pub mod launch;
pub mod stage;
pub mod wrap;
