pub mod banner;
pub mod env_builder;
pub mod ports;
pub mod runner;
pub mod secrets;
pub mod workspace;
