pub mod camera;
pub mod config;
pub mod detection;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod pose;
pub mod render;
pub mod session;
