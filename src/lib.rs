pub mod capabilities;
pub mod cluster;
pub mod config;
pub mod data;
pub mod db;
pub mod engine;
pub mod logging;
pub mod pipeline;
pub mod probe;
pub mod process;
