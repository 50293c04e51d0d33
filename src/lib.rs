pub mod cli;
pub mod config;
pub mod consumer;
pub mod cursor;
pub mod decode;
pub mod emit;
pub mod service;
