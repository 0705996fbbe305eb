//! Ride track sources for ride replay

pub mod chain;
pub mod demo;
pub mod file;

pub use chain::SourceChain;
pub use demo::DemoSource;
pub use file::JsonFileSource;
