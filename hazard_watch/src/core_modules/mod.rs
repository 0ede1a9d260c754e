pub mod analytics;
pub mod detection;
pub mod export;
pub mod filter;
pub mod fixtures;
pub mod generator;
pub mod map;
pub mod media;
pub mod notice;
pub mod privacy;
pub mod session;
pub mod store;
