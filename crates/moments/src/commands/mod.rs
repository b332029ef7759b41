pub mod bluesky;
pub mod capture;
pub mod config;
pub mod feed;
pub mod interact;
