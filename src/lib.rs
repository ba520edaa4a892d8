pub mod analysis;
pub mod api;
pub mod app;
pub mod config;
pub mod geocoding;
pub mod importers;
pub mod models;
pub mod pipeline;
pub mod postcode;
pub mod render;
pub mod services;
pub mod utils;
