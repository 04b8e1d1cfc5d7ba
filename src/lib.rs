pub mod compare;
pub mod config;
pub mod db;
pub mod nem12;
pub mod report;
pub mod services;
pub mod timeseries;
