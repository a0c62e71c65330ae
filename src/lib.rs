pub mod app;
pub mod cache;
pub mod chart;
pub mod config;
pub mod domain;
pub mod error;
pub mod output;
pub mod series;
pub mod table;
pub mod viewer;
