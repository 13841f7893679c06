pub mod cache;
pub mod config;
pub mod covers;
pub mod database;
pub mod entities;
pub mod errors;
pub mod models;
pub mod seed;
pub mod services;
pub mod web;
