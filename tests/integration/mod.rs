//! Integration tests for Spark Bridge API endpoints

mod models;
mod token;
mod transport;
