pub mod calculator;
pub mod coerce;
pub mod config;
pub mod db;
pub mod error;
pub mod reconcile;
pub mod retry;
pub mod service;
pub mod submission;
