//! Patrol Inspection Dispatch Service
//!
//! This library provides the core functionality for the patrol-inspect
//! system: a durable pending-job queue, an asynchronous classification
//! pipeline backed by a hosted vision-language model, and best-effort
//! notifications to a separate presentation tier.

pub mod app_state;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
