//! Lead Capture API Library
//!
//! This library provides the core functionality for the Lead Capture
//! API: multi-channel lead intake, normalization, duplicate flagging,
//! persistence and the HTTP surface.
//!
//! # Modules
//!
//! - `capture`: Capture orchestration per intake channel.
//! - `capture_handlers`: HTTP handlers for the capture endpoints.
//! - `capture_models`: Request/response payload models.
//! - `config`: Configuration management.
//! - `db`: Database connection and pool management.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP handlers for reads, listing and delete.
//! - `models`: Core domain models and closed enumerations.
//! - `normalize`: Contact field canonicalization.
//! - `repository`: Persistence contract and Postgres store.
//! - `scoring`: Scoring data contract.
//! - `validation`: Explicit field-level request validation.

pub mod capture;
pub mod capture_handlers;
pub mod capture_models;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod normalize;
pub mod repository;
pub mod scoring;
pub mod validation;
