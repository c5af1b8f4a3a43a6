//! Turnstile - Distributed Request Admission Gate
//!
//! This crate implements a request-admission gate for services that run as
//! many stateless processes behind a load balancer. Per-identity request
//! counts live in a shared counter store (Redis in production), so every
//! process reaches the same allow/deny decision without holding local state.

pub mod admission;
pub mod config;
pub mod error;
pub mod store;
