//! Music taste fingerprinting and discovery recommendations.
//!
//! A user's streaming library is condensed into a [`models::Fingerprint`]
//! (weighted genre distribution, liked tracks, artists), which then drives
//! weighted genre sampling against a public catalog to surface recordings the
//! user has neither liked nor already been shown.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
