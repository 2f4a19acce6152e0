//! Network Threat Detector client
//!
//! Submits network captures to the analysis pipeline and follows them
//! through its stages: upload progress as a pull-based stream, an adaptive
//! poll scheduler for the assignment, and detection of the final result.

pub mod app_state;
pub mod config;
pub mod models;
pub mod services;
