//! Integration tests module
//!
//! This module organizes all integration tests for the r-voiceline application.

// Import individual test modules
pub mod config_test;
pub mod playback_test;
pub mod session_test;
