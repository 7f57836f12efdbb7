//! HTTP request handlers
//!
//! - `api` - Health check endpoint
//! - `speak` - Text-to-speech synthesis
//! - `voices` - Voice listing endpoint

pub mod api;
pub mod speak;
pub mod voices;
