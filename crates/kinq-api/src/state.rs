//! Application state management
//!
//! Author: hephaex@gmail.com

use kinq_core::config::AppConfig;
use kinq_extractor::QueryInterpreter;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Loaded model plus post-processing; shared read-only by all requests
    pub interpreter: QueryInterpreter,
    /// Server start time
    pub start_time: Instant,
    /// Predict request counter
    pub request_count: AtomicU64,
    /// Predict failures (400 and 500)
    pub error_count: AtomicU64,
}

impl AppState {
    pub fn new(config: AppConfig, interpreter: QueryInterpreter) -> Self {
        Self {
            config,
            interpreter,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
        }
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    pub fn increment_errors(&self) -> u64 {
        self.error_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    pub fn get_error_count(&self) -> u64 {
        self.error_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
