//! Utility functions for the application

pub mod otlp;
pub mod string;
pub mod time;
pub mod useragent;
