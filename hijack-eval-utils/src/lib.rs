//! Utility library for the hijack-eval project

pub mod other;
pub mod tables;
