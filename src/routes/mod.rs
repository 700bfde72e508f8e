//! Route configuration.

pub mod relay;
