//! Board drivers and peripheral helpers.

pub mod battery;
pub mod hw_init;
pub mod indicator;
