#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod device;
pub mod dispatcher;
pub mod packet;
pub mod radio;
pub mod scheduler;
pub mod serial;

// These modules depend on the HAL and embassy, only available with the embedded feature
#[cfg(feature = "embedded")]
pub mod logger;
#[cfg(feature = "embedded")]
pub mod tasks;
