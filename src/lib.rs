#![doc = include_str!("../README.md")]

pub mod ga4;
pub mod platform;
pub mod util;
