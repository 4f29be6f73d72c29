//! Host-facing JSON contract and stdio bridge.

pub mod contract;
pub mod stdio;
