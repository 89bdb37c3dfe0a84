//! gRPC state detection for monitored connections
//!
//! Tonic channels do not expose their connectivity state, so it is derived
//! from periodic health checks (`grpc.health.v1.Health/Check`) and published
//! through a [`ConnectivityCell`](crate::ConnectivityCell).

mod health_probe;
mod probed_channel;

pub use health_probe::*;
pub use probed_channel::*;

#[cfg(test)]
mod health_probe_test;
