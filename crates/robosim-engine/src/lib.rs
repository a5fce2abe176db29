//! Simulation service library for Robosim.
//!
//! The binary half (`main.rs`) wires the observer API to the factory
//! store and, when replication is enabled, forwards every broadcast
//! snapshot to NATS. This library half exposes the replication pieces so
//! a remote viewer process can mirror a running simulation with
//! [`replication::SnapshotReplicator::watch`].

pub mod error;
pub mod replication;
