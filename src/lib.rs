//! Network reachability monitor.
//!
//! Devices are queued with a daily UTC window, a protocol (ICMP or TCP) and a
//! trigger. Every few minutes the monitor probes the devices whose window is
//! open, notifies the configured recipients when a trigger fires and updates
//! the queue: one-shot devices are removed, persistent ones remember whether
//! their alarm is active.

pub mod config;
pub mod db;
pub mod monitoring;
pub mod notifications;
pub mod services;
pub mod version;
