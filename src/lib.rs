//! ConfigPush pushes rendered device configurations to network devices, with
//! a backup or snapshot taken first and an automatic rollback when anything
//! goes wrong.

pub mod backup;
pub mod config;
pub mod deployer;
pub mod error;
pub mod models;
pub mod strategy;
pub mod transport;
pub mod verify;
