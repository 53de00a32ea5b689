//! Acoustic-emission waveform datasets: ingestion, noise filtering and
//! time-of-arrival picking.

pub mod commands;
pub mod config;
pub mod data;
pub mod error;
pub mod ingest;
pub mod oracle;
pub mod stages;
