//! Pipeline stages. Each one consumes a dataset and returns new ones.
//!
//! * [`visual`] – human keep/discard review, splits kept and noise events
//! * [`energy`] – drops events whose averaged log10 energy is too low
//! * [`toa`]    – per-channel time-of-arrival picking

pub mod energy;
pub mod toa;
pub mod visual;
