/// Data layer: dataset model, time axis, correlation, storage.
///
/// Architecture:
/// ```text
///   ChannelMajor (per channel, per event)
///        │
///        ▼
///   ┌──────────┐
///   │ flatten   │  channel-major rows → Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐        ┌───────────┐
///   │ Dataset   │ ◄────► │ loader /  │  .json / .csv / .parquet
///   └──────────┘        │ writer    │
///        │              └───────────┘
///        ▼
///   ┌──────────┐
///   │ correlate │  event key → ordered channel rows
///   └──────────┘
/// ```
///
/// `axis` holds the discretised time axis every arrival time snaps onto.

pub mod axis;
pub mod correlate;
pub mod flatten;
pub mod loader;
pub mod model;
pub mod writer;
