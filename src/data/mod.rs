//! Data layer: cube and mask types, file I/O, and the steps that touch them.
//!
//! Architecture:
//! ```text
//!  .parquet / .json / .csv
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse file → Cube (and optional Mask)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────────┐
//!   │  Cube, Mask   │  dense f64 voxels, u8 detection bits
//!   └──────────────┘
//!        │
//!        ▼
//!   ┌──────────┐     ┌──────────┐
//!   │   flag    │ ──▶ │  filter   │  threshold → OR bits into Mask
//!   └──────────┘     └──────────┘
//!                         │ relative clipping
//!                         ▼
//!                    ┌──────────┐
//!                    │  noise    │  std / mad / negative rms
//!                    └──────────┘
//! ```

pub mod filter;
pub mod flag;
pub mod loader;
pub mod model;
pub mod noise;
