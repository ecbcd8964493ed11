//! Batch source-finding pipeline for spectral data cubes.
//!
//! A run reads a `module.parameter = value` options file into a validated
//! [`options::ParameterStore`], loads the input cube, and executes the steps
//! enabled under `steps.*`, each of which may alter the cube and/or OR bits
//! into the detection [`data::model::Mask`].

pub mod data;
pub mod error;
pub mod options;
pub mod pipeline;
