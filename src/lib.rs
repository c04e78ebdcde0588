//! Density-of-states dataset assembly.
//!
//! Result files of an electronic-structure solver are reduced to one ground
//! state per configuration, turned into DOS rows on a fixed energy grid,
//! filtered by a physical constraint and written as one comma-separated
//! table (parameters ‖ DOS).

pub mod data;
pub mod error;
pub mod pipeline;
pub mod settings;

pub use crate::data::assemble::Variant;
pub use crate::data::descriptor::{Descriptor, KPoint};
pub use crate::data::filter::Constraint;
pub use crate::data::grid::{EnergyGrid, WeightMask, WeightPolicy};
pub use crate::data::kernel::{BroadeningKernel, KernelShape, SharedLibraryKernel};
pub use crate::data::params::{ConfigCode, ParameterTuple, PARAMETER_SCHEMA};
pub use crate::data::table::{AssembledTable, TableRow};
pub use crate::data::validate::ValidationReport;
pub use crate::error::DosError;
pub use crate::pipeline::{GenerateReport, GenerateRequest};
pub use crate::settings::Settings;
