//! Options layer: reading the pipeline parameter file into a typed store.
//!
//! Architecture:
//! ```text
//!   pipeline.options
//!        │
//!        ▼
//!   ┌───────────┐
//!   │ normalize │  trim, drop blank and comment lines
//!   └───────────┘
//!        │
//!        ▼
//!   ┌──────────┐      ┌──────────┐
//!   │  parser   │ ───▶ │  schema  │  module.parameter → type
//!   └──────────┘      └──────────┘
//!        │  warnings (unknown / duplicate) → log + report
//!        ▼
//!   ┌────────────────┐
//!   │ ParameterStore │  module → parameter → OptionValue
//!   └────────────────┘
//! ```

pub mod error;
pub mod literal;
pub mod normalize;
pub mod parser;
pub mod schema;
pub mod value;

pub use error::{ConfigError, ConfigWarning, LookupError};
pub use parser::{parse_options, read_pipeline_options, ParsedOptions, DEFAULT_OPTIONS_FILE};
pub use schema::TypeTag;
pub use value::{ModuleOptions, OptionValue, ParameterStore};
