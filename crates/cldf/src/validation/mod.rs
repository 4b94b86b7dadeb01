//! Dataset validation: structure, datatypes, keys and row validators.

mod engine;
mod log;
mod observation;
mod validators;

pub use engine::ValidationEngine;
pub use log::ValidationLog;
pub use observation::{Observation, ObservationType, Severity};
pub use validators::{
    IgtValidator, PatternValidator, RegisteredValidator, SourceReferenceValidator,
    ValidationError, Validator, builtin_validators,
};
