pub mod validation_service;

pub use validation_service::{
    ValidationError, ValidationReport, ValidationRequest, ValidationService, ValidationSummary,
    EXIT_FATAL,
};
