pub mod applicator;
pub mod loader;
pub mod schema;

pub use applicator::{
    apply_plan, check_plan, ApplicationError, Applicator, ApplyOptions, PlanReport, PlanResults,
    RenderedChapter, SubstitutionResult,
};
pub use loader::{discover_plans, load_from_path, load_from_str, ConfigError};
pub use schema::{
    HashAlgorithm, Metadata, SubstitutionDefinition, SubstitutionPlan, ValidationError,
    ValidationIssue, Verify,
};
