//! Grading and report-aggregation engine for O-Level and A-Level results.
//!
//! Everything here is pure computation over data the caller has already
//! fetched. The only state is the [`catalog::SubjectCatalog`], which callers
//! construct and own.

pub mod calc;
pub mod catalog;
pub mod config;
pub mod model;
pub mod performance;
pub mod report;
pub mod scales;
pub mod selection;
pub mod weightage;

pub use calc::{
    classify_division, resolve_grade, CalcError, Metric, Warning, WarningCode, NOT_AVAILABLE,
};
pub use config::GradingConfig;
pub use model::{GradedResult, MarksEntry, StudentResults, SubjectResult};
pub use performance::{aggregate_subject_performance, SubjectPerformanceSummary};
pub use report::{build_class_report, build_student_report, ClassReport, SortDirection, SortField};
pub use scales::{Curriculum, CurriculumRules};
pub use selection::{select_best_subjects, BestSubjectSelection};
pub use weightage::{allocation_summary, validate_weightage, Assessment, AssessmentScope, ScopeRule};
