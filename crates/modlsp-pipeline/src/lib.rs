//! The Package Pipeline: turns a view's build configuration and requested
//! URIs into a typed, analyzed metadata graph (spec §4.4). Loads package
//! metadata from the external build-info collaborator (§4.4.2), type-checks
//! bottom-up over the resulting DAG (§4.4.3), and schedules analyzers over
//! the typed packages (§4.4.4), all behind a single-flight promise registry
//! (§4.4.1) so concurrent requests for the same computation share one
//! result instead of duplicating work.

mod analyzer;
mod errors;
mod ext;
mod metadata;
mod registry;
mod typecheck;

pub use analyzer::analyze_package;
pub use analyzer::schedule_analyzers;
pub use analyzer::AnalysisResult;
pub use analyzer::Analyzer;
pub use analyzer::FailedAnalyzers;
pub use analyzer::Facts;
pub use errors::PipelineDiagnostic;
pub use errors::PipelineError;
pub use ext::PipelineCaches;
pub use ext::SnapshotTypeCheck;
pub use metadata::load_package_records;
pub use metadata::merge_metadata_graph;
pub use registry::PromiseRegistry;
pub use typecheck::topological_order;
pub use typecheck::type_check_package;
pub use typecheck::LoadDepth;
pub use typecheck::ObjectId;
pub use typecheck::TypeCheckResult;
pub use typecheck::TypedObject;
pub use typecheck::TypedPackage;
