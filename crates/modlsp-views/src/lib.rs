//! The View Definer: turns workspace folders and open files into the set of
//! independently analyzable [`View`]s the Snapshot Engine builds databases
//! for.

mod discover;
mod view;

pub use discover::discover_build_roots;
pub use discover::fallback_definition_for;
pub use discover::plan_views;
pub use discover::reconcile;
pub use discover::view_for_open_file;
pub use discover::Reconciliation;
pub use view::ResolvedEnv;
pub use view::View;
pub use view::ViewDefinition;
pub use view::ViewId;
pub use view::ViewType;
