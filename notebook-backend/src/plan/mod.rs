//! Plan execution engine: typed actions, reference resolution, ordered
//! execution and the plan-group lifecycle.

pub mod action;
pub mod context;
pub mod executor;
pub mod group;
pub mod resolver;

pub use action::{ActionKind, PlanAction};
pub use context::{CreatedEntity, ExecutionContext};
pub use executor::{GroupOutcome, PlanExecutor};
pub use group::{ActionResult, PlanGroup, PlanGroupStatus, PlanSummary};
pub use resolver::{EntityRef, Resolver};
