pub mod access;
pub mod associate;
pub mod coercion;
pub mod propagate;
pub mod resolve;
pub mod sequence;

pub use access::{AccessChecker, Action, AllowAll, EventSink, LogSink};
pub use associate::AssociationManager;
pub use coercion::ValueCodec;
pub use propagate::{
    plan_family_change, plan_link_activated, plan_product_created, Propagator,
};
pub use resolve::Resolver;
pub use sequence::{ranks_for, Resequencer};
