//! Route gating
//!
//! - [`Route`] / [`RouteKind`]: destinations and their access group
//! - [`evaluate`]: pure allow / defer / redirect policy
//! - [`RouteTable`]: statically defined graphs per authentication state
//! - [`Navigator`]: re-runs the policy whenever the session changes

mod gate;
mod navigator;
mod routes;
mod table;

pub use gate::{Decision, RedirectReason, evaluate};
pub use navigator::Navigator;
pub use routes::{Route, RouteGroup, RouteKind};
pub use table::{AUTHENTICATED_ROUTES, RouteTable, UNAUTHENTICATED_ROUTES};
