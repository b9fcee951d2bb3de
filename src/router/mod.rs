//! Route table and matcher.

mod route;
#[allow(clippy::module_inception)]
mod router;

pub use route::{Route, RouteHandle};
pub use router::{RouteInfo, RouteListing, RouteMatch, Router};
