//! Routing - Route table, matching, guards and the router itself.

mod container_cache;
mod guard;
mod matcher;
#[allow(clippy::module_inception)]
mod router;
mod table;

pub use container_cache::{find_route_containers, RouteContainerCache};
pub use guard::{AfterEachGuard, AfterFn, BeforeEachGuard, BeforeFn, GuardDecision, NavigationContext, Next};
pub use matcher::{strip_query, PathPattern, RouteMatch};
pub use router::{NavigationOutcome, Router};
pub use table::{normalize_path, parse_routes, RouteDef, RouteDescriptor, RouteTable};
