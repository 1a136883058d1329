pub mod session;
pub mod registry;
pub mod membership;
pub mod router;
pub mod lifecycle;
pub mod dispatcher;

pub use dispatcher::{spawn_dispatcher, DispatcherHandle};
pub use lifecycle::ConnectionLifecycleHandler;
pub use membership::MembershipManager;
pub use registry::SessionRegistry;
