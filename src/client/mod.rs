// Session client
// Browser-side half of the login flow: redirect handling, session storage and route guard

pub mod api;
pub mod bootstrap;
pub mod error;
pub mod guard;
pub mod session;
pub mod store;

pub use api::ApiClient;
pub use bootstrap::{BootstrapOutcome, LoginState, Navigator, ScheduledRedirect, SessionBootstrap};
pub use error::ClientError;
pub use guard::{GuardDecision, PUBLIC_ROUTES};
pub use session::{SessionManager, User};
pub use store::{FileStore, MemoryStore, SessionStore};
