//! Domain types exposed to the consuming application

pub mod state;
pub mod user;

pub use state::{AuthEvent, AuthState, AuthStatus};
pub use user::User;
