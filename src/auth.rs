//! Bearer credential model, password-grant exchange, and the single-flight credential cache.

pub mod cache;
pub mod credential;
pub mod secret;

mod grant;

pub use cache::*;
pub use credential::*;
pub use secret::*;
