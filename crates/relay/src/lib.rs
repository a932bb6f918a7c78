pub mod args;
pub mod cors;
pub mod error;
pub mod prelude;
pub mod router;
pub mod shutdown;

pub use router::{build_router, AppState};
