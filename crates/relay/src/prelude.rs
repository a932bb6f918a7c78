pub use crate::args::Args;
pub use crate::error::{ApiError, Error};

pub type Result<T> = std::result::Result<T, Error>;
