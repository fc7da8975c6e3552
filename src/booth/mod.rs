pub mod error;
pub mod flow;
pub mod session;
pub mod traits;
