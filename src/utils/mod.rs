pub mod req_manager;

pub use req_manager::{ClientGuard, ReqManager, ReqManagerConfig};
