pub mod check;
pub mod contract;
pub mod distribution;
pub mod error;
pub mod handlers;
pub mod helpers;
pub mod host;
pub mod math;
pub mod msg;
pub mod oracle;
pub mod registry;
pub mod router;
pub mod state;

pub use handlers::{execute_handler, instantiate_handler, query_handler};
