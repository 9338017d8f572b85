mod gateway_client;
mod logger;

pub use gateway_client::*;
pub use logger::*;
