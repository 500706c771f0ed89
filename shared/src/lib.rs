pub mod locations;
pub mod models;

pub use models::*;
