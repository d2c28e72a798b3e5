pub mod handler;
pub mod repository;

pub use handler::*;
pub use repository::*;
