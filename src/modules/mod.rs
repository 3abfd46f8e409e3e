pub mod dish;
pub mod purchase;

mod router;
pub use router::get_router;
