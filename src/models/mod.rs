pub mod common;
pub mod customer;
pub mod pagination;
pub mod reward;
pub mod sync;
pub mod tier;

pub use common::*;
pub use customer::*;
pub use pagination::*;
pub use reward::*;
pub use sync::*;
pub use tier::*;
