pub mod shopify;

pub use shopify::*;
