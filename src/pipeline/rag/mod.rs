//! Clinical knowledge retrieval for the risk and omission stages.

pub mod types;
pub mod collection;
pub mod retrieval;

pub use types::*;
pub use collection::*;
pub use retrieval::*;
