pub mod aggregate;
pub mod context;
pub mod enums;
pub mod extracted;
pub mod lenient;
pub mod narrative;
pub mod omission;
pub mod risk;
pub mod temporal;

pub use aggregate::*;
pub use context::*;
pub use enums::*;
pub use extracted::*;
pub use narrative::*;
pub use omission::*;
pub use risk::*;
pub use temporal::*;
