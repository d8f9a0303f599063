//! Board workflow engine
//!
//! Every operation takes the connection it works on and, where a user acts,
//! an explicit [`Actor`](crate::models::Actor). Mutating operations run in a
//! single transaction: either everything they change lands, or nothing does.

pub mod error;
pub mod audit;
pub mod ordering;
pub mod assignment;
pub mod eligibility;
pub mod lifecycle;
pub mod view;

pub use error::*;
pub use audit::*;
pub use ordering::*;
pub use assignment::*;
pub use eligibility::*;
pub use lifecycle::*;
pub use view::*;

#[cfg(test)]
pub(crate) mod fixtures;
