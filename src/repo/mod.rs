pub mod project;
pub mod board;
pub mod stage;
pub mod user;
pub mod group;
pub mod ticket;
pub mod history;

pub use project::*;
pub use board::*;
pub use stage::*;
pub use user::*;
pub use group::*;
pub use ticket::*;
pub use history::*;
