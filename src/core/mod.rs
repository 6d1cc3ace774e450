pub mod environment;
pub mod geometry;
pub mod quickterm;

pub use environment::WmKind;
pub use geometry::Placement;
pub use quickterm::{Quickterm, Status, ToggleAction, ToggleOutcome};
