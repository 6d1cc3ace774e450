//! i3/Sway command strings.

use std::fmt;

use crate::core::geometry::Placement;

/// Container selector prefixed to a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criteria {
    Mark(String),
    ConId(i64),
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // con_mark is a regex on the window manager side
            Criteria::Mark(mark) => write!(f, "[con_mark=\"^{}$\"]", regex::escape(mark)),
            Criteria::ConId(id) => write!(f, "[con_id={id}]"),
        }
    }
}

pub fn mark(mark: &str) -> String {
    format!("mark --replace {mark}")
}

pub fn move_back(criteria: &Criteria) -> String {
    format!("{criteria} floating enable, move scratchpad")
}

pub fn pop(criteria: &Criteria, placement: &Placement) -> String {
    format!(
        "{criteria} move scratchpad, scratchpad show, resize set {} px {} px, move absolute position {} px {} px",
        placement.width, placement.height, placement.x, placement.y
    )
}
