use serde::Serialize;

use crate::config::Position;
use crate::ipc::Rect;

/// Gap left between the terminal and the bottom edge of the workspace
pub const BOTTOM_MARGIN: i32 = 6;

/// Final size and absolute position of the terminal window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub width: i32,
    pub height: i32,
    pub x: i32,
    pub y: i32,
}

impl Placement {
    /// Full workspace width, `ratio` of its height, attached to the chosen edge.
    pub fn compute(area: Rect, ratio: f64, position: Position) -> Self {
        let max_height = area.height.max(1);
        let height = ((f64::from(area.height) * ratio).floor() as i32).clamp(1, max_height);

        let y = match position {
            Position::Top => area.y,
            Position::Bottom => (area.y + area.height - height - BOTTOM_MARGIN).max(area.y),
        };

        Self {
            width: area.width,
            height,
            x: area.x,
            y,
        }
    }
}
