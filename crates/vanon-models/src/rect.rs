use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A pixel-space rectangle believed to contain a face.
///
/// Produced and consumed within a single frame's processing; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FaceRect {
    /// X coordinate of the top-left corner
    pub x: i32,
    /// Y coordinate of the top-left corner
    pub y: i32,
    /// Width in pixels
    pub width: i32,
    /// Height in pixels
    pub height: i32,
}

impl FaceRect {
    /// Create a new rectangle.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Check if the rectangle has positive area.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Clamp the rectangle to a frame of the given size.
    ///
    /// Returns `None` if nothing of the rectangle remains inside the frame.
    pub fn clamped(&self, frame_width: i32, frame_height: i32) -> Option<FaceRect> {
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = (self.x + self.width).min(frame_width);
        let y1 = (self.y + self.height).min(frame_height);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some(FaceRect::new(x0, y0, x1 - x0, y1 - y0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_to_frame_bounds() {
        let rect = FaceRect::new(-10, 5, 50, 200);
        let clamped = rect.clamped(100, 100).unwrap();

        assert_eq!(clamped, FaceRect::new(0, 5, 40, 95));
    }

    #[test]
    fn fully_inside_is_unchanged() {
        let rect = FaceRect::new(10, 10, 20, 20);
        assert_eq!(rect.clamped(100, 100), Some(rect));
    }

    #[test]
    fn fully_outside_is_dropped() {
        let rect = FaceRect::new(200, 200, 30, 30);
        assert_eq!(rect.clamped(100, 100), None);

        let degenerate = FaceRect::new(10, 10, 0, 20);
        assert!(!degenerate.is_valid());
        assert_eq!(degenerate.clamped(100, 100), None);
    }
}
