use crate::geometry::Rect;

/// One detector hit, in model-input pixel coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub rect: Rect,
    pub label: String,
    /// Always within [0, 1].
    pub confidence: f32,
}

impl Detection {
    /// Confidence is clamped into [0, 1]; NaN becomes 0.
    pub fn new(rect: Rect, label: impl Into<String>, confidence: f32) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            rect,
            label: label.into(),
            confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_clamped() {
        let rect = Rect::new(0.0, 0.0, 1.0, 1.0);
        assert_eq!(Detection::new(rect, "a", 1.7).confidence, 1.0);
        assert_eq!(Detection::new(rect, "a", -0.2).confidence, 0.0);
        assert_eq!(Detection::new(rect, "a", f32::NAN).confidence, 0.0);
        assert_eq!(Detection::new(rect, "a", 0.42).confidence, 0.42);
    }
}
