//! Input primitives supplied by the external page parser.
//!
//! All coordinates are page units. After [`PageInput::to_top_left`] the origin is
//! the top-left corner with y growing downwards, which is what every stage
//! assumes.

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};

/// Bounding box with left, top, right, bottom coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub l: f64, // left (x_min)
    pub t: f64, // top (y_min)
    pub r: f64, // right (x_max)
    pub b: f64, // bottom (y_max)
}

impl BBox {
    /// Create a new bounding box
    #[inline]
    #[must_use = "returns a new BBox instance"]
    pub const fn new(l: f64, t: f64, r: f64, b: f64) -> Self {
        Self { l, t, r, b }
    }

    /// Bounding box from two corners given in any order
    #[inline]
    #[must_use = "returns a new BBox instance"]
    pub fn from_corners(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            l: x0.min(x1),
            t: y0.min(y1),
            r: x0.max(x1),
            b: y0.max(y1),
        }
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> f64 {
        (self.r - self.l).abs()
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> f64 {
        (self.b - self.t).abs()
    }

    /// Calculate area of the bounding box
    #[inline]
    #[must_use = "returns the bounding box area"]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Center point `(x, y)`
    #[inline]
    #[must_use = "returns the center point"]
    pub fn center(&self) -> (f64, f64) {
        ((self.l + self.r) / 2.0, (self.t + self.b) / 2.0)
    }

    /// Whether the point lies inside the box grown by `tolerance` on every side
    #[inline]
    #[must_use = "returns whether the point is contained"]
    pub fn contains_point(&self, x: f64, y: f64, tolerance: f64) -> bool {
        x >= self.l - tolerance
            && x <= self.r + tolerance
            && y >= self.t - tolerance
            && y <= self.b + tolerance
    }

    /// Distance from `(x, y)` to the top-left corner
    #[inline]
    #[must_use = "returns the distance to the top-left corner"]
    pub fn distance_to_top_left(&self, x: f64, y: f64) -> f64 {
        (x - self.l).hypot(y - self.t)
    }

    /// Smallest box containing both boxes
    #[inline]
    #[must_use = "returns the union bounding box"]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            l: self.l.min(other.l),
            t: self.t.min(other.t),
            r: self.r.max(other.r),
            b: self.b.max(other.b),
        }
    }

    #[inline]
    fn is_finite(&self) -> bool {
        self.l.is_finite() && self.t.is_finite() && self.r.is_finite() && self.b.is_finite()
    }
}

/// Direction of a ruling line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Horizontal => write!(f, "horizontal"),
            Self::Vertical => write!(f, "vertical"),
        }
    }
}

/// One stroke detected by the page parser.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    pub orientation: Orientation,
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    /// Source page (1-based). Filled in from the enclosing page when omitted.
    #[serde(default)]
    pub page: usize,
}

impl LineSegment {
    /// Horizontal segment at `y` from `x0` to `x1`
    #[must_use]
    pub const fn horizontal(y: f64, x0: f64, x1: f64) -> Self {
        Self {
            orientation: Orientation::Horizontal,
            x0,
            y0: y,
            x1,
            y1: y,
            page: 0,
        }
    }

    /// Vertical segment at `x` from `y0` to `y1`
    #[must_use]
    pub const fn vertical(x: f64, y0: f64, y1: f64) -> Self {
        Self {
            orientation: Orientation::Vertical,
            x0: x,
            y0,
            x1: x,
            y1,
            page: 0,
        }
    }

    /// Coordinate across the stroke: mean y for horizontal, mean x for vertical.
    #[inline]
    #[must_use]
    pub fn perpendicular(&self) -> f64 {
        match self.orientation {
            Orientation::Horizontal => (self.y0 + self.y1) / 2.0,
            Orientation::Vertical => (self.x0 + self.x1) / 2.0,
        }
    }

    /// How far the two endpoints disagree on the perpendicular coordinate.
    #[inline]
    #[must_use]
    pub fn skew(&self) -> f64 {
        match self.orientation {
            Orientation::Horizontal => (self.y0 - self.y1).abs(),
            Orientation::Vertical => (self.x0 - self.x1).abs(),
        }
    }

    /// `(start, end)` along the stroke, start <= end.
    #[inline]
    #[must_use]
    pub fn extent(&self) -> (f64, f64) {
        let (a, b) = match self.orientation {
            Orientation::Horizontal => (self.x0, self.x1),
            Orientation::Vertical => (self.y0, self.y1),
        };
        (a.min(b), a.max(b))
    }

    #[inline]
    #[must_use]
    pub fn length(&self) -> f64 {
        let (start, end) = self.extent();
        end - start
    }

    #[inline]
    fn is_finite(&self) -> bool {
        self.x0.is_finite() && self.y0.is_finite() && self.x1.is_finite() && self.y1.is_finite()
    }

    fn flipped(&self, height: f64) -> Self {
        Self {
            y0: height - self.y0,
            y1: height - self.y1,
            ..*self
        }
    }
}

/// Rectangle drawn on the page; its four edges act as ruling lines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    /// The rectangle's edges as segments: top, bottom, left, right.
    #[must_use]
    pub fn edges(&self, page: usize) -> [LineSegment; 4] {
        let bbox = BBox::from_corners(self.x0, self.y0, self.x1, self.y1);
        let mut edges = [
            LineSegment::horizontal(bbox.t, bbox.l, bbox.r),
            LineSegment::horizontal(bbox.b, bbox.l, bbox.r),
            LineSegment::vertical(bbox.l, bbox.t, bbox.b),
            LineSegment::vertical(bbox.r, bbox.t, bbox.b),
        ];
        for edge in &mut edges {
            edge.page = page;
        }
        edges
    }
}

/// Text run with its bounding box, as emitted by the page parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharFragment {
    pub text: String,
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl CharFragment {
    #[must_use]
    pub fn new(text: impl Into<String>, x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            text: text.into(),
            x0,
            y0,
            x1,
            y1,
        }
    }

    #[inline]
    #[must_use]
    pub fn bbox(&self) -> BBox {
        BBox::from_corners(self.x0, self.y0, self.x1, self.y1)
    }

    #[inline]
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        self.bbox().center()
    }
}

/// Where the page coordinate system has its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    /// y grows downwards (pdfplumber/pdfium text space)
    #[default]
    TopLeft,
    /// y grows upwards (raw PDF user space)
    BottomLeft,
}

/// Everything the page parser hands over for one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageInput {
    /// 1-based page number
    pub page_number: usize,
    pub width: f64,
    pub height: f64,
    pub origin: Origin,
    pub segments: Vec<LineSegment>,
    pub rects: Vec<Rect>,
    pub fragments: Vec<CharFragment>,
}

impl PageInput {
    /// Empty top-left page
    #[must_use]
    pub fn new(page_number: usize) -> Self {
        Self {
            page_number,
            ..Self::default()
        }
    }

    /// Validate coordinates and return a copy in top-left coordinates with rect
    /// edges folded into `segments` and every segment tagged with this page.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidGeometry`] for non-finite coordinates, or for a
    /// bottom-left page without a usable height.
    pub fn to_top_left(&self) -> Result<Self> {
        let page = self.page_number;

        if let Some(idx) = self.segments.iter().position(|s| !s.is_finite()) {
            return Err(GridError::geometry(
                page,
                format!("segment {idx} has non-finite coordinates"),
            ));
        }
        if let Some(idx) = self
            .rects
            .iter()
            .position(|r| !BBox::new(r.x0, r.y0, r.x1, r.y1).is_finite())
        {
            return Err(GridError::geometry(
                page,
                format!("rect {idx} has non-finite coordinates"),
            ));
        }
        if let Some(idx) = self.fragments.iter().position(|f| !f.bbox().is_finite()) {
            return Err(GridError::geometry(
                page,
                format!("fragment {idx} has non-finite coordinates"),
            ));
        }

        let mut segments: Vec<LineSegment> = self
            .segments
            .iter()
            .map(|s| LineSegment { page, ..*s })
            .chain(self.rects.iter().flat_map(|r| r.edges(page)))
            .collect();
        let mut fragments = self.fragments.clone();

        if self.origin == Origin::BottomLeft {
            let height = self.height;
            if !height.is_finite() || height <= 0.0 {
                return Err(GridError::geometry(
                    page,
                    format!("bottom-left page needs a positive height, got {height}"),
                ));
            }
            segments = segments.iter().map(|s| s.flipped(height)).collect();
            for fragment in &mut fragments {
                let (y0, y1) = (height - fragment.y1, height - fragment.y0);
                fragment.y0 = y0;
                fragment.y1 = y1;
            }
        }

        Ok(Self {
            page_number: page,
            width: self.width,
            height: self.height,
            origin: Origin::TopLeft,
            segments,
            rects: Vec::new(),
            fragments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_from_corners_normalizes() {
        let bbox = BBox::from_corners(10.0, 20.0, 0.0, 5.0);
        assert_eq!(bbox, BBox::new(0.0, 5.0, 10.0, 20.0));
        assert_eq!(bbox.area(), 150.0);
        assert_eq!(bbox.center(), (5.0, 12.5));
    }

    #[test]
    fn test_bbox_contains_point_with_tolerance() {
        let bbox = BBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(bbox.contains_point(10.0, 5.0, 0.0));
        assert!(!bbox.contains_point(10.5, 5.0, 0.0));
        assert!(bbox.contains_point(10.5, 5.0, 1.0));
    }

    #[test]
    fn test_segment_geometry() {
        let seg = LineSegment {
            orientation: Orientation::Horizontal,
            x0: 30.0,
            y0: 10.0,
            x1: 5.0,
            y1: 11.0,
            page: 1,
        };
        assert_eq!(seg.perpendicular(), 10.5);
        assert_eq!(seg.skew(), 1.0);
        assert_eq!(seg.extent(), (5.0, 30.0));
        assert_eq!(seg.length(), 25.0);

        let v = LineSegment::vertical(4.0, 9.0, 1.0);
        assert_eq!(v.perpendicular(), 4.0);
        assert_eq!(v.extent(), (1.0, 9.0));
    }

    #[test]
    fn test_rect_edges() {
        let rect = Rect {
            x0: 10.0,
            y0: 40.0,
            x1: 0.0,
            y1: 20.0,
        };
        let edges = rect.edges(2);
        let horizontal: Vec<f64> = edges
            .iter()
            .filter(|e| e.orientation == Orientation::Horizontal)
            .map(LineSegment::perpendicular)
            .collect();
        let vertical: Vec<f64> = edges
            .iter()
            .filter(|e| e.orientation == Orientation::Vertical)
            .map(LineSegment::perpendicular)
            .collect();
        assert_eq!(horizontal, vec![20.0, 40.0]);
        assert_eq!(vertical, vec![0.0, 10.0]);
        assert!(edges.iter().all(|e| e.page == 2));
    }

    #[test]
    fn test_to_top_left_flips_bottom_left_page() {
        let mut page = PageInput::new(1);
        page.height = 100.0;
        page.origin = Origin::BottomLeft;
        page.segments.push(LineSegment::horizontal(90.0, 0.0, 10.0));
        page.fragments
            .push(CharFragment::new("a", 1.0, 80.0, 5.0, 88.0));

        let normalized = page.to_top_left().unwrap();
        assert_eq!(normalized.origin, Origin::TopLeft);
        assert_eq!(normalized.segments[0].perpendicular(), 10.0);
        assert_eq!(normalized.segments[0].page, 1);
        let frag = &normalized.fragments[0];
        assert_eq!((frag.y0, frag.y1), (12.0, 20.0));
    }

    #[test]
    fn test_to_top_left_folds_rects_into_segments() {
        let mut page = PageInput::new(2);
        page.rects.push(Rect {
            x0: 0.0,
            y0: 0.0,
            x1: 10.0,
            y1: 10.0,
        });
        let normalized = page.to_top_left().unwrap();
        assert_eq!(normalized.segments.len(), 4);
        assert!(normalized.rects.is_empty());
    }

    #[test]
    fn test_to_top_left_rejects_non_finite() {
        let mut page = PageInput::new(7);
        page.segments.push(LineSegment::horizontal(f64::NAN, 0.0, 1.0));
        let err = page.to_top_left().unwrap_err();
        assert_eq!(err.page(), Some(7));

        let mut page = PageInput::new(8);
        page.fragments
            .push(CharFragment::new("x", 0.0, f64::INFINITY, 1.0, 1.0));
        assert!(page.to_top_left().is_err());
    }

    #[test]
    fn test_page_input_deserializes_with_defaults() {
        let json = r#"{
            "page_number": 3,
            "segments": [{"orientation": "vertical", "x0": 1, "y0": 0, "x1": 1, "y1": 9}],
            "fragments": [{"text": "hi", "x0": 0, "y0": 0, "x1": 2, "y1": 2}]
        }"#;
        let page: PageInput = serde_json::from_str(json).unwrap();
        assert_eq!(page.page_number, 3);
        assert_eq!(page.origin, Origin::TopLeft);
        assert_eq!(page.segments[0].orientation, Orientation::Vertical);
        assert_eq!(page.segments[0].page, 0);
        assert!(page.rects.is_empty());
    }
}
