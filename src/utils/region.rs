use crate::utils::{Logical, Point, Rectangle};

/// Kind of a rectangle part of a region
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RectangleKind {
    /// This rectangle should be added to the region
    Add,
    /// The intersection of this rectangle with the region should
    /// be removed from the region
    Subtract,
}

/// Description of the contents of a region
///
/// A region is defined as an union and difference of rectangles.
///
/// This struct contains an ordered `Vec` containing the rectangles defining
/// a region. They should be added or subtracted in this order to compute the
/// actual contents of the region.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegionAttributes {
    /// List of rectangles part of this region
    pub rects: Vec<(RectangleKind, Rectangle<i32, Logical>)>,
}

impl RegionAttributes {
    /// Append a rectangle to the region
    pub fn add(&mut self, rect: Rectangle<i32, Logical>) {
        self.rects.push((RectangleKind::Add, rect));
    }

    /// Subtract a rectangle from the region
    pub fn subtract(&mut self, rect: Rectangle<i32, Logical>) {
        self.rects.push((RectangleKind::Subtract, rect));
    }

    /// Checks whether given point is inside the region
    pub fn contains<P: Into<Point<i32, Logical>>>(&self, point: P) -> bool {
        let point: Point<i32, Logical> = point.into();
        let mut contains = false;
        for (kind, rect) in &self.rects {
            if rect.contains(point) {
                match kind {
                    RectangleKind::Add => contains = true,
                    RectangleKind::Subtract => contains = false,
                }
            }
        }
        contains
    }

    /// Checks whether the region covers no point at all
    pub fn is_empty(&self) -> bool {
        // subtractions can only shrink the region, so any additive
        // rectangle with an actual area is enough to be non-empty
        let mut covered: Vec<Rectangle<i32, Logical>> = Vec::new();
        for (kind, rect) in &self.rects {
            match kind {
                RectangleKind::Add => {
                    if !rect.size.is_empty() {
                        covered.push(*rect);
                    }
                }
                RectangleKind::Subtract => {
                    covered = covered
                        .iter()
                        .flat_map(|r| subtract_rect(*r, *rect))
                        .collect();
                }
            }
        }
        covered.is_empty()
    }
}

fn subtract_rect(
    rect: Rectangle<i32, Logical>,
    hole: Rectangle<i32, Logical>,
) -> Vec<Rectangle<i32, Logical>> {
    let Some(overlap) = rect.intersection(hole) else {
        return vec![rect];
    };

    let mut out = Vec::new();
    // band above the hole
    if overlap.loc.y > rect.loc.y {
        out.push(Rectangle::from_extremities(
            rect.loc,
            (rect.loc.x + rect.size.w, overlap.loc.y),
        ));
    }
    // band below the hole
    if overlap.loc.y + overlap.size.h < rect.loc.y + rect.size.h {
        out.push(Rectangle::from_extremities(
            (rect.loc.x, overlap.loc.y + overlap.size.h),
            (rect.loc.x + rect.size.w, rect.loc.y + rect.size.h),
        ));
    }
    // left band
    if overlap.loc.x > rect.loc.x {
        out.push(Rectangle::from_extremities(
            (rect.loc.x, overlap.loc.y),
            (overlap.loc.x, overlap.loc.y + overlap.size.h),
        ));
    }
    // right band
    if overlap.loc.x + overlap.size.w < rect.loc.x + rect.size.w {
        out.push(Rectangle::from_extremities(
            (overlap.loc.x + overlap.size.w, overlap.loc.y),
            (rect.loc.x + rect.size.w, overlap.loc.y + overlap.size.h),
        ));
    }
    out.retain(|r| !r.size.is_empty());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_attributes() {
        let mut region = RegionAttributes::default();
        region.add(Rectangle::from_loc_and_size((0, 0), (10, 10)));

        assert!(region.contains((0, 0)));
        assert!(region.contains((5, 5)));
        assert!(!region.contains((10, 10)));

        region.subtract(Rectangle::from_loc_and_size((0, 0), (5, 5)));
        assert!(!region.contains((2, 2)));
        assert!(region.contains((5, 5)));

        region.add(Rectangle::from_loc_and_size((2, 2), (2, 2)));
        assert!(region.contains((2, 2)));
        assert!(region.contains((5, 5)));
    }

    #[test]
    fn region_emptiness() {
        let mut region = RegionAttributes::default();
        assert!(region.is_empty());

        region.add(Rectangle::from_loc_and_size((0, 0), (4, 4)));
        assert!(!region.is_empty());

        region.subtract(Rectangle::from_loc_and_size((0, 0), (4, 4)));
        assert!(region.is_empty());

        region.add(Rectangle::from_loc_and_size((1, 1), (1, 1)));
        assert!(!region.is_empty());
    }
}
