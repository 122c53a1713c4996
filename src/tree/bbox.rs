//! Axis-aligned square bounding boxes and the quadrant split used to subdivide them.

use crate::vector::Vector2;

/// A node's axis-aligned bounding box, kept square by construction so that [`BoundingBox::width`]
/// alone describes its size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub(crate) min: Vector2,
    pub(crate) max: Vector2,
}

impl BoundingBox {
    /// Creates a new bounding box from its corners.
    pub fn new(min: Vector2, max: Vector2) -> Self {
        Self { min, max }
    }

    /// Lower corner.
    pub fn min(&self) -> Vector2 {
        self.min
    }

    /// Upper corner.
    pub fn max(&self) -> Vector2 {
        self.max
    }

    /// Center of the box.
    pub fn center(&self) -> Vector2 {
        self.min + (self.max - self.min) * 0.5
    }

    /// Width of the box (the x-extent; the box is square).
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Whether `position` lies within the box, inclusive of the boundary.
    pub fn contains(&self, position: Vector2) -> bool {
        position.x >= self.min.x
            && position.x <= self.max.x
            && position.y >= self.min.y
            && position.y <= self.max.y
    }

    /// Which [`Quadrant`] of this box `position` falls into.
    ///
    /// Points lying exactly on a center line are assigned to the lower-indexed quadrant; the
    /// ambiguity is measure-zero and is resolved by further subdivision.
    pub fn quadrant(&self, position: Vector2) -> Quadrant {
        let center = self.center();
        match (position.x <= center.x, position.y <= center.y) {
            (true, true) => Quadrant::Sw,
            (true, false) => Quadrant::Nw,
            (false, false) => Quadrant::Ne,
            (false, true) => Quadrant::Se,
        }
    }

    /// Bounding box of a single quadrant of this box.
    pub fn child(&self, quadrant: Quadrant) -> BoundingBox {
        let center = self.center();
        match quadrant {
            Quadrant::Sw => BoundingBox::new(self.min, center),
            Quadrant::Nw => BoundingBox::new(
                Vector2::new(self.min.x, center.y),
                Vector2::new(center.x, self.max.y),
            ),
            Quadrant::Ne => BoundingBox::new(center, self.max),
            Quadrant::Se => BoundingBox::new(
                Vector2::new(center.x, self.min.y),
                Vector2::new(self.max.x, center.y),
            ),
        }
    }
}

/// The four quadrants of a [`BoundingBox`], in the order the arena stores child slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quadrant {
    /// North-east.
    Ne,
    /// North-west.
    Nw,
    /// South-west.
    Sw,
    /// South-east.
    Se,
}

impl Quadrant {
    /// All four quadrants, in the arena's child-slot order.
    pub const ALL: [Quadrant; 4] = [Quadrant::Ne, Quadrant::Nw, Quadrant::Sw, Quadrant::Se];

    /// Index of this quadrant into a node's `[Option<NodeId>; 4]` child array.
    pub fn index(self) -> usize {
        match self {
            Quadrant::Ne => 0,
            Quadrant::Nw => 1,
            Quadrant::Sw => 2,
            Quadrant::Se => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadrant_split_is_exhaustive() {
        let bbox = BoundingBox::new(Vector2::new(-1.0, -1.0), Vector2::new(1.0, 1.0));

        assert_eq!(bbox.quadrant(Vector2::new(0.5, 0.5)), Quadrant::Ne);
        assert_eq!(bbox.quadrant(Vector2::new(-0.5, 0.5)), Quadrant::Nw);
        assert_eq!(bbox.quadrant(Vector2::new(-0.5, -0.5)), Quadrant::Sw);
        assert_eq!(bbox.quadrant(Vector2::new(0.5, -0.5)), Quadrant::Se);
    }

    #[test]
    fn child_boxes_tile_the_parent() {
        let bbox = BoundingBox::new(Vector2::new(0.0, 0.0), Vector2::new(4.0, 4.0));
        for q in Quadrant::ALL {
            let child = bbox.child(q);
            assert_eq!(child.width(), bbox.width() / 2.0);
            assert!(bbox.contains(child.min()) && bbox.contains(child.max()));
        }
    }
}
