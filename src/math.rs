use std::ops::{Add, Mul, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub const BOTH: [Axis; 2] = [Axis::X, Axis::Y];
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn get(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }

    #[inline]
    pub fn set(&mut self, axis: Axis, value: f32) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
        }
    }
}

impl From<(f32, f32)> for Vector2 {
    fn from(value: (f32, f32)) -> Self {
        Self::new(value.0, value.1)
    }
}

impl Add for Vector2 {
    type Output = Vector2;

    fn add(self, rhs: Self) -> Self::Output {
        Vector2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vector2 {
    type Output = Vector2;

    fn sub(self, rhs: Self) -> Self::Output {
        Vector2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vector2 {
    type Output = Vector2;

    fn mul(self, rhs: f32) -> Self::Output {
        Vector2::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis-aligned rectangle stored as min/max corners.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct Rect {
    pub min: Vector2,
    pub max: Vector2,
}

impl Rect {
    pub const fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min: Vector2::new(min_x, min_y),
            max: Vector2::new(max_x, max_y),
        }
    }

    pub fn from_min_dim(min: Vector2, dim: Vector2) -> Self {
        Self { min, max: min + dim }
    }

    #[inline]
    pub fn dim(&self) -> Vector2 {
        self.max - self.min
    }

    #[inline]
    pub fn has_area(&self) -> bool {
        let dim = self.dim();
        dim.x > 0.0 && dim.y > 0.0
    }

    /// Inclusive on every edge.
    #[inline]
    pub fn contains(&self, p: Vector2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn closest_point(&self, p: Vector2) -> Vector2 {
        Vector2::new(
            p.x.clamp(self.min.x, self.max.x.max(self.min.x)),
            p.y.clamp(self.min.y, self.max.y.max(self.min.y)),
        )
    }

    /// The region covered by both rects, which is how clip rects combine. Disjoint
    /// rects give the zero rect rather than a negative extent.
    pub fn union(&self, other: &Rect) -> Rect {
        let result = Rect {
            min: Vector2::new(self.min.x.max(other.min.x), self.min.y.max(other.min.y)),
            max: Vector2::new(self.max.x.min(other.max.x), self.max.y.min(other.max.y)),
        };
        let dim = result.dim();
        if dim.x < 0.0 || dim.y < 0.0 {
            return Rect::default();
        }
        result
    }

    pub fn expand(&mut self, left: f32, top: f32, right: f32, bottom: f32) {
        self.min.x -= left;
        self.min.y -= top;
        self.max.x += right;
        self.max.y += bottom;
    }

    pub fn translate(&self, by: Vector2) -> Rect {
        Rect {
            min: self.min + by,
            max: self.max + by,
        }
    }

    /// Collapses an axis whose max fell below its min onto the midpoint.
    pub fn collapse_inverted(mut self) -> Rect {
        if self.max.x < self.min.x {
            let avg = (self.max.x + self.min.x) / 2.0;
            self.min.x = avg;
            self.max.x = avg;
        }
        if self.max.y < self.min.y {
            let avg = (self.max.y + self.min.y) / 2.0;
            self.min.y = avg;
            self.max.y = avg;
        }
        self
    }
}

/// Clips `bounds` to `clip` and moves the matching `uv` rect by the same proportions.
/// Returns `None` when nothing of `bounds` remains visible.
pub fn clip_rect_and_uv(clip: &Rect, bounds: &Rect, uv: &Rect) -> Option<(Rect, Rect)> {
    let clipped = Rect {
        min: clip.closest_point(bounds.min),
        max: clip.closest_point(bounds.max),
    };
    let uv_clipped = Rect {
        min: remap_v2(clipped.min, bounds.min, bounds.max, uv.min, uv.max),
        max: remap_v2(clipped.max, bounds.min, bounds.max, uv.min, uv.max),
    };
    clipped.has_area().then_some((clipped, uv_clipped))
}

/// Maps `v` from `[old_min, old_max]` onto `[new_min, new_max]` without clamping.
pub fn remap(v: f32, old_min: f32, old_max: f32, new_min: f32, new_max: f32) -> f32 {
    let range = old_max - old_min;
    if range == 0.0 {
        return new_min;
    }
    let pct = (v - old_min) / range;
    pct * (new_max - new_min) + new_min
}

pub fn remap_v2(v: Vector2, old_min: Vector2, old_max: Vector2, new_min: Vector2, new_max: Vector2) -> Vector2 {
    Vector2::new(
        remap(v.x, old_min.x, old_max.x, new_min.x, new_max.x),
        remap(v.y, old_min.y, old_max.y, new_min.y, new_max.y),
    )
}

#[inline]
pub fn is_pow2(v: u32) -> bool {
    v.is_power_of_two()
}

/// Smallest power of two that is `>= v`, with 0 mapping to 1.
#[inline]
pub fn round_to_pow2(v: u32) -> u32 {
    v.max(1).next_power_of_two()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn vectors() {
        let a = Vector2::new(25.0, 32.1);
        let b = Vector2::new(19.0, 18.1);
        let sum = a + b;
        assert!(close(sum.x, 44.0) && close(sum.y, 50.2));
        let diff = a - b;
        assert!(close(diff.x, 6.0) && close(diff.y, 14.0));
        let scaled = a * 2.0;
        assert!(close(scaled.x, 50.0) && close(scaled.y, 64.2));
    }

    #[test]
    fn rect_union_overlaps_and_degenerates() {
        let r0 = Rect::new(0.0, 0.0, 100.0, 100.0);
        let r1 = Rect::new(50.0, 50.0, 150.0, 150.0);
        let r2 = Rect::new(-50.0, -50.0, 50.0, 50.0);
        let r3 = Rect::new(-250.0, -250.0, -200.0, -200.0);
        let r4 = Rect::new(250.0, 250.0, 200.0, 200.0);
        let r5 = Rect::new(-50.0, -50.0, 200.0, 200.0);

        assert_eq!(r0.union(&r1), Rect::new(50.0, 50.0, 100.0, 100.0));
        assert_eq!(r0.union(&r2), Rect::new(0.0, 0.0, 50.0, 50.0));
        assert_eq!(r0.union(&r3), Rect::default());
        assert_eq!(r0.union(&r4), Rect::default());
        assert_eq!(r0.union(&r5), r0);
    }

    #[test]
    fn rect_contains_is_inclusive() {
        let r = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(r.contains(Vector2::new(25.0, 25.0)));
        assert!(r.contains(Vector2::new(100.0, 0.0)));
        assert!(!r.contains(Vector2::new(150.0, 150.0)));
        assert!(!r.contains(Vector2::new(-25.0, -25.0)));
    }

    #[test]
    fn clip_moves_uvs_proportionally() {
        let clip = Rect::new(5.0, 5.0, 10.0, 10.0);

        let (bounds, uv) = clip_rect_and_uv(
            &clip,
            &Rect::new(0.0, 0.0, 10.0, 10.0),
            &Rect::new(0.0, 0.0, 1.0, 1.0),
        )
        .unwrap();
        assert_eq!(bounds, Rect::new(5.0, 5.0, 10.0, 10.0));
        assert!(close(uv.min.x, 0.5) && close(uv.min.y, 0.5));
        assert!(close(uv.max.x, 1.0) && close(uv.max.y, 1.0));

        let (bounds, uv) = clip_rect_and_uv(
            &clip,
            &Rect::new(8.0, 8.0, 12.0, 12.0),
            &Rect::new(0.5, 0.4, 0.7, 0.6),
        )
        .unwrap();
        assert_eq!(bounds, Rect::new(8.0, 8.0, 10.0, 10.0));
        assert!(close(uv.min.x, 0.5) && close(uv.min.y, 0.4));
        assert!(close(uv.max.x, 0.6) && close(uv.max.y, 0.5));

        let outside = clip_rect_and_uv(
            &clip,
            &Rect::new(20.0, 20.0, 30.0, 30.0),
            &Rect::new(0.0, 0.0, 1.0, 1.0),
        );
        assert!(outside.is_none());
    }

    #[test]
    fn inverted_rects_collapse_to_midpoint() {
        let r = Rect::new(10.0, 0.0, 4.0, 8.0).collapse_inverted();
        assert_eq!(r, Rect::new(7.0, 0.0, 7.0, 8.0));
    }

    #[test]
    fn scalar_helpers() {
        assert!(is_pow2(2048));
        assert!(!is_pow2(1920));
        assert_eq!(round_to_pow2(1000), 1024);
        assert_eq!(round_to_pow2(0), 1);
        assert_eq!(remap(2.0, 1.5, 2.5, 5.0, 6.0), 5.5);
        assert_eq!(remap(1.0, 1.5, 2.5, 5.0, 6.0), 4.5);
        assert_eq!(remap(3.0, 1.5, 2.5, 5.0, 6.0), 6.5);
    }
}
