//! Small numeric helpers shared by the layout and geometry code.

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Add for Vector2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vector2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vector2 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis aligned rectangle in pixels, y grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, point: Vector2) -> bool {
        self.x <= point.x
            && point.x <= self.x + self.width
            && self.y <= point.y
            && point.y <= self.y + self.height
    }

    pub fn center(&self) -> Vector2 {
        Vector2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

pub fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

/// Where `value` lies between `from` and `to`, as a ratio.
///
/// Returns NaN for an empty range; callers check their spans first.
pub fn inverse_lerp(from: f64, to: f64, value: f64) -> f64 {
    (value - from) / (to - from)
}

pub fn approximately(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

/// Clamp a value coming from user input. Non-finite becomes zero first.
///
/// ```
/// use note_editor::primitives::math::verify_number;
///
/// assert_eq!(verify_number(f64::NAN, -1.0, 1.0), 0.0);
/// assert_eq!(verify_number(5.0, 0.0, 2.0), 2.0);
/// ```
pub fn verify_number(value: f64, min: f64, max: f64) -> f64 {
    let value = if value.is_finite() { value } else { 0.0 };
    value.max(min).min(max)
}

/// Sign of the cross product of `a - b` and `a - p`.
fn exterior_product(a: Vector2, b: Vector2, p: Vector2) -> f64 {
    let ab = a - b;
    let pa = a - p;
    ab.x * pa.y - pa.x * ab.y
}

/// Whether `p` lies inside the quad `a b c d`.
///
/// The corners go bottom-left, top-left, top-right, bottom-right in
/// screen space.
pub fn is_in_square(
    a: Vector2,
    b: Vector2,
    c: Vector2,
    d: Vector2,
    p: Vector2,
) -> bool {
    exterior_product(a, b, p) > 0.0
        && exterior_product(b, c, p) > 0.0
        && exterior_product(c, d, p) > 0.0
        && exterior_product(d, a, p) > 0.0
}

pub fn quadratic_bezier(
    t: f64,
    p1: Vector2,
    p2: Vector2,
    p3: Vector2,
) -> Vector2 {
    let u = 1.0 - t;
    p1 * (u * u) + p2 * (2.0 * u * t) + p3 * (t * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerps() {
        assert_eq!(lerp(2.0, 4.0, 0.5), 3.0);
        assert_eq!(inverse_lerp(2.0, 4.0, 3.0), 0.5);
        assert!(inverse_lerp(1.0, 1.0, 1.0).is_nan());
        assert!(approximately(0.1 + 0.2, 0.3, 1e-9));
    }

    #[test]
    fn square() {
        let a = Vector2::new(0.0, 10.0);
        let b = Vector2::new(0.0, 0.0);
        let c = Vector2::new(10.0, 0.0);
        let d = Vector2::new(10.0, 10.0);
        assert!(is_in_square(a, b, c, d, Vector2::new(5.0, 5.0)));
        assert!(!is_in_square(a, b, c, d, Vector2::new(15.0, 5.0)));
        assert!(!is_in_square(a, b, c, d, Vector2::new(5.0, -1.0)));
    }

    #[test]
    fn bezier_ends() {
        let p1 = Vector2::new(0.0, 0.0);
        let p2 = Vector2::new(1.0, 0.5);
        let p3 = Vector2::new(0.5, 1.0);
        assert_eq!(quadratic_bezier(0.0, p1, p2, p3), p1);
        assert_eq!(quadratic_bezier(1.0, p1, p2, p3), p3);
    }

    #[test]
    fn rect() {
        let r = Rect::new(0.0, 0.0, 10.0, 4.0);
        assert!(r.contains(Vector2::new(10.0, 4.0)));
        assert!(!r.contains(Vector2::new(10.1, 4.0)));
        assert_eq!(r.center(), Vector2::new(5.0, 2.0));
    }
}
