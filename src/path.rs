pub type Point = (f64, f64);

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Segment {
    LineTo(Point),
    CubicTo { c1: Point, c2: Point, to: Point },
}

impl Segment {
    pub fn end(&self) -> Point {
        match *self {
            Segment::LineTo(to) => to,
            Segment::CubicTo { to, .. } => to,
        }
    }
}

pub fn cubic_point(p0: Point, p1: Point, p2: Point, p3: Point, t: f64) -> Point {
    let u = 1.0 - t;
    let tt = t * t;
    let uu = u * u;
    let uuu = uu * u;
    let ttt = tt * t;
    (
        uuu * p0.0 + 3.0 * uu * t * p1.0 + 3.0 * u * tt * p2.0 + ttt * p3.0,
        uuu * p0.1 + 3.0 * uu * t * p1.1 + 3.0 * u * tt * p2.1 + ttt * p3.1,
    )
}

pub fn signed_area(ring: &[Point]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for idx in 0..ring.len() {
        let (x0, y0) = ring[idx];
        let (x1, y1) = ring[(idx + 1) % ring.len()];
        sum += x0 * y1 - x1 * y0;
    }
    sum * 0.5
}

/// Closed outline of one piece in grid units. Positive shoelace area means
/// clockwise on screen, since y grows downward.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundaryPath {
    pub start: Point,
    pub segments: Vec<Segment>,
}

impl BoundaryPath {
    pub fn new(start: Point) -> Self {
        Self {
            start,
            segments: Vec::new(),
        }
    }

    /// Builds a closed polyline; `ring` must not repeat its first point.
    pub fn from_ring(ring: &[Point]) -> Option<Self> {
        let (&start, rest) = ring.split_first()?;
        let mut path = Self::new(start);
        path.segments
            .extend(rest.iter().map(|&point| Segment::LineTo(point)));
        path.segments.push(Segment::LineTo(start));
        Some(path)
    }

    pub fn extend(&mut self, segments: impl IntoIterator<Item = Segment>) {
        self.segments.extend(segments);
    }

    pub fn end(&self) -> Point {
        self.segments.last().map(Segment::end).unwrap_or(self.start)
    }

    pub fn is_closed(&self) -> bool {
        !self.segments.is_empty() && self.end() == self.start
    }

    /// Every point the curve can reach lies in the convex hull of these.
    pub fn control_points(&self) -> Vec<Point> {
        let mut points = Vec::with_capacity(self.segments.len() * 3 + 1);
        points.push(self.start);
        for segment in &self.segments {
            match *segment {
                Segment::LineTo(to) => points.push(to),
                Segment::CubicTo { c1, c2, to } => points.extend([c1, c2, to]),
            }
        }
        points
    }

    /// Polyline approximation without the closing duplicate of `start`.
    pub fn flatten(&self, steps: usize) -> Vec<Point> {
        let steps = steps.max(1);
        let mut points = vec![self.start];
        let mut current = self.start;
        for segment in &self.segments {
            match *segment {
                Segment::LineTo(to) => points.push(to),
                Segment::CubicTo { c1, c2, to } => {
                    for step in 1..=steps {
                        let t = step as f64 / steps as f64;
                        points.push(cubic_point(current, c1, c2, to, t));
                    }
                }
            }
            current = segment.end();
        }
        if points.len() > 1 && points.last() == Some(&self.start) {
            points.pop();
        }
        points
    }

    pub fn signed_area(&self, steps: usize) -> f64 {
        signed_area(&self.flatten(steps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> BoundaryPath {
        BoundaryPath::from_ring(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]).expect("ring")
    }

    #[test]
    fn ring_closes_on_start() {
        let square = unit_square();
        assert!(square.is_closed());
        assert_eq!(square.segments.len(), 4);
        assert_eq!(square.flatten(8).len(), 4);
    }

    #[test]
    fn clockwise_on_screen_has_positive_area() {
        assert!((unit_square().signed_area(1) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn cubic_endpoints_are_exact() {
        let p0 = (0.1, 0.2);
        let p3 = (0.9, 0.7);
        assert_eq!(cubic_point(p0, (0.3, 0.9), (0.6, -0.4), p3, 0.0), p0);
        assert_eq!(cubic_point(p0, (0.3, 0.9), (0.6, -0.4), p3, 1.0), p3);
    }
}
