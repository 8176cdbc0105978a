//! The set of allowed edge directions and the sectors between them.

use std::f64::consts::{PI, TAU};

use smallvec::SmallVec;

use crate::error::{Result, SchematizeError};
use crate::geometry::{approx_eq, round};

/// The closed angular range between two consecutive directions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sector {
    /// Index of the lower bounding direction.
    pub idx:   usize,
    pub lower: f64,
    /// Upper bound; the last sector wraps past `2π`.
    pub upper: f64,
}

impl Sector {
    pub fn bounds(&self) -> [f64; 2] { [self.lower, self.upper] }

    /// Inclusive containment of `angle` (given in `[0, 2π)`).
    pub fn encloses(&self, angle: f64) -> bool {
        let within = |a: f64| round(a - self.lower) >= 0.0 && round(self.upper - a) >= 0.0;
        within(angle) || within(angle + TAU)
    }

    /// Angle of `angle` above the lower bound, in `[0, upper - lower]`.
    pub fn offset(&self, angle: f64) -> f64 {
        if angle < self.lower { angle + TAU - self.lower } else { angle - self.lower }
    }
}

/// An ordered set of directions in `[0, 2π)`.
#[derive(Clone, Debug, PartialEq)]
pub struct DirectionSet {
    angles:  Vec<f64>,
    sectors: Vec<Sector>,
}

impl DirectionSet {
    /// The `2n` directions `i·π/n`, i.e. `n` orientations.
    pub fn regular(n: usize) -> Result<Self> {
        if n < 2 {
            return Err(SchematizeError::Directions(format!("need at least 2 orientations, got {n}")));
        }
        Self::new((0..2 * n).map(|i| i as f64 * PI / n as f64).collect())
    }

    /// An explicit direction set.  Angles are normalized and sorted; every
    /// gap between consecutive directions must be smaller than `π`.
    pub fn new(mut angles: Vec<f64>) -> Result<Self> {
        if angles.iter().any(|a| !a.is_finite()) {
            return Err(SchematizeError::Directions("directions must be finite".into()));
        }
        for a in &mut angles {
            *a = a.rem_euclid(TAU);
        }
        angles.sort_by(f64::total_cmp);
        angles.dedup_by(|a, b| approx_eq(*a, *b));
        if angles.len() < 3 {
            return Err(SchematizeError::Directions(format!("need at least 3 directions, got {}", angles.len())));
        }

        let sectors: Vec<Sector> = (0..angles.len())
            .map(|i| {
                let upper = if i + 1 == angles.len() { angles[0] + TAU } else { angles[i + 1] };
                Sector { idx: i, lower: angles[i], upper }
            })
            .collect();
        if let Some(wide) = sectors.iter().find(|s| round(s.upper - s.lower - PI) >= 0.0) {
            return Err(SchematizeError::Directions(format!(
                "sector {} spans {} radians, at least π", wide.idx, wide.upper - wide.lower
            )));
        }
        Ok(Self { angles, sectors })
    }

    pub fn len(&self) -> usize { self.angles.len() }

    pub fn is_empty(&self) -> bool { self.angles.is_empty() }

    pub fn angle(&self, i: usize) -> f64 { self.angles[i] }

    pub fn angles(&self) -> &[f64] { &self.angles }

    pub fn sectors(&self) -> &[Sector] { &self.sectors }

    pub fn sector(&self, i: usize) -> &Sector { &self.sectors[i] }

    /// The sectors circularly before and after sector `i`.
    pub fn neighbors(&self, i: usize) -> (&Sector, &Sector) {
        let n = self.sectors.len();
        (&self.sectors[(i + n - 1) % n], &self.sectors[(i + 1) % n])
    }

    /// Next direction clockwise from `i`.
    pub fn cw(&self, i: usize) -> usize { (i + self.len() - 1) % self.len() }

    /// Next direction counter-clockwise from `i`.
    pub fn ccw(&self, i: usize) -> usize { (i + 1) % self.len() }

    /// Index of the direction `angle` coincides with, if any.
    pub fn aligned(&self, angle: f64) -> Option<usize> {
        self.angles.iter().position(|&d| approx_eq(angular_distance(d, angle), 0.0))
    }

    /// One sector for an unaligned angle, two for an aligned one.
    pub fn sectors_enclosing(&self, angle: f64) -> SmallVec<[&Sector; 2]> {
        self.sectors.iter().filter(|s| s.encloses(angle)).collect()
    }

    /// The first sector enclosing `angle`.
    pub fn sector_of(&self, angle: f64) -> &Sector {
        self.sectors.iter().find(|s| s.encloses(angle)).unwrap_or(&self.sectors[0])
    }

    /// The two directions bounding the sector of an unaligned angle.
    pub fn associated(&self, angle: f64) -> (usize, usize) {
        let sector = self.sector_of(angle);
        (sector.idx, self.ccw(sector.idx))
    }

    /// The direction closest to `angle`; ties go to the lower index.
    pub fn closest(&self, angle: f64) -> usize {
        let mut best = 0;
        for i in 1..self.len() {
            if round(angular_distance(self.angles[i], angle) - angular_distance(self.angles[best], angle)) < 0.0 {
                best = i;
            }
        }
        best
    }

    /// The direction closest to the reverse of direction `i`.
    pub fn opposite(&self, i: usize) -> usize {
        self.closest((self.angles[i] + PI).rem_euclid(TAU))
    }
}

/// Smallest angle between two directions, in `[0, π]`.
pub fn angular_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(TAU);
    d.min(TAU - d)
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    use super::*;

    #[test]
    fn regular_sets() {
        let c2 = DirectionSet::regular(2).unwrap();
        assert_eq!(c2.len(), 4);
        assert_eq!(c2.angle(2), PI);
        let c4 = DirectionSet::regular(4).unwrap();
        assert_eq!(c4.len(), 8);
        assert!(approx_eq(c4.angle(7), 7.0 * FRAC_PI_4));
    }

    #[test]
    fn sector_bounds_and_wrap() {
        let c2 = DirectionSet::regular(2).unwrap();
        let last = c2.sector(3);
        assert_eq!(last.bounds(), [1.5 * PI, TAU]);
        assert!(last.encloses(0.0));
        assert!(last.encloses(1.75 * PI));
        assert!(!last.encloses(FRAC_PI_4));
        assert!(c2.sector(0).encloses(FRAC_PI_2));
        assert_eq!(c2.sectors_enclosing(0.0).len(), 2);
        assert_eq!(c2.sectors_enclosing(0.3).len(), 1);
    }

    #[test]
    fn neighbors_wrap_around() {
        let c2 = DirectionSet::regular(2).unwrap();
        let (prev, next) = c2.neighbors(0);
        assert_eq!((prev.idx, next.idx), (3, 1));
        let (prev, next) = c2.neighbors(3);
        assert_eq!((prev.idx, next.idx), (2, 0));
    }

    #[test]
    fn alignment_and_association() {
        let c2 = DirectionSet::regular(2).unwrap();
        assert_eq!(c2.aligned(PI), Some(2));
        assert_eq!(c2.aligned(TAU - 1e-12), Some(0));
        assert_eq!(c2.aligned(1.0), None);
        assert_eq!(c2.associated(5.5), (3, 0));
        assert_eq!(c2.closest(0.3), 0);
        assert_eq!(c2.closest(5.0), 3);
        assert_eq!(c2.closest(5.5), 0);
        assert_eq!(c2.opposite(1), 3);
    }

    #[test]
    fn explicit_sets_are_validated() {
        let set = DirectionSet::new(vec![4.0, 0.0, 2.0, TAU]).unwrap();
        assert_eq!(set.angles(), &[0.0, 2.0, 4.0]);
        assert!(DirectionSet::new(vec![0.0, PI]).is_err());
        assert!(DirectionSet::new(vec![0.0, 0.5, 1.0]).is_err());
    }
}
