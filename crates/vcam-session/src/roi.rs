//! Rectangular capture regions with binning.

use serde::{Deserialize, Serialize};
use vcam_core::{CamResult, CameraError, RegionDescriptor};

/// One rectangular sensor sub-region with binning factors.
///
/// All bounds are inclusive. On construction the end coordinates are clipped
/// downward so that the span on each axis is an exact multiple of the binning
/// factor; partially binned trailing pixels are dropped, never rounded up.
/// A span smaller than its binning factor would clip to nothing and is
/// rejected instead. The clip is idempotent: rebuilding a region from its
/// clipped bounds with the same binning yields the same bounds.
///
/// Equality compares the footprint `(s1, s2, p1, p2)` only; binning factors
/// are excluded. Two same-footprint regions with different binning compare
/// equal, which is what the ROI-list replace-vs-append decision relies on.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RegionOfInterest {
    s1: u16,
    s2: u16,
    sbin: u16,
    p1: u16,
    p2: u16,
    pbin: u16,
}

impl Default for RegionOfInterest {
    /// A 1x1 unbinned region at the origin, the closed-session placeholder.
    fn default() -> Self {
        RegionOfInterest {
            s1: 0,
            s2: 0,
            sbin: 1,
            p1: 0,
            p2: 0,
            pbin: 1,
        }
    }
}

impl PartialEq for RegionOfInterest {
    fn eq(&self, other: &Self) -> bool {
        self.s1 == other.s1 && self.s2 == other.s2 && self.p1 == other.p1 && self.p2 == other.p2
    }
}

impl Eq for RegionOfInterest {}

impl RegionOfInterest {
    /// Validates geometry and clips trailing pixels to the binning factors.
    pub fn new(s1: u16, s2: u16, sbin: u16, p1: u16, p2: u16, pbin: u16) -> CamResult<Self> {
        if s1 > s2 {
            return Err(CameraError::invalid_value(
                "serial coordinates",
                format!("s1={s1}, s2={s2}"),
                "s1 <= s2",
            ));
        }
        if p1 > p2 {
            return Err(CameraError::invalid_value(
                "parallel coordinates",
                format!("p1={p1}, p2={p2}"),
                "p1 <= p2",
            ));
        }
        if sbin < 1 || pbin < 1 {
            return Err(CameraError::invalid_value(
                "binning",
                format!("({sbin}, {pbin})"),
                "factors >= 1",
            ));
        }
        // Spans are computed in u32: a full-axis span (65536) does not fit
        // in u16, and a span below the binning factor must not underflow the
        // clip; it holds zero binned pixels, which no capture can use.
        let s_span = u32::from(s2 - s1) + 1;
        let p_span = u32::from(p2 - p1) + 1;
        if s_span < u32::from(sbin) || p_span < u32::from(pbin) {
            return Err(CameraError::invalid_value(
                "region span",
                format!("{s_span}x{p_span}"),
                format!("at least one binned pixel at binning ({sbin}, {pbin})"),
            ));
        }
        Ok(RegionOfInterest {
            s1,
            s2: s2 - (s_span % u32::from(sbin)) as u16,
            sbin,
            p1,
            p2: p2 - (p_span % u32::from(pbin)) as u16,
            pbin,
        })
    }

    pub fn s1(&self) -> u16 {
        self.s1
    }

    pub fn s2(&self) -> u16 {
        self.s2
    }

    pub fn sbin(&self) -> u16 {
        self.sbin
    }

    pub fn p1(&self) -> u16 {
        self.p1
    }

    pub fn p2(&self) -> u16 {
        self.p2
    }

    pub fn pbin(&self) -> u16 {
        self.pbin
    }

    /// Binned output dimensions `(columns, rows)`. Always integral thanks to
    /// the construction-time clip.
    pub fn shape(&self) -> (u32, u32) {
        (
            (u32::from(self.s2 - self.s1) + 1) / u32::from(self.sbin),
            (u32::from(self.p2 - self.p1) + 1) / u32::from(self.pbin),
        )
    }

    /// Closed-interval intersection on both axes. Touching edges count as
    /// overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        !(self.s2 < other.s1
            || other.s2 < self.s1
            || self.p2 < other.p1
            || other.p2 < self.p1)
    }

    /// Rebuilds this region with new binning factors, re-clipping the end
    /// coordinates so the shape stays integral.
    pub fn with_binning(&self, sbin: u16, pbin: u16) -> CamResult<Self> {
        RegionOfInterest::new(self.s1, self.s2, sbin, self.p1, self.p2, pbin)
    }

    /// Wire representation for acquisition setup and region-typed parameters.
    pub fn descriptor(&self) -> RegionDescriptor {
        RegionDescriptor {
            s1: self.s1,
            s2: self.s2,
            sbin: self.sbin,
            p1: self.p1,
            p2: self.p2,
            pbin: self.pbin,
        }
    }
}

impl From<RegionDescriptor> for RegionOfInterest {
    fn from(d: RegionDescriptor) -> Self {
        RegionOfInterest {
            s1: d.s1,
            s2: d.s2,
            sbin: d.sbin.max(1),
            p1: d.p1,
            p2: d.p2,
            pbin: d.pbin.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clips_partially_binned_pixels_downward() {
        // 10 columns at sbin=3 leaves 9; 10 rows at pbin=4 leaves 8.
        let roi = RegionOfInterest::new(0, 9, 3, 0, 9, 4).unwrap();
        assert_eq!(roi.s2(), 8);
        assert_eq!(roi.p2(), 7);
        assert_eq!(roi.shape(), (3, 2));
    }

    #[test]
    fn clipping_is_idempotent() {
        let roi = RegionOfInterest::new(5, 104, 3, 7, 83, 5).unwrap();
        let again =
            RegionOfInterest::new(roi.s1(), roi.s2(), roi.sbin(), roi.p1(), roi.p2(), roi.pbin())
                .unwrap();
        assert_eq!(roi.s2(), again.s2());
        assert_eq!(roi.p2(), again.p2());
        assert_eq!((roi.s2() - roi.s1() + 1) % roi.sbin(), 0);
        assert_eq!((roi.p2() - roi.p1() + 1) % roi.pbin(), 0);
    }

    #[test]
    fn rejects_inverted_bounds_and_zero_binning() {
        assert!(RegionOfInterest::new(10, 5, 1, 0, 5, 1).is_err());
        assert!(RegionOfInterest::new(0, 5, 1, 10, 5, 1).is_err());
        assert!(RegionOfInterest::new(0, 5, 0, 0, 5, 1).is_err());
        assert!(RegionOfInterest::new(0, 5, 1, 0, 5, 0).is_err());
    }

    #[test]
    fn overlap_is_symmetric_and_counts_touching_edges() {
        let a = RegionOfInterest::new(0, 99, 1, 0, 99, 1).unwrap();
        let b = RegionOfInterest::new(99, 150, 1, 99, 150, 1).unwrap();
        let c = RegionOfInterest::new(100, 150, 1, 100, 150, 1).unwrap();
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn rejects_spans_smaller_than_the_binning_factor() {
        assert!(RegionOfInterest::new(0, 1, 4, 0, 7, 1).is_err());
        assert!(RegionOfInterest::new(0, 7, 1, 0, 1, 4).is_err());
        let narrow = RegionOfInterest::new(0, 1, 1, 0, 1, 1).unwrap();
        assert!(narrow.with_binning(4, 4).is_err());
        // Exactly one binned pixel is the smallest legal region.
        let one = RegionOfInterest::new(3, 6, 4, 3, 6, 4).unwrap();
        assert_eq!(one.shape(), (1, 1));
    }

    #[test]
    fn full_axis_span_does_not_overflow() {
        let roi = RegionOfInterest::new(0, u16::MAX, 3, 0, u16::MAX, 1).unwrap();
        assert_eq!(roi.s2(), u16::MAX - 1);
        assert_eq!(roi.shape(), (21_845, 65_536));
    }

    #[test]
    fn equality_ignores_binning_factors() {
        // Documented footprint-only comparison; binning differences do not
        // make two regions distinct.
        let a = RegionOfInterest::new(0, 99, 1, 0, 99, 1).unwrap();
        let b = RegionOfInterest::new(0, 99, 2, 0, 99, 2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rebinning_reclips() {
        let roi = RegionOfInterest::new(0, 99, 1, 0, 99, 1).unwrap();
        let rebinned = roi.with_binning(3, 3).unwrap();
        assert_eq!(rebinned.s2(), 98);
        assert_eq!(rebinned.shape(), (33, 33));
    }
}
