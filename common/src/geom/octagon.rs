use super::int_box::IntBox;
use super::line::Line;
use super::point::{FloatPoint, IntPoint};

/// Integer octagon bounded by axis lines and the two diagonal directions.
///
/// Points satisfy `lx <= x <= rx`, `ly <= y <= uy`, `ulx <= x - y <= lrx`
/// and `llx <= x + y <= urx`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IntOctagon {
    pub lx: i64,
    pub ly: i64,
    pub rx: i64,
    pub uy: i64,
    pub ulx: i64,
    pub lrx: i64,
    pub llx: i64,
    pub urx: i64,
}

const FAR: i64 = i64::MAX / 8;

impl IntOctagon {
    pub const EMPTY: IntOctagon = IntOctagon {
        lx: FAR,
        ly: FAR,
        rx: -FAR,
        uy: -FAR,
        ulx: FAR,
        lrx: -FAR,
        llx: FAR,
        urx: -FAR,
    };

    #[allow(clippy::too_many_arguments)]
    pub fn new(lx: i64, ly: i64, rx: i64, uy: i64, ulx: i64, lrx: i64, llx: i64, urx: i64) -> Self {
        IntOctagon { lx, ly, rx, uy, ulx, lrx, llx, urx }.normalize()
    }

    pub fn from_box(b: &IntBox) -> Self {
        if b.is_empty() {
            return Self::EMPTY;
        }
        IntOctagon {
            lx: b.ll.x,
            ly: b.ll.y,
            rx: b.ur.x,
            uy: b.ur.y,
            ulx: b.ll.x - b.ur.y,
            lrx: b.ur.x - b.ll.y,
            llx: b.ll.x + b.ll.y,
            urx: b.ur.x + b.ur.y,
        }
    }

    /// Smallest integer octagon containing all `points`.
    pub fn bounding(points: &[FloatPoint]) -> Self {
        if points.is_empty() {
            return Self::EMPTY;
        }
        let mut o = IntOctagon {
            lx: FAR,
            ly: FAR,
            rx: -FAR,
            uy: -FAR,
            ulx: FAR,
            lrx: -FAR,
            llx: FAR,
            urx: -FAR,
        };
        for p in points {
            o.lx = o.lx.min(p.x.floor() as i64);
            o.ly = o.ly.min(p.y.floor() as i64);
            o.rx = o.rx.max(p.x.ceil() as i64);
            o.uy = o.uy.max(p.y.ceil() as i64);
            let diff = p.x - p.y;
            let sum = p.x + p.y;
            o.ulx = o.ulx.min(diff.floor() as i64);
            o.lrx = o.lrx.max(diff.ceil() as i64);
            o.llx = o.llx.min(sum.floor() as i64);
            o.urx = o.urx.max(sum.ceil() as i64);
        }
        o.normalize()
    }

    /// Tightens all eight bounds against each other.
    pub fn normalize(mut self) -> Self {
        for _ in 0..2 {
            if self.is_empty() {
                return Self::EMPTY;
            }
            self.lx = self.lx.max(self.llx - self.uy).max(self.ulx + self.ly);
            self.rx = self.rx.min(self.urx - self.ly).min(self.lrx + self.uy);
            self.ly = self.ly.max(self.llx - self.rx).max(self.lx - self.lrx);
            self.uy = self.uy.min(self.urx - self.lx).min(self.rx - self.ulx);
            self.ulx = self.ulx.max(self.lx - self.uy);
            self.lrx = self.lrx.min(self.rx - self.ly);
            self.llx = self.llx.max(self.lx + self.ly);
            self.urx = self.urx.min(self.rx + self.uy);
        }
        if self.is_empty() { Self::EMPTY } else { self }
    }

    pub fn is_empty(&self) -> bool {
        self.lx > self.rx || self.ly > self.uy || self.ulx > self.lrx || self.llx > self.urx
    }

    pub fn bounding_box(&self) -> IntBox {
        if self.is_empty() {
            return IntBox::EMPTY;
        }
        IntBox::new(IntPoint::new(self.lx, self.ly), IntPoint::new(self.rx, self.uy))
    }

    pub fn union(&self, other: &IntOctagon) -> IntOctagon {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        IntOctagon {
            lx: self.lx.min(other.lx),
            ly: self.ly.min(other.ly),
            rx: self.rx.max(other.rx),
            uy: self.uy.max(other.uy),
            ulx: self.ulx.min(other.ulx),
            lrx: self.lrx.max(other.lrx),
            llx: self.llx.min(other.llx),
            urx: self.urx.max(other.urx),
        }
    }

    pub fn intersection(&self, other: &IntOctagon) -> IntOctagon {
        IntOctagon {
            lx: self.lx.max(other.lx),
            ly: self.ly.max(other.ly),
            rx: self.rx.min(other.rx),
            uy: self.uy.min(other.uy),
            ulx: self.ulx.max(other.ulx),
            lrx: self.lrx.min(other.lrx),
            llx: self.llx.max(other.llx),
            urx: self.urx.min(other.urx),
        }
        .normalize()
    }

    /// Closed intersection test. Exact for normalized octagons, whose
    /// separating axes are all among the four projection directions.
    pub fn intersects(&self, other: &IntOctagon) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.lx <= other.rx
            && other.lx <= self.rx
            && self.ly <= other.uy
            && other.ly <= self.uy
            && self.ulx <= other.lrx
            && other.ulx <= self.lrx
            && self.llx <= other.urx
            && other.llx <= self.urx
    }

    pub fn contains_octagon(&self, other: &IntOctagon) -> bool {
        other.is_empty()
            || (self.lx <= other.lx
                && self.ly <= other.ly
                && self.rx >= other.rx
                && self.uy >= other.uy
                && self.ulx <= other.ulx
                && self.lrx >= other.lrx
                && self.llx <= other.llx
                && self.urx >= other.urx)
    }

    pub fn contains(&self, p: FloatPoint) -> bool {
        let diff = p.x - p.y;
        let sum = p.x + p.y;
        p.x >= self.lx as f64
            && p.x <= self.rx as f64
            && p.y >= self.ly as f64
            && p.y <= self.uy as f64
            && diff >= self.ulx as f64
            && diff <= self.lrx as f64
            && sum >= self.llx as f64
            && sum <= self.urx as f64
    }

    /// Area of the bounding box minus the four cut-off corner triangles.
    pub fn area(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let w = (self.rx - self.lx) as f64;
        let h = (self.uy - self.ly) as f64;
        let cuts = [
            (self.llx - (self.lx + self.ly)).max(0),
            ((self.rx - self.ly) - self.lrx).max(0),
            ((self.rx + self.uy) - self.urx).max(0),
            (self.ulx - (self.lx - self.uy)).max(0),
        ];
        let cut: f64 = cuts.iter().map(|&c| 0.5 * (c as f64) * (c as f64)).sum();
        (w * h - cut).max(0.0)
    }

    /// Enlarges by `offset`; the diagonal bounds move by the rounded `offset * sqrt(2)`.
    pub fn offset(&self, offset: f64) -> IntOctagon {
        if self.is_empty() {
            return *self;
        }
        let o = offset.round() as i64;
        let d = (offset * std::f64::consts::SQRT_2).round() as i64;
        IntOctagon {
            lx: self.lx - o,
            ly: self.ly - o,
            rx: self.rx + o,
            uy: self.uy + o,
            ulx: self.ulx - d,
            lrx: self.lrx + d,
            llx: self.llx - d,
            urx: self.urx + d,
        }
        .normalize()
    }

    /// Counter-clockwise border lines starting with the bottom edge.
    pub fn border_lines(&self) -> [Line; 8] {
        [
            Line::new(IntPoint::new(0, self.ly), IntPoint::new(1, self.ly)),
            Line::new(IntPoint::new(self.lrx, 0), IntPoint::new(self.lrx + 1, 1)),
            Line::new(IntPoint::new(self.rx, 0), IntPoint::new(self.rx, 1)),
            Line::new(IntPoint::new(self.urx, 0), IntPoint::new(self.urx - 1, 1)),
            Line::new(IntPoint::new(0, self.uy), IntPoint::new(-1, self.uy)),
            Line::new(IntPoint::new(self.ulx, 0), IntPoint::new(self.ulx - 1, -1)),
            Line::new(IntPoint::new(self.lx, 0), IntPoint::new(self.lx, -1)),
            Line::new(IntPoint::new(self.llx, 0), IntPoint::new(self.llx + 1, -1)),
        ]
    }

    /// Lower bound for the distance between the two octagons, zero when they meet.
    pub fn gap(&self, other: &IntOctagon) -> f64 {
        let axis = [
            (other.lx - self.rx).max(self.lx - other.rx).max(0) as f64,
            (other.ly - self.uy).max(self.ly - other.uy).max(0) as f64,
        ];
        let diag = [
            (other.ulx - self.lrx).max(self.ulx - other.lrx).max(0) as f64,
            (other.llx - self.urx).max(self.llx - other.urx).max(0) as f64,
        ];
        let d = diag[0].max(diag[1]) / std::f64::consts::SQRT_2;
        axis[0].max(axis[1]).max(d)
    }
}
