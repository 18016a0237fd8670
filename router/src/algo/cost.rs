//! Lower bound of the remaining cost to the destination.

use pcb_common::geom::{FloatPoint, IntBox, TileShape};

/// Weighted distance to the bounding box of the destination items on each
/// layer, plus the via cost when the nearest destination is on another layer.
#[derive(Clone, Debug)]
pub struct DestinationDistance {
    boxes: Vec<IntBox>,
    trace_cost: f64,
    via_cost: f64,
}

impl DestinationDistance {
    pub fn new(layer_count: usize, trace_cost: f64, via_cost: f64) -> Self {
        Self {
            boxes: vec![IntBox::EMPTY; layer_count],
            trace_cost,
            via_cost,
        }
    }

    pub fn add(&mut self, shape: &TileShape, layer: usize) {
        if let Some(b) = self.boxes.get_mut(layer) {
            *b = b.union(&shape.bounding_box());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.iter().all(IntBox::is_empty)
    }

    pub fn calculate(&self, p: FloatPoint, layer: usize) -> f64 {
        let best = self
            .boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| !b.is_empty())
            .map(|(l, b)| {
                let via = if l == layer { 0.0 } else { self.via_cost };
                b.distance(p) * self.trace_cost + via
            })
            .fold(f64::INFINITY, f64::min);
        if best.is_finite() { best } else { 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcb_common::geom::IntPoint;

    #[test]
    fn other_layers_add_the_via_cost() {
        let mut d = DestinationDistance::new(2, 2.0, 50.0);
        assert!(d.is_empty());
        d.add(&TileShape::point(IntPoint::new(100, 0)), 1);
        assert_eq!(d.calculate(FloatPoint::new(0.0, 0.0), 1), 200.0);
        assert_eq!(d.calculate(FloatPoint::new(0.0, 0.0), 0), 250.0);
        d.add(&TileShape::point(IntPoint::new(10, 0)), 0);
        assert_eq!(d.calculate(FloatPoint::new(0.0, 0.0), 0), 20.0);
        assert_eq!(d.calculate(FloatPoint::new(50.0, 0.0), 0), 80.0);
    }
}
