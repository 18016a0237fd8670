use super::indices::{ItemId, NetId};
use crate::geom::{IntBox, IntOctagon, IntPoint, TileShape};

#[derive(Clone, Debug, PartialEq)]
pub struct Pin {
    pub name: String,
    pub centre: IntPoint,
    pub first_layer: usize,
    pub last_layer: usize,
    /// Pad shape in board coordinates, the same on every layer of the pin.
    pub pad: TileShape,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Via {
    pub centre: IntPoint,
    pub first_layer: usize,
    pub last_layer: usize,
    pub radius: i64,
    /// Index into the via rule the via was taken from.
    pub rule_index: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Trace {
    pub corners: Vec<IntPoint>,
    pub half_width: i64,
    pub layer: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Area {
    pub name: String,
    pub shape: TileShape,
    pub layer: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ItemKind {
    Pin(Pin),
    Via(Via),
    Trace(Trace),
    /// Keepout; an obstacle for every net it does not belong to.
    ObstacleArea(Area),
    /// Copper plane of its nets.
    ConductionArea(Area),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Item {
    pub id: ItemId,
    pub nets: Vec<NetId>,
    pub clearance_class: usize,
    pub fixed: bool,
    pub kind: ItemKind,
}

impl Item {
    pub fn first_layer(&self) -> usize {
        match &self.kind {
            ItemKind::Pin(p) => p.first_layer,
            ItemKind::Via(v) => v.first_layer,
            ItemKind::Trace(t) => t.layer,
            ItemKind::ObstacleArea(a) | ItemKind::ConductionArea(a) => a.layer,
        }
    }

    pub fn last_layer(&self) -> usize {
        match &self.kind {
            ItemKind::Pin(p) => p.last_layer,
            ItemKind::Via(v) => v.last_layer,
            ItemKind::Trace(t) => t.layer,
            ItemKind::ObstacleArea(a) | ItemKind::ConductionArea(a) => a.layer,
        }
    }

    pub fn is_on_layer(&self, layer: usize) -> bool {
        layer >= self.first_layer() && layer <= self.last_layer()
    }

    pub fn contains_net(&self, net: NetId) -> bool {
        self.nets.contains(&net)
    }

    pub fn shares_net(&self, other: &Item) -> bool {
        self.nets.iter().any(|n| other.nets.contains(n))
    }

    pub fn shares_net_with(&self, nets: &[NetId]) -> bool {
        self.nets.iter().any(|n| nets.contains(n))
    }

    /// True if a trace of `net` must keep clearance to this item.
    pub fn is_obstacle_for(&self, net: NetId) -> bool {
        !self.contains_net(net)
    }

    pub fn is_obstacle_for_nets(&self, nets: &[NetId]) -> bool {
        !self.shares_net_with(nets)
    }

    /// Traces and vias, the items that a rip-up may remove.
    pub fn is_route(&self) -> bool {
        matches!(self.kind, ItemKind::Trace(_) | ItemKind::Via(_))
    }

    pub fn is_connectable(&self) -> bool {
        !matches!(self.kind, ItemKind::ObstacleArea(_))
    }

    pub fn as_trace(&self) -> Option<&Trace> {
        match &self.kind {
            ItemKind::Trace(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_pin(&self) -> Option<&Pin> {
        match &self.kind {
            ItemKind::Pin(p) => Some(p),
            _ => None,
        }
    }

    pub fn shape_count(&self) -> usize {
        match &self.kind {
            ItemKind::Pin(p) => p.last_layer - p.first_layer + 1,
            ItemKind::Via(v) => v.last_layer - v.first_layer + 1,
            ItemKind::Trace(t) => t.corners.len().saturating_sub(1),
            ItemKind::ObstacleArea(_) | ItemKind::ConductionArea(_) => 1,
        }
    }

    /// Raw copper shapes with their layers; the position is the shape index.
    pub fn shapes(&self) -> Vec<(TileShape, usize)> {
        match &self.kind {
            ItemKind::Pin(p) => {
                (p.first_layer..=p.last_layer).map(|l| (p.pad.clone(), l)).collect()
            }
            ItemKind::Via(v) => {
                let shape = TileShape::Octagon(via_octagon(v.centre, v.radius));
                (v.first_layer..=v.last_layer).map(|l| (shape.clone(), l)).collect()
            }
            ItemKind::Trace(t) => t
                .corners
                .windows(2)
                .map(|w| (trace_segment_shape(w[0], w[1], t.half_width), t.layer))
                .collect(),
            ItemKind::ObstacleArea(a) | ItemKind::ConductionArea(a) => {
                vec![(a.shape.clone(), a.layer)]
            }
        }
    }

    pub fn shape_on_layer(&self, layer: usize) -> Option<TileShape> {
        if !self.is_on_layer(layer) {
            return None;
        }
        match &self.kind {
            ItemKind::Pin(p) => Some(p.pad.clone()),
            ItemKind::Via(v) => Some(TileShape::Octagon(via_octagon(v.centre, v.radius))),
            ItemKind::ObstacleArea(a) | ItemKind::ConductionArea(a) => Some(a.shape.clone()),
            ItemKind::Trace(_) => None,
        }
    }

    /// Layer of the shape with index `index`.
    pub fn shape_layer(&self, index: usize) -> usize {
        match &self.kind {
            ItemKind::Pin(_) | ItemKind::Via(_) => self.first_layer() + index,
            _ => self.first_layer(),
        }
    }

    /// The part of shape `index` a new trace may end on: the centre of pins
    /// and vias, the centre line of a trace segment, or the whole area.
    pub fn trace_connection_shape(&self, index: usize) -> Option<TileShape> {
        match &self.kind {
            ItemKind::Pin(p) => Some(TileShape::point(p.centre)),
            ItemKind::Via(v) => Some(TileShape::point(v.centre)),
            ItemKind::Trace(t) => {
                let a = *t.corners.get(index)?;
                let b = *t.corners.get(index + 1)?;
                Some(TileShape::segment(a, b))
            }
            ItemKind::ConductionArea(a) => Some(a.shape.clone()),
            ItemKind::ObstacleArea(_) => None,
        }
    }

    pub fn bounding_box(&self) -> IntBox {
        self.shapes()
            .iter()
            .fold(IntBox::EMPTY, |acc, (s, _)| acc.union(&s.bounding_box()))
    }

    pub fn centre(&self) -> Option<IntPoint> {
        match &self.kind {
            ItemKind::Pin(p) => Some(p.centre),
            ItemKind::Via(v) => Some(v.centre),
            _ => None,
        }
    }

    /// Half width a trace may narrow to when it enters this pin.
    pub fn neckdown_half_width(&self) -> Option<i64> {
        let pin = self.as_pin()?;
        let bb = pin.pad.bounding_box();
        Some((bb.width().min(bb.height()) / 4).max(1))
    }

    /// Largest pad extent, used for the distance below which neckdown applies.
    pub fn max_pad_width(&self) -> i64 {
        match &self.kind {
            ItemKind::Pin(p) => {
                let bb = p.pad.bounding_box();
                bb.width().max(bb.height())
            }
            ItemKind::Via(v) => 2 * v.radius,
            _ => 0,
        }
    }
}

/// Octagon circumscribing the circle of `radius` around `centre`.
pub fn via_octagon(centre: IntPoint, radius: i64) -> IntOctagon {
    let d = (radius as f64 * std::f64::consts::SQRT_2).ceil() as i64;
    let diff = centre.x - centre.y;
    let sum = centre.x + centre.y;
    IntOctagon::new(
        centre.x - radius,
        centre.y - radius,
        centre.x + radius,
        centre.y + radius,
        diff - d,
        diff + d,
        sum - d,
        sum + d,
    )
}

/// Copper of one trace segment: the centre line widened by `half_width`,
/// ends included.
pub fn trace_segment_shape(a: IntPoint, b: IntPoint, half_width: i64) -> TileShape {
    TileShape::segment(a, b).offset(half_width as f64)
}

/// True if `p` lies on the segment `a`..`b`, end points included.
pub fn point_on_segment(p: IntPoint, a: IntPoint, b: IntPoint) -> bool {
    (b - a).cross(p - a) == 0 && (p - a).dot(b - a) >= 0 && (p - b).dot(a - b) >= 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::FloatPoint;

    fn trace(corners: &[(i64, i64)]) -> Item {
        Item {
            id: ItemId::new(0),
            nets: vec![NetId::new(1)],
            clearance_class: 0,
            fixed: false,
            kind: ItemKind::Trace(Trace {
                corners: corners.iter().map(|&(x, y)| IntPoint::new(x, y)).collect(),
                half_width: 5,
                layer: 1,
            }),
        }
    }

    #[test]
    fn trace_shapes_per_segment() {
        let t = trace(&[(0, 0), (100, 0), (150, 50)]);
        let shapes = t.shapes();
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[0].0, TileShape::Box(IntBox::from_coords(-5, -5, 105, 5)));
        assert!(shapes[1].0.contains(FloatPoint::new(125.0, 25.0)));
        assert_eq!(t.shape_layer(1), 1);
        assert!(t.is_route());
        assert!(!t.is_obstacle_for(NetId::new(1)));
    }

    #[test]
    fn via_octagon_encloses_circle() {
        let o = via_octagon(IntPoint::new(0, 0), 100);
        assert!(o.contains(FloatPoint::new(70.0, 70.0)));
        assert!(o.contains(FloatPoint::new(100.0, 0.0)));
        assert!(!o.contains(FloatPoint::new(100.0, 100.0)));
    }

    #[test]
    fn neckdown_width_of_pin() {
        let pin = Item {
            id: ItemId::new(3),
            nets: vec![],
            clearance_class: 0,
            fixed: true,
            kind: ItemKind::Pin(Pin {
                name: "U1-1".into(),
                centre: IntPoint::new(0, 0),
                first_layer: 0,
                last_layer: 0,
                pad: TileShape::Box(IntBox::from_coords(-20, -60, 20, 60)),
            }),
        };
        assert_eq!(pin.neckdown_half_width(), Some(10));
        assert_eq!(pin.max_pad_width(), 120);
        assert!(point_on_segment(IntPoint::new(5, 5), IntPoint::new(0, 0), IntPoint::new(10, 10)));
    }
}
