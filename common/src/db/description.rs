//! Serializable board description, read from and written to TOML files.

use serde::{Deserialize, Serialize};

use super::board::{Board, BoardError, Layer, LayerDirection};
use super::indices::NetId;
use super::item::ItemKind;
use super::rules::{ClearanceMatrix, Rules, ViaInfo};
use crate::geom::{IntBox, IntPoint, TileShape};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardDescription {
    /// `[x0, y0, x1, y1]`
    pub outline: [i64; 4],
    pub layers: Vec<LayerDescription>,
    #[serde(default = "default_classes")]
    pub clearance_classes: Vec<String>,
    pub default_clearance: i64,
    #[serde(default)]
    pub clearances: Vec<ClearanceDescription>,
    pub default_trace_half_width: i64,
    #[serde(default)]
    pub vias: Vec<ViaInfo>,
    #[serde(default)]
    pub nets: Vec<NetDescription>,
    #[serde(default)]
    pub pins: Vec<PinDescription>,
    #[serde(default)]
    pub keepouts: Vec<AreaDescription>,
    #[serde(default)]
    pub planes: Vec<AreaDescription>,
    #[serde(default)]
    pub traces: Vec<TraceDescription>,
    #[serde(default)]
    pub via_instances: Vec<ViaInstanceDescription>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerDescription {
    pub name: String,
    #[serde(default)]
    pub direction: LayerDirection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearanceDescription {
    pub first: String,
    pub second: String,
    pub value: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetDescription {
    pub name: String,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub trace_half_width: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinDescription {
    pub name: String,
    #[serde(default)]
    pub net: Option<String>,
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
    #[serde(default)]
    pub first_layer: usize,
    #[serde(default)]
    pub last_layer: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaDescription {
    pub name: String,
    pub layer: usize,
    /// `[x0, y0, x1, y1]`
    pub rect: [i64; 4],
    #[serde(default)]
    pub net: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceDescription {
    pub net: String,
    pub layer: usize,
    pub half_width: i64,
    pub corners: Vec<[i64; 2]>,
    #[serde(default)]
    pub fixed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViaInstanceDescription {
    pub net: String,
    pub x: i64,
    pub y: i64,
    pub rule_index: usize,
}

fn default_classes() -> Vec<String> {
    vec!["default".to_string()]
}

fn rect(r: &[i64; 4]) -> TileShape {
    TileShape::Box(IntBox::from_coords(r[0], r[1], r[2], r[3]))
}

impl BoardDescription {
    pub fn build(&self) -> Result<Board, BoardError> {
        let layers: Vec<Layer> = self
            .layers
            .iter()
            .map(|l| Layer {
                name: l.name.clone(),
                is_signal: true,
                direction: l.direction,
            })
            .collect();
        let mut clearance = ClearanceMatrix::new(
            self.clearance_classes.clone(),
            layers.len(),
            self.default_clearance,
        );
        let class_of = |name: &str| {
            self.clearance_classes
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| BoardError::UnknownClearanceClass(name.to_string()))
        };
        for c in &self.clearances {
            clearance.set(class_of(&c.first)?, class_of(&c.second)?, c.value);
        }
        let mut rules = Rules::new(clearance, self.default_trace_half_width);
        rules.via_infos = self.vias.clone();
        for n in &self.nets {
            let class = match &n.class {
                Some(c) => class_of(c)?,
                None => 0,
            };
            let id = rules.add_net(n.name.clone(), class);
            rules.nets[id.index()].trace_half_width = n.trace_half_width;
        }
        let o = self.outline;
        let mut board = Board::new(layers, IntBox::from_coords(o[0], o[1], o[2], o[3]), rules);

        let net_of = |board: &Board, name: &Option<String>| -> Result<Vec<NetId>, BoardError> {
            match name {
                None => Ok(Vec::new()),
                Some(n) => board
                    .rules
                    .net_by_name(n)
                    .map(|id| vec![id])
                    .ok_or_else(|| BoardError::UnknownNet(n.clone())),
            }
        };
        for p in &self.pins {
            let nets = net_of(&board, &p.net)?;
            let class = nets.first().map(|&n| board.rules.net_clearance_class(n)).unwrap_or(0);
            let (hw, hh) = (p.width / 2, p.height / 2);
            let pad = TileShape::Box(IntBox::from_coords(p.x - hw, p.y - hh, p.x + hw, p.y + hh));
            let centre = IntPoint::new(p.x, p.y);
            board.add_pin(p.name.clone(), centre, p.first_layer, p.last_layer, pad, nets, class)?;
        }
        for k in &self.keepouts {
            let nets = net_of(&board, &k.net)?;
            board.add_obstacle_area(k.name.clone(), rect(&k.rect), k.layer, nets)?;
        }
        for a in &self.planes {
            let nets = net_of(&board, &a.net)?;
            let class = nets.first().map(|&n| board.rules.net_clearance_class(n)).unwrap_or(0);
            board.add_conduction_area(a.name.clone(), rect(&a.rect), a.layer, nets, class)?;
        }
        for t in &self.traces {
            let nets = net_of(&board, &Some(t.net.clone()))?;
            let class = board.rules.net_clearance_class(nets[0]);
            let corners = t.corners.iter().map(|c| IntPoint::new(c[0], c[1])).collect();
            let id = board.add_trace(corners, t.half_width, t.layer, nets, class)?;
            if t.fixed {
                board.set_fixed(id, true)?;
            }
        }
        for v in &self.via_instances {
            let nets = net_of(&board, &Some(v.net.clone()))?;
            let class = board.rules.net_clearance_class(nets[0]);
            board.add_via(IntPoint::new(v.x, v.y), v.rule_index, nets, class, false)?;
        }
        Ok(board)
    }

    /// Replaces the routing of this description with the traces and vias of `board`.
    pub fn update_routing(&mut self, board: &Board) {
        let net_name = |nets: &[NetId]| {
            nets.first()
                .and_then(|&n| board.rules.net(n))
                .map(|n| n.name.clone())
                .unwrap_or_default()
        };
        self.traces.clear();
        self.via_instances.clear();
        for item in board.items() {
            match &item.kind {
                ItemKind::Trace(t) => self.traces.push(TraceDescription {
                    net: net_name(&item.nets),
                    layer: t.layer,
                    half_width: t.half_width,
                    corners: t.corners.iter().map(|c| [c.x, c.y]).collect(),
                    fixed: item.fixed,
                }),
                ItemKind::Via(v) => self.via_instances.push(ViaInstanceDescription {
                    net: net_name(&item.nets),
                    x: v.centre.x,
                    y: v.centre.y,
                    rule_index: v.rule_index,
                }),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOARD: &str = r#"
outline = [0, 0, 10000, 8000]
default_clearance = 100
default_trace_half_width = 80
clearance_classes = ["default", "power"]

[[layers]]
name = "top"
direction = "horizontal"

[[layers]]
name = "bottom"
direction = "vertical"

[[clearances]]
first = "default"
second = "power"
value = 250

[[vias]]
name = "via_600"
first_layer = 0
last_layer = 1
radius = 300

[[nets]]
name = "GND"
class = "power"

[[nets]]
name = "CLK"

[[pins]]
name = "U1-1"
net = "CLK"
x = 1000
y = 1000
width = 400
height = 400

[[keepouts]]
name = "mounting_hole"
layer = 0
rect = [4000, 4000, 5000, 5000]
"#;

    #[test]
    fn toml_board_builds() {
        let description: BoardDescription = toml::from_str(BOARD).unwrap();
        let board = description.build().unwrap();
        assert_eq!(board.layer_count(), 2);
        assert_eq!(board.layers()[1].direction, LayerDirection::Vertical);
        assert_eq!(board.rules.clearance.value(0, 1, 0), 250);
        assert_eq!(board.rules.net_clearance_class(NetId::new(0)), 1);
        assert_eq!(board.item_count(), 2);
    }

    #[test]
    fn unknown_net_is_reported() {
        let mut description: BoardDescription = toml::from_str(BOARD).unwrap();
        description.pins[0].net = Some("VCC".into());
        assert!(matches!(description.build(), Err(BoardError::UnknownNet(_))));
    }
}
