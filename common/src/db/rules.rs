use serde::{Deserialize, Serialize};

use super::indices::NetId;

/// Minimum copper distances between clearance classes, per layer.
#[derive(Clone, Debug)]
pub struct ClearanceMatrix {
    names: Vec<String>,
    layer_count: usize,
    values: Vec<i64>,
}

impl ClearanceMatrix {
    pub fn new(names: Vec<String>, layer_count: usize, default: i64) -> Self {
        let n = names.len();
        Self {
            names,
            layer_count,
            values: vec![default; layer_count * n * n],
        }
    }

    fn slot(&self, i: usize, j: usize, layer: usize) -> usize {
        let n = self.names.len();
        (layer * n + i) * n + j
    }

    pub fn class_count(&self) -> usize {
        self.names.len()
    }

    pub fn class_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn class_name(&self, class: usize) -> &str {
        self.names.get(class).map(String::as_str).unwrap_or("?")
    }

    /// Sets a symmetric value on all layers.
    pub fn set(&mut self, i: usize, j: usize, value: i64) {
        for layer in 0..self.layer_count {
            self.set_on_layer(i, j, layer, value);
        }
    }

    pub fn set_on_layer(&mut self, i: usize, j: usize, layer: usize, value: i64) {
        let a = self.slot(i, j, layer);
        let b = self.slot(j, i, layer);
        self.values[a] = value;
        self.values[b] = value;
    }

    pub fn value(&self, i: usize, j: usize, layer: usize) -> i64 {
        let n = self.names.len();
        if i >= n || j >= n || layer >= self.layer_count {
            return 0;
        }
        self.values[self.slot(i, j, layer)]
    }

    /// Half of the clearance of `class` to itself. Shapes in the search tree
    /// are enlarged by the clearance minus this value, and traces by this value.
    pub fn compensation(&self, class: usize, layer: usize) -> i64 {
        self.value(class, class, layer) / 2
    }

    pub fn max_value(&self, class: usize, layer: usize) -> i64 {
        (0..self.names.len())
            .map(|j| self.value(class, j, layer))
            .max()
            .unwrap_or(0)
    }
}

/// One entry of the via rule: a padstack spanning a layer range.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViaInfo {
    pub name: String,
    pub first_layer: usize,
    pub last_layer: usize,
    pub radius: i64,
    #[serde(default)]
    pub clearance_class: usize,
    #[serde(default)]
    pub attach_smd_allowed: bool,
}

impl ViaInfo {
    pub fn spans(&self, from: usize, to: usize) -> bool {
        let (lo, hi) = (from.min(to), from.max(to));
        self.first_layer <= lo && self.last_layer >= hi
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NetInfo {
    pub name: String,
    pub clearance_class: usize,
    pub trace_half_width: Option<i64>,
}

#[derive(Clone, Debug)]
pub struct Rules {
    pub clearance: ClearanceMatrix,
    /// Ordered; the first entry that fits is preferred.
    pub via_infos: Vec<ViaInfo>,
    pub nets: Vec<NetInfo>,
    pub default_trace_half_width: i64,
}

impl Rules {
    pub fn new(clearance: ClearanceMatrix, default_trace_half_width: i64) -> Self {
        Self {
            clearance,
            via_infos: Vec::new(),
            nets: Vec::new(),
            default_trace_half_width,
        }
    }

    pub fn add_net(&mut self, name: impl Into<String>, clearance_class: usize) -> NetId {
        let id = NetId::new(self.nets.len());
        self.nets.push(NetInfo {
            name: name.into(),
            clearance_class,
            trace_half_width: None,
        });
        id
    }

    pub fn net(&self, net: NetId) -> Option<&NetInfo> {
        self.nets.get(net.index())
    }

    pub fn net_by_name(&self, name: &str) -> Option<NetId> {
        self.nets.iter().position(|n| n.name == name).map(NetId::new)
    }

    pub fn trace_half_width(&self, net: NetId) -> i64 {
        self.net(net)
            .and_then(|n| n.trace_half_width)
            .unwrap_or(self.default_trace_half_width)
    }

    pub fn net_clearance_class(&self, net: NetId) -> usize {
        self.net(net).map(|n| n.clearance_class).unwrap_or(0)
    }
}
