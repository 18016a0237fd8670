//! Per-attempt routing parameters.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use pcb_common::db::board::{Board, LayerDirection, ShoveLimits};
use pcb_common::db::item::ItemKind;
use pcb_common::db::NetId;
use pcb_common::geom::FloatPoint;
use pcb_common::util::config::{AngleRestriction, AutorouteConfig, NonTraceDoorPolicy};

/// Cooperative cancellation shared between the caller and a running attempt.
#[derive(Clone, Debug, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Cost factors of a trace on one layer, per unit of length along each axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TraceCost {
    pub horizontal: f64,
    pub vertical: f64,
}

impl TraceCost {
    pub fn cost(&self, a: FloatPoint, b: FloatPoint) -> f64 {
        let dx = (b.x - a.x) * self.horizontal;
        let dy = (b.y - a.y) * self.vertical;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn min_factor(&self) -> f64 {
        self.horizontal.min(self.vertical)
    }
}

/// Read-only snapshot of everything one routing attempt consults.
#[derive(Clone, Debug)]
pub struct ArtControl {
    pub net: NetId,
    pub clearance_class: usize,
    pub layer_active: Vec<bool>,
    pub trace_half_width: Vec<i64>,
    /// Trace half width plus the clearance compensation of the net's class.
    pub compensated_trace_half_width: Vec<i64>,
    pub compensation: Vec<i64>,
    pub trace_costs: Vec<TraceCost>,
    pub min_trace_cost: f64,
    pub vias_allowed: bool,
    /// Indices into the board's via rule, in preference order.
    pub via_rule: Vec<usize>,
    pub via_cost: f64,
    /// Set when the net owns a plane, vias then cost `plane_via_cost`.
    pub cheap_via: bool,
    pub plane_via_cost: f64,
    pub ripup_allowed: bool,
    pub ripup_cost: f64,
    pub with_neckdown: bool,
    pub fanout: bool,
    pub limits: ShoveLimits,
    pub angle: AngleRestriction,
    pub door_section_length: f64,
    pub drill_page_width: i64,
    pub max_enlarge_passes: usize,
    pub max_rooms: usize,
    pub non_trace_door_policy: NonTraceDoorPolicy,
    pub remove_trace_tails: bool,
}

impl ArtControl {
    pub fn new(board: &Board, net: NetId, config: &AutorouteConfig) -> Self {
        let class = board.rules.net_clearance_class(net);
        let half_width = board.rules.trace_half_width(net);
        let layer_count = board.layer_count();
        let compensation: Vec<i64> = (0..layer_count)
            .map(|l| board.rules.clearance.compensation(class, l))
            .collect();
        let trace_costs: Vec<TraceCost> = board
            .layers()
            .iter()
            .map(|layer| match layer.direction {
                LayerDirection::Horizontal => TraceCost {
                    horizontal: config.preferred_direction_cost,
                    vertical: config.against_direction_cost,
                },
                LayerDirection::Vertical => TraceCost {
                    horizontal: config.against_direction_cost,
                    vertical: config.preferred_direction_cost,
                },
                LayerDirection::Unknown => TraceCost {
                    horizontal: config.preferred_direction_cost,
                    vertical: config.preferred_direction_cost,
                },
            })
            .collect();
        let min_trace_cost = trace_costs
            .iter()
            .map(TraceCost::min_factor)
            .fold(f64::INFINITY, f64::min);
        let cheap_via = board
            .items()
            .any(|i| matches!(i.kind, ItemKind::ConductionArea(_)) && i.contains_net(net));
        Self {
            net,
            clearance_class: class,
            layer_active: board.layers().iter().map(|l| l.is_signal).collect(),
            trace_half_width: vec![half_width; layer_count],
            compensated_trace_half_width: compensation.iter().map(|c| half_width + c).collect(),
            compensation,
            trace_costs,
            min_trace_cost: if min_trace_cost.is_finite() { min_trace_cost } else { 1.0 },
            vias_allowed: config.vias_allowed && layer_count > 1,
            via_rule: (0..board.rules.via_infos.len()).collect(),
            via_cost: config.via_cost,
            cheap_via,
            plane_via_cost: config.plane_via_cost,
            ripup_allowed: config.ripup_allowed,
            ripup_cost: config.ripup_cost,
            with_neckdown: config.with_neckdown,
            fanout: config.fanout,
            limits: ShoveLimits {
                trace_depth: config.max_shove_trace_depth,
                via_depth: config.max_shove_via_depth,
                spring_over_depth: config.max_spring_over_depth,
                pull_tight_accuracy: config.pull_tight_accuracy,
            },
            angle: config.angle_restriction,
            door_section_length: section_length(config.door_section_length),
            drill_page_width: config.drill_page_width,
            max_enlarge_passes: config.max_enlarge_passes,
            max_rooms: config.max_rooms,
            non_trace_door_policy: config.non_trace_door_policy,
            remove_trace_tails: config.remove_trace_tails,
        }
    }

    pub fn layer_count(&self) -> usize {
        self.layer_active.len()
    }

    pub fn effective_via_cost(&self) -> f64 {
        if self.cheap_via { self.plane_via_cost } else { self.via_cost }
    }

    /// Via rule entries, in preference order, that connect `from` and `to`.
    pub fn vias_between<'a>(
        &'a self,
        board: &'a Board,
        from: usize,
        to: usize,
    ) -> impl Iterator<Item = usize> + 'a {
        self.via_rule
            .iter()
            .copied()
            .filter(move |&i| board.rules.via_infos.get(i).is_some_and(|v| v.spans(from, to)))
    }

    pub fn max_via_radius(&self, board: &Board) -> i64 {
        self.via_rule
            .iter()
            .filter_map(|&i| board.rules.via_infos.get(i))
            .map(|v| v.radius)
            .max()
            .unwrap_or(0)
    }
}

/// Door section length from the configuration. A length that is not
/// positive leaves every door in one section.
fn section_length(configured: f64) -> f64 {
    if configured > 0.0 {
        configured
    } else {
        log::warn!(
            "door section length {} is not positive, doors are not divided",
            configured
        );
        f64::INFINITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_section_length_keeps_doors_whole() {
        assert_eq!(section_length(2000.0), 2000.0);
        assert_eq!(section_length(0.0), f64::INFINITY);
        assert_eq!(section_length(-5.0), f64::INFINITY);
        assert_eq!(section_length(f64::NAN), f64::INFINITY);
    }
}
