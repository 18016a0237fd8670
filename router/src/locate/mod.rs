//! Connection locate: turns the element chain of a maze result into trace
//! corners per layer and the via positions between them.

mod any_angle;
mod restricted;

use pcb_common::db::board::simplify_corners;
use pcb_common::db::ItemId;
use pcb_common::geom::{Dimension, FloatLine, FloatPoint, IntPoint, TileShape};
use pcb_common::util::config::AngleRestriction;

use crate::algo::{MazeElement, MazeResult};
use crate::context::AutorouteContext;
use crate::geometry::TileGeometry;
use crate::rooms::{DoorId, RoomId};

/// Centre line of the new trace on one layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocatedRun {
    pub corners: Vec<IntPoint>,
    pub layer: usize,
}

#[derive(Clone, Debug)]
pub struct LocatedConnection {
    pub runs: Vec<LocatedRun>,
    pub start_item: Option<ItemId>,
    pub dest_item: Option<ItemId>,
    /// False if the element chain was inconsistent and `runs` is partial.
    pub complete: bool,
}

impl LocatedConnection {
    /// Via positions with the layers they join, one between each pair of runs.
    pub fn vias(&self) -> Vec<(IntPoint, usize, usize)> {
        self.runs
            .windows(2)
            .filter_map(|w| Some((*w[1].corners.first()?, w[0].layer, w[1].layer)))
            .collect()
    }

    pub fn first_corner(&self) -> Option<IntPoint> {
        self.runs.first()?.corners.first().copied()
    }

    pub fn last_corner(&self) -> Option<IntPoint> {
        self.runs.last()?.corners.last().copied()
    }
}

/// Something the centre line has to pass through.
#[derive(Clone, Debug)]
pub(crate) enum Waypoint {
    /// Connection shape of a start or destination item.
    Target(TileShape),
    /// Crossable section of a door.
    Section { line: FloatLine, door: DoorId },
    Drill(IntPoint),
}

/// Waypoints on one layer; `rooms[i]` lies between waypoint `i` and `i + 1`.
#[derive(Clone, Debug)]
pub(crate) struct RunPlan {
    pub layer: usize,
    pub waypoints: Vec<Waypoint>,
    pub rooms: Vec<RoomId>,
}

struct Plan {
    runs: Vec<RunPlan>,
    start_item: Option<ItemId>,
    dest_item: Option<ItemId>,
    complete: bool,
}

/// Integer point of `shape` near `p`. Points and line shapes are kept exact
/// where the grid allows it.
pub(crate) fn snap_into(shape: &TileShape, p: FloatPoint) -> IntPoint {
    let q = shape.nearest_point(p);
    let rounded = q.round();
    if shape.dimension() == Dimension::Area || shape.contains(rounded.to_float()) {
        return rounded;
    }
    let (fx, fy) = (q.x.floor() as i64, q.y.floor() as i64);
    let near = (-1..=2)
        .flat_map(|dx| (-1..=2).map(move |dy| IntPoint::new(fx + dx, fy + dy)))
        .filter(|c| shape.contains(c.to_float()))
        .min_by(|a, b| a.to_float().distance(q).total_cmp(&b.to_float().distance(q)));
    if let Some(c) = near {
        return c;
    }
    shape
        .extreme_points()
        .map(|(a, b)| if a.distance(q) <= b.distance(q) { a } else { b })
        .unwrap_or(q)
        .round()
}

fn finish_run(corners: Vec<IntPoint>, layer: usize) -> Option<LocatedRun> {
    let corners = simplify_corners(&corners);
    (!corners.is_empty()).then_some(LocatedRun { corners, layer })
}

impl<G: TileGeometry> AutorouteContext<'_, G> {
    fn plan(&self, result: &MazeResult) -> Plan {
        let mut plan = Plan {
            runs: Vec::new(),
            start_item: None,
            dest_item: None,
            complete: false,
        };
        let mut current: Option<(RunPlan, RoomId)> = None;
        for element in &result.elements {
            if let MazeElement::Start { target, room } = *element {
                if current.is_some() {
                    log::warn!("second start element in the chain");
                    break;
                }
                let t = self.graph.target(target);
                plan.start_item = Some(t.item);
                let run = RunPlan {
                    layer: t.layer,
                    waypoints: vec![Waypoint::Target(t.shape.clone())],
                    rooms: Vec::new(),
                };
                current = Some((run, room));
                continue;
            }
            let Some((run, exited)) = current.as_mut() else {
                log::warn!("element chain does not begin with a start element");
                break;
            };
            match *element {
                MazeElement::Door { door, section, room } => {
                    let Some(line) = self.graph.door(door).sections.get(section) else {
                        log::warn!("{:?} has no section {}", door, section);
                        break;
                    };
                    run.waypoints.push(Waypoint::Section { line: *line, door });
                    run.rooms.push(*exited);
                    *exited = room;
                }
                MazeElement::Drill { drill, to_layer, room, .. } => {
                    let location = self.drills.drill(drill).location;
                    run.waypoints.push(Waypoint::Drill(location));
                    run.rooms.push(*exited);
                    let next = RunPlan {
                        layer: to_layer,
                        waypoints: vec![Waypoint::Drill(location)],
                        rooms: Vec::new(),
                    };
                    plan.runs.push(std::mem::replace(run, next));
                    *exited = room;
                }
                MazeElement::Destination { target } => {
                    let t = self.graph.target(target);
                    plan.dest_item = Some(t.item);
                    run.waypoints.push(Waypoint::Target(t.shape.clone()));
                    run.rooms.push(*exited);
                    plan.complete = true;
                }
                MazeElement::Start { .. } => {}
            }
        }
        if let Some((run, _)) = current {
            plan.runs.push(run);
        }
        let ends_on_drill =
            result.elements.last().is_some_and(|e| matches!(e, MazeElement::Drill { .. }));
        if ends_on_drill && self.control.fanout {
            // A fanout ends on the via itself.
            plan.runs.pop();
            plan.complete = !plan.runs.is_empty();
        }
        plan
    }

    /// Corners of the traces, per layer, that realise `result`.
    pub fn locate(&self, result: &MazeResult) -> LocatedConnection {
        let plan = self.plan(result);
        let mut runs = Vec::with_capacity(plan.runs.len());
        for run in &plan.runs {
            if run.waypoints.len() < 2 {
                continue;
            }
            let corners = match G::ANGLE {
                AngleRestriction::None => any_angle::locate_run(self, run)
                    .into_iter()
                    .map(FloatPoint::round)
                    .collect(),
                AngleRestriction::FortyFive | AngleRestriction::Ninety => {
                    restricted::locate_run(self, run, &result.ripped_items)
                }
            };
            runs.extend(finish_run(corners, run.layer));
        }
        let complete = plan.complete && runs.len() == plan.runs.len();
        if !complete {
            log::debug!("located only {} of {} runs", runs.len(), plan.runs.len());
        }
        LocatedConnection {
            runs,
            start_item: plan.start_item,
            dest_item: plan.dest_item,
            complete,
        }
    }
}
