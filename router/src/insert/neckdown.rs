//! Narrower trace legs next to pins the full width cannot reach.

use pcb_common::db::board::Board;
use pcb_common::db::item::Item;
use pcb_common::geom::IntPoint;

use crate::control::ArtControl;
use crate::error::InsertError;
use crate::locate::LocatedRun;

/// Pin at one end of a run that the trace may enter narrowed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neck {
    pub centre: IntPoint,
    /// Length of polyline, from the pin centre, inserted with the neck width.
    pub reach: f64,
    pub half_width: i64,
}

impl Neck {
    pub fn of_pin(item: &Item, at: IntPoint) -> Option<Neck> {
        let pin = item.as_pin()?;
        if pin.centre != at {
            return None;
        }
        Some(Neck {
            centre: pin.centre,
            reach: item.max_pad_width() as f64,
            half_width: item.neckdown_half_width()?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Leg {
    pub corners: Vec<IntPoint>,
    pub half_width: i64,
}

fn polyline_length(corners: &[IntPoint]) -> f64 {
    corners.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// Cuts the polyline `length` units from its start. The cut point ends the
/// head and starts the tail.
fn split_at_length(corners: &[IntPoint], length: f64) -> (Vec<IntPoint>, Vec<IntPoint>) {
    let mut travelled = 0.0;
    for (i, w) in corners.windows(2).enumerate() {
        let segment = w[0].distance(w[1]);
        if travelled + segment >= length {
            let cut = w[0].to_float().change_length(w[1].to_float(), length - travelled).round();
            let mut head = corners[..=i].to_vec();
            if head.last() != Some(&cut) {
                head.push(cut);
            }
            let mut tail = vec![cut];
            tail.extend(corners[i + 1..].iter().copied().filter(|&c| c != cut));
            return (head, tail);
        }
        travelled += segment;
    }
    let last = corners.last().copied().into_iter().collect();
    (corners.to_vec(), last)
}

/// Splits a run into an entry leg, a full width leg and an exit leg. Legs
/// without length are left out.
pub fn neckdown_legs(
    corners: &[IntPoint],
    half_width: i64,
    start: Option<&Neck>,
    end: Option<&Neck>,
) -> Vec<Leg> {
    let total = polyline_length(corners);
    let head_length = start.map_or(0.0, |n| n.reach.min(total));
    let tail_length = end.map_or(0.0, |n| n.reach.min(total));
    let narrow = |neck: Option<&Neck>| neck.map_or(half_width, |n| n.half_width.min(half_width));
    if head_length + tail_length >= total {
        let width = narrow(start).min(narrow(end));
        return vec![Leg {
            corners: corners.to_vec(),
            half_width: width,
        }];
    }
    let (head, rest) = if start.is_some() {
        split_at_length(corners, head_length)
    } else {
        (Vec::new(), corners.to_vec())
    };
    let (middle, tail) = if end.is_some() {
        split_at_length(&rest, polyline_length(&rest) - tail_length)
    } else {
        (rest, Vec::new())
    };
    [(head, narrow(start)), (middle, half_width), (tail, narrow(end))]
        .into_iter()
        .filter(|(c, _)| c.len() >= 2)
        .map(|(corners, half_width)| Leg { corners, half_width })
        .collect()
}

fn insert_leg(
    board: &mut Board,
    control: &ArtControl,
    leg: &Leg,
    layer: usize,
    check_only: bool,
) -> Result<(), InsertError> {
    let Some(&last) = leg.corners.last() else {
        return Ok(());
    };
    let nets = [control.net];
    let reached = board.insert_trace(
        &leg.corners,
        leg.half_width,
        layer,
        &nets,
        control.clearance_class,
        &control.limits,
        check_only,
    )?;
    if reached == last {
        Ok(())
    } else {
        Err(InsertError::TraceBlocked { layer, reached })
    }
}

/// Inserts one run at full width, or with neck legs at its pin ends if the
/// full width does not fit.
pub fn insert_run(
    board: &mut Board,
    control: &ArtControl,
    run: &LocatedRun,
    start: Option<&Neck>,
    end: Option<&Neck>,
) -> Result<(), InsertError> {
    if run.corners.len() < 2 {
        return Ok(());
    }
    let full = Leg {
        corners: run.corners.clone(),
        half_width: control.trace_half_width[run.layer],
    };
    let blocked = match insert_leg(board, control, &full, run.layer, true) {
        Ok(()) => return insert_leg(board, control, &full, run.layer, false),
        Err(e) => e,
    };
    if !control.with_neckdown || (start.is_none() && end.is_none()) {
        return Err(blocked);
    }
    let legs = neckdown_legs(&full.corners, full.half_width, start, end);
    for leg in &legs {
        insert_leg(board, control, leg, run.layer, true)?;
    }
    log::debug!("inserting run on layer {} as {} neckdown legs", run.layer, legs.len());
    for leg in &legs {
        insert_leg(board, control, leg, run.layer, false)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i64, y: i64) -> IntPoint {
        IntPoint::new(x, y)
    }

    fn neck(centre: IntPoint) -> Neck {
        Neck {
            centre,
            reach: 40.0,
            half_width: 4,
        }
    }

    #[test]
    fn legs_narrow_at_both_pins() {
        let corners = [p(0, 0), p(100, 0), p(100, 100)];
        let (a, b) = (neck(p(0, 0)), neck(p(100, 100)));
        let legs = neckdown_legs(&corners, 10, Some(&a), Some(&b));
        assert_eq!(
            legs,
            vec![
                Leg {
                    corners: vec![p(0, 0), p(40, 0)],
                    half_width: 4
                },
                Leg {
                    corners: vec![p(40, 0), p(100, 0), p(100, 60)],
                    half_width: 10
                },
                Leg {
                    corners: vec![p(100, 60), p(100, 100)],
                    half_width: 4
                },
            ]
        );
    }

    #[test]
    fn short_run_is_narrow_throughout() {
        let corners = [p(0, 0), p(50, 0)];
        let a = neck(p(0, 0));
        let legs = neckdown_legs(&corners, 10, Some(&a), Some(&neck(p(50, 0))));
        assert_eq!(legs.len(), 1);
        assert_eq!(legs[0].half_width, 4);
    }

    #[test]
    fn only_the_start_gets_a_neck() {
        let corners = [p(0, 0), p(200, 0)];
        let legs = neckdown_legs(&corners, 10, Some(&neck(p(0, 0))), None);
        assert_eq!(legs.len(), 2);
        assert_eq!(legs[1].corners, vec![p(40, 0), p(200, 0)]);
    }
}
