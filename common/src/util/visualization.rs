use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect as ImageRect;
use std::path::Path;

use crate::db::board::Board;
use crate::db::item::ItemKind;
use crate::geom::IntBox;

const LAYER_COLORS: [Rgba<u8>; 6] = [
    Rgba([255, 20, 80, 200]),
    Rgba([0, 110, 255, 200]),
    Rgba([0, 255, 100, 200]),
    Rgba([255, 215, 0, 200]),
    Rgba([180, 50, 255, 200]),
    Rgba([0, 240, 255, 200]),
];

/// Renders the board to a PNG `width` pixels wide.
pub fn draw_board(board: &Board, filename: &str, width: u32) -> Result<(), image::ImageError> {
    let bb = board.bounding_box();
    if bb.is_empty() || bb.width() == 0 {
        return Ok(());
    }
    let scale = width as f64 / bb.width() as f64;
    let height = ((bb.height() as f64 * scale).ceil() as u32).max(1);
    let mut img = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));

    let map = |x: i64, y: i64| {
        (
            ((x - bb.ll.x) as f64 * scale) as f32,
            (height as f64 - (y - bb.ll.y) as f64 * scale) as f32,
        )
    };
    let rect_of = |b: &IntBox| {
        let (x0, y1) = map(b.ll.x, b.ll.y);
        let (x1, y0) = map(b.ur.x, b.ur.y);
        let (w, h) = (((x1 - x0) as u32).max(1), ((y1 - y0) as u32).max(1));
        ImageRect::at(x0 as i32, y0 as i32).of_size(w, h)
    };

    let mut items: Vec<_> = board.items().collect();
    items.sort_by_key(|i| (i.first_layer(), i.id));

    for item in &items {
        match &item.kind {
            ItemKind::ObstacleArea(a) => {
                let area = rect_of(&a.shape.bounding_box());
                draw_filled_rect_mut(&mut img, area, Rgba([60, 60, 70, 255]));
            }
            ItemKind::ConductionArea(a) => {
                let color = LAYER_COLORS[a.layer % LAYER_COLORS.len()];
                draw_hollow_rect_mut(&mut img, rect_of(&a.shape.bounding_box()), color);
            }
            _ => {}
        }
    }

    for item in &items {
        let ItemKind::Trace(t) = &item.kind else {
            continue;
        };
        let color = LAYER_COLORS[t.layer % LAYER_COLORS.len()];
        for w in t.corners.windows(2) {
            let a = map(w[0].x, w[0].y);
            let b = map(w[1].x, w[1].y);
            draw_line_segment_mut(&mut img, a, b, color);
            if t.half_width as f64 * scale >= 1.5 {
                draw_line_segment_mut(&mut img, (a.0 + 1.0, a.1), (b.0 + 1.0, b.1), color);
                draw_line_segment_mut(&mut img, (a.0, a.1 + 1.0), (b.0, b.1 + 1.0), color);
            }
        }
    }

    for item in &items {
        match &item.kind {
            ItemKind::Pin(p) => {
                let color = if p.first_layer == p.last_layer {
                    LAYER_COLORS[p.first_layer % LAYER_COLORS.len()]
                } else {
                    Rgba([200, 200, 200, 255])
                };
                draw_filled_rect_mut(&mut img, rect_of(&p.pad.bounding_box()), color);
            }
            ItemKind::Via(_) => {
                let via = rect_of(&item.bounding_box());
                draw_hollow_rect_mut(&mut img, via, Rgba([255, 255, 255, 255]));
            }
            _ => {}
        }
    }

    img.save(Path::new(filename))
}
