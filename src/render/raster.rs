//! Schematic raster output for parsed process maps.
//!
//! This is a deterministic, dependency-light rasterizer: lane bands stacked
//! per pool, elements placed on a column grid by connection depth, circles
//! for events, rectangles for activities, diamonds for gateways, straight
//! connection lines with a terminal dot. No text shaping — the image is a
//! schematic companion to the BPMN XML, not a presentation-grade diagram.
//! Identical notation always produces identical pixels.

use crate::piperflow::{ElementKind, ProcessMap, Side};
use image::{Rgba, RgbaImage};
use std::collections::{HashMap, HashSet};

const COLUMN_WIDTH: i64 = 160;
const LANE_HEIGHT: i64 = 120;
const MARGIN: i64 = 40;
const TITLE_BAND: i64 = 40;
const FOOTER_BAND: i64 = 24;
const POOL_GAP: i64 = 12;

const EVENT_RADIUS: i64 = 16;
const TASK_HALF_W: i64 = 50;
const TASK_HALF_H: i64 = 28;
const GATEWAY_RADIUS: i64 = 22;

/// Colour palette derived from the notation's `colourtheme:` directive.
struct Palette {
    background: Rgba<u8>,
    title_band: Rgba<u8>,
    lane_fill: [Rgba<u8>; 2],
    lane_border: Rgba<u8>,
    node_fill: Rgba<u8>,
    node_border: Rgba<u8>,
    flow: Rgba<u8>,
}

fn rgb(r: u8, g: u8, b: u8) -> Rgba<u8> {
    Rgba([r, g, b, 255])
}

fn palette(theme: Option<&str>) -> Palette {
    let neutral = Palette {
        background: rgb(255, 255, 255),
        title_band: rgb(218, 224, 230),
        lane_fill: [rgb(244, 246, 248), rgb(233, 237, 241)],
        lane_border: rgb(128, 136, 144),
        node_fill: rgb(208, 226, 242),
        node_border: rgb(54, 74, 94),
        flow: rgb(64, 72, 80),
    };

    let Some(name) = theme else {
        return neutral;
    };

    // Tint the neutral palette per the documented theme names.
    let accents: Option<(Rgba<u8>, Rgba<u8>)> = match name.to_ascii_uppercase().as_str() {
        "DEFAULT" => None,
        "GREYWOOF" => Some((rgb(210, 210, 210), rgb(72, 72, 72))),
        "BLUEMOUNTAIN" => Some((rgb(188, 214, 240), rgb(32, 64, 116))),
        "ORANGEPEEL" => Some((rgb(250, 216, 180), rgb(164, 88, 18))),
        "GREENTURTLE" => Some((rgb(198, 230, 202), rgb(34, 96, 50))),
        "SUNFLOWER" => Some((rgb(250, 236, 170), rgb(142, 110, 16))),
        "PURPLERAIN" => Some((rgb(218, 202, 238), rgb(86, 48, 130))),
        "RUBYRED" => Some((rgb(244, 194, 194), rgb(136, 28, 36))),
        "TEALWATERS" => Some((rgb(184, 226, 228), rgb(18, 98, 102))),
        "SEAFOAMS" => Some((rgb(204, 236, 222), rgb(40, 104, 82))),
        _ => None,
    };

    match accents {
        Some((fill, border)) => Palette {
            node_fill: fill,
            node_border: border,
            title_band: fill,
            ..neutral
        },
        None => neutral,
    }
}

#[derive(Debug, Clone, Copy)]
struct NodePos {
    x: i64,
    y: i64,
    kind: ElementKind,
}

/// Assign each element a `(column, lane row)` grid slot and convert to pixel
/// centers. Columns follow connection depth (longest path from the sources),
/// with declaration order breaking ties inside a lane.
fn layout(map: &ProcessMap) -> (HashMap<String, NodePos>, i64, i64) {
    let mut depth: HashMap<&str, i64> = map.elements().map(|e| (e.id.as_str(), 0)).collect();

    // Longest-path relaxation; the iteration cap makes cyclic notation
    // terminate instead of spinning.
    let n = map.element_count();
    for _ in 0..n {
        let mut changed = false;
        for conn in &map.connections {
            let from_depth = depth[conn.from.as_str()];
            let entry = depth.get_mut(conn.to.as_str()).expect("validated endpoint");
            if *entry < from_depth + 1 && ((from_depth + 1) as usize) < n + 1 {
                *entry = from_depth + 1;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let mut positions = HashMap::new();
    let mut max_col: i64 = 0;
    let mut lane_top = TITLE_BAND;

    for (pool_idx, pool) in map.pools.iter().enumerate() {
        if pool_idx > 0 {
            lane_top += POOL_GAP;
        }
        for lane in &pool.lanes {
            let mut occupied: HashSet<i64> = HashSet::new();
            for element in &lane.elements {
                let mut col = depth[element.id.as_str()];
                while occupied.contains(&col) {
                    col += 1;
                }
                occupied.insert(col);
                max_col = max_col.max(col);
                positions.insert(
                    element.id.clone(),
                    NodePos {
                        x: MARGIN + col * COLUMN_WIDTH + COLUMN_WIDTH / 2,
                        y: lane_top + LANE_HEIGHT / 2,
                        kind: element.kind,
                    },
                );
            }
            lane_top += LANE_HEIGHT;
        }
    }

    let mut width = MARGIN * 2 + (max_col + 1) * COLUMN_WIDTH;
    if let Some(min_width) = map.width {
        width = width.max(min_width as i64);
    }
    let mut height = lane_top + MARGIN / 2;
    if map.footer.is_some() {
        height += FOOTER_BAND;
    }

    (positions, width, height)
}

/// Draw the schematic for a parsed map.
pub fn draw(map: &ProcessMap) -> RgbaImage {
    let colours = palette(map.colour_theme.as_deref());
    let (positions, width, height) = layout(map);
    let mut img = RgbaImage::from_pixel(width as u32, height as u32, colours.background);

    // Title band across the top; footer band when requested.
    fill_rect(&mut img, 0, 0, width, TITLE_BAND - 8, colours.title_band);
    if map.footer.is_some() {
        fill_rect(
            &mut img,
            0,
            height - FOOTER_BAND,
            width,
            FOOTER_BAND - 4,
            colours.title_band,
        );
    }

    // Lane bands, alternating fills, per pool.
    let mut lane_top = TITLE_BAND;
    let mut band = 0usize;
    for (pool_idx, pool) in map.pools.iter().enumerate() {
        if pool_idx > 0 {
            lane_top += POOL_GAP;
        }
        for _lane in &pool.lanes {
            fill_rect(
                &mut img,
                MARGIN / 2,
                lane_top,
                width - MARGIN,
                LANE_HEIGHT,
                colours.lane_fill[band % 2],
            );
            stroke_rect(
                &mut img,
                MARGIN / 2,
                lane_top,
                width - MARGIN,
                LANE_HEIGHT,
                colours.lane_border,
            );
            band += 1;
            lane_top += LANE_HEIGHT;
        }
    }

    // Connections first so nodes overdraw the line ends.
    for conn in &map.connections {
        let (Some(from), Some(to)) = (positions.get(&conn.from), positions.get(&conn.to)) else {
            continue;
        };
        let start = anchor(*from, conn.sides.map(|s| s.0), *to);
        let end = anchor(*to, conn.sides.map(|s| s.1), *from);
        draw_line(&mut img, start, end, colours.flow);
        fill_disc(&mut img, end.0, end.1, 3, colours.flow);
    }

    for pos in positions.values() {
        draw_node(&mut img, *pos, &colours);
    }

    img
}

/// Point on the element's edge where a connection attaches. Manual side
/// hints win; otherwise the dominant axis towards the peer decides.
fn anchor(pos: NodePos, side: Option<Side>, towards: NodePos) -> (i64, i64) {
    let (hw, hh) = half_extents(pos.kind);
    let side = side.unwrap_or_else(|| {
        let dx = towards.x - pos.x;
        let dy = towards.y - pos.y;
        if dx.abs() >= dy.abs() {
            if dx >= 0 {
                Side::Right
            } else {
                Side::Left
            }
        } else if dy >= 0 {
            Side::Bottom
        } else {
            Side::Top
        }
    });
    match side {
        Side::Top => (pos.x, pos.y - hh),
        Side::Bottom => (pos.x, pos.y + hh),
        Side::Left => (pos.x - hw, pos.y),
        Side::Right => (pos.x + hw, pos.y),
    }
}

fn half_extents(kind: ElementKind) -> (i64, i64) {
    if kind.is_event() {
        (EVENT_RADIUS, EVENT_RADIUS)
    } else if kind.is_gateway() {
        (GATEWAY_RADIUS, GATEWAY_RADIUS)
    } else {
        (TASK_HALF_W, TASK_HALF_H)
    }
}

fn draw_node(img: &mut RgbaImage, pos: NodePos, colours: &Palette) {
    match pos.kind {
        ElementKind::Start => {
            fill_disc(img, pos.x, pos.y, EVENT_RADIUS, colours.node_fill);
            ring(img, pos.x, pos.y, EVENT_RADIUS, colours.node_border);
        }
        ElementKind::End => {
            fill_disc(img, pos.x, pos.y, EVENT_RADIUS, colours.node_fill);
            ring(img, pos.x, pos.y, EVENT_RADIUS, colours.node_border);
            ring(img, pos.x, pos.y, EVENT_RADIUS - 3, colours.node_border);
        }
        k if k.is_event() => {
            // Intermediate-style events: double thin ring.
            fill_disc(img, pos.x, pos.y, EVENT_RADIUS, colours.node_fill);
            ring(img, pos.x, pos.y, EVENT_RADIUS, colours.node_border);
            ring(img, pos.x, pos.y, EVENT_RADIUS - 4, colours.node_border);
        }
        ElementKind::Task => {
            fill_rect(
                img,
                pos.x - TASK_HALF_W,
                pos.y - TASK_HALF_H,
                TASK_HALF_W * 2,
                TASK_HALF_H * 2,
                colours.node_fill,
            );
            stroke_rect(
                img,
                pos.x - TASK_HALF_W,
                pos.y - TASK_HALF_H,
                TASK_HALF_W * 2,
                TASK_HALF_H * 2,
                colours.node_border,
            );
        }
        ElementKind::Subprocess => {
            fill_rect(
                img,
                pos.x - TASK_HALF_W,
                pos.y - TASK_HALF_H,
                TASK_HALF_W * 2,
                TASK_HALF_H * 2,
                colours.node_fill,
            );
            stroke_rect(
                img,
                pos.x - TASK_HALF_W,
                pos.y - TASK_HALF_H,
                TASK_HALF_W * 2,
                TASK_HALF_H * 2,
                colours.node_border,
            );
            stroke_rect(
                img,
                pos.x - TASK_HALF_W + 3,
                pos.y - TASK_HALF_H + 3,
                TASK_HALF_W * 2 - 6,
                TASK_HALF_H * 2 - 6,
                colours.node_border,
            );
        }
        k => {
            // Gateways: filled diamond; event gateway gets an inner ring.
            diamond(img, pos.x, pos.y, GATEWAY_RADIUS, colours.node_fill, colours.node_border);
            if k == ElementKind::EventGateway {
                ring(img, pos.x, pos.y, GATEWAY_RADIUS / 2, colours.node_border);
            }
        }
    }
}

fn put(img: &mut RgbaImage, x: i64, y: i64, colour: Rgba<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, colour);
    }
}

fn fill_rect(img: &mut RgbaImage, x: i64, y: i64, w: i64, h: i64, colour: Rgba<u8>) {
    for py in y..y + h {
        for px in x..x + w {
            put(img, px, py, colour);
        }
    }
}

fn stroke_rect(img: &mut RgbaImage, x: i64, y: i64, w: i64, h: i64, colour: Rgba<u8>) {
    for px in x..x + w {
        put(img, px, y, colour);
        put(img, px, y + h - 1, colour);
    }
    for py in y..y + h {
        put(img, x, py, colour);
        put(img, x + w - 1, py, colour);
    }
}

fn fill_disc(img: &mut RgbaImage, cx: i64, cy: i64, r: i64, colour: Rgba<u8>) {
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy <= r * r {
                put(img, cx + dx, cy + dy, colour);
            }
        }
    }
}

fn ring(img: &mut RgbaImage, cx: i64, cy: i64, r: i64, colour: Rgba<u8>) {
    let inner = (r - 1) * (r - 1);
    let outer = r * r;
    for dy in -r..=r {
        for dx in -r..=r {
            let d2 = dx * dx + dy * dy;
            if d2 > inner && d2 <= outer {
                put(img, cx + dx, cy + dy, colour);
            }
        }
    }
}

fn diamond(img: &mut RgbaImage, cx: i64, cy: i64, r: i64, fill: Rgba<u8>, border: Rgba<u8>) {
    for dy in -r..=r {
        for dx in -r..=r {
            let d = dx.abs() + dy.abs();
            if d <= r {
                let colour = if d >= r - 1 { border } else { fill };
                put(img, cx + dx, cy + dy, colour);
            }
        }
    }
}

fn draw_line(img: &mut RgbaImage, from: (i64, i64), to: (i64, i64), colour: Rgba<u8>) {
    // Bresenham
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put(img, x, y, colour);
        if x == to.0 && y == to.1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piperflow::parse;

    const MINIMAL: &str = "title: T\nlane: L\n(start) as s\n(end) as e\ns->e";

    #[test]
    fn draw_is_deterministic() {
        let map = parse(MINIMAL).unwrap();
        let a = draw(&map);
        let b = draw(&map);
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn dimensions_follow_layout() {
        let map = parse(MINIMAL).unwrap();
        let img = draw(&map);
        // Two elements connected: columns 0 and 1.
        assert_eq!(img.width() as i64, MARGIN * 2 + 2 * COLUMN_WIDTH);
        assert_eq!(img.height() as i64, TITLE_BAND + LANE_HEIGHT + MARGIN / 2);
    }

    #[test]
    fn width_directive_is_a_floor() {
        let map = parse("title: T\nwidth: 900\nlane: L\n(start) as s\n(end) as e\ns->e").unwrap();
        assert_eq!(draw(&map).width(), 900);
    }

    #[test]
    fn footer_adds_a_band() {
        let plain = draw(&parse(MINIMAL).unwrap());
        let with_footer =
            draw(&parse("title: T\nfooter: F\nlane: L\n(start) as s\n(end) as e\ns->e").unwrap());
        assert_eq!(
            with_footer.height() as i64,
            plain.height() as i64 + FOOTER_BAND
        );
    }

    #[test]
    fn unconnected_elements_do_not_collide() {
        let map = parse("title: T\nlane: L\n(start) as a\n[X] as b\n(end) as c").unwrap();
        let (positions, _, _) = layout(&map);
        let xs: Vec<i64> = ["a", "b", "c"].iter().map(|id| positions[*id].x).collect();
        assert!(xs[0] != xs[1] && xs[1] != xs[2] && xs[0] != xs[2]);
    }

    #[test]
    fn depth_orders_columns() {
        let map = parse("title: T\nlane: L\n(start) as a\n[X] as b\n(end) as c\na->b->c").unwrap();
        let (positions, _, _) = layout(&map);
        assert!(positions["a"].x < positions["b"].x);
        assert!(positions["b"].x < positions["c"].x);
    }

    #[test]
    fn cyclic_notation_terminates() {
        let map =
            parse("title: T\nlane: L\n[A] as a\n[B] as b\na->b\nb->a").unwrap();
        let _ = draw(&map);
    }

    #[test]
    fn theme_changes_pixels() {
        let plain = draw(&parse(MINIMAL).unwrap());
        let themed = draw(
            &parse("title: T\ncolourtheme: RUBYRED\nlane: L\n(start) as s\n(end) as e\ns->e")
                .unwrap(),
        );
        assert_ne!(plain.as_raw(), themed.as_raw());
    }
}
