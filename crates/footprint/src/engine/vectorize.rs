//! Boundary tracing of 4-connected label regions.
//!
//! Regions are traced in pixel space on integer cell corners, so shared
//! edges between neighbouring regions and tiles are bit-identical after the
//! affine map into the native frame.

use std::collections::HashMap;

use geo::orient::{Direction, Orient};
use geo::{Coord, LineString, Polygon};

use basin_common::{CellWindow, GeoTransform, PixelKey};

use super::LabelField;

/// Cell corner in global pixel coordinates (col, row).
type Vertex = (i64, i64);

const UNVISITED: usize = usize::MAX;

/// Polygons of every 4-connected equal-label region inside `tile`.
pub(crate) fn trace_tile(field: &LabelField<'_>, tile: CellWindow) -> Vec<(u64, Vec<Polygon<f64>>)> {
    let w = tile.cols as usize;
    let h = tile.rows as usize;
    let labels: Vec<Option<u64>> = (0..h)
        .flat_map(|r| (0..w).map(move |c| (c, r)))
        .map(|(c, r)| {
            field.label(PixelKey::new(
                tile.col_start + c as u32,
                tile.row_start + r as u32,
            ))
        })
        .collect();

    let mut component = vec![UNVISITED; w * h];
    let mut regions = Vec::new();
    let mut next_id = 0;

    for start in 0..w * h {
        if component[start] != UNVISITED {
            continue;
        }
        let Some(label) = labels[start] else { continue };

        let id = next_id;
        next_id += 1;
        component[start] = id;
        let mut stack = vec![start];
        let mut cells = Vec::new();
        while let Some(idx) = stack.pop() {
            cells.push(idx);
            for n in neighbours(idx, w, h).into_iter().flatten() {
                if component[n] == UNVISITED && labels[n] == Some(label) {
                    component[n] = id;
                    stack.push(n);
                }
            }
        }

        let rings = trace_rings(&cells, &component, id, w, h, tile);
        regions.push((label, assemble(rings, &field.grid().transform)));
    }

    regions
}

/// Up, right, down and left neighbours of a tile-local cell index.
fn neighbours(idx: usize, w: usize, h: usize) -> [Option<usize>; 4] {
    let (c, r) = (idx % w, idx / w);
    [
        (r > 0).then(|| idx - w),
        (c + 1 < w).then(|| idx + 1),
        (r + 1 < h).then(|| idx + w),
        (c > 0).then(|| idx - 1),
    ]
}

/// Closed boundary rings of one region. The region stays on the left of
/// every directed edge; at a vertex shared by two diagonal cells the left
/// turn wins, keeping diagonal neighbours apart.
fn trace_rings(
    cells: &[usize],
    component: &[usize],
    id: usize,
    w: usize,
    h: usize,
    tile: CellWindow,
) -> Vec<Vec<Vertex>> {
    let inside = |n: Option<usize>| n.is_some_and(|n| component[n] == id);

    let mut edges: Vec<(Vertex, Vertex)> = Vec::with_capacity(cells.len() * 2);
    for &idx in cells {
        let x = tile.col_start as i64 + (idx % w) as i64;
        let y = tile.row_start as i64 + (idx / w) as i64;
        let [up, right, down, left] = neighbours(idx, w, h);
        if !inside(up) {
            edges.push(((x, y), (x + 1, y)));
        }
        if !inside(right) {
            edges.push(((x + 1, y), (x + 1, y + 1)));
        }
        if !inside(down) {
            edges.push(((x + 1, y + 1), (x, y + 1)));
        }
        if !inside(left) {
            edges.push(((x, y + 1), (x, y)));
        }
    }

    let mut outgoing: HashMap<Vertex, Vec<usize>> = HashMap::new();
    for (i, (from, _)) in edges.iter().enumerate() {
        outgoing.entry(*from).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();
    for first in 0..edges.len() {
        if used[first] {
            continue;
        }
        let mut ring = Vec::new();
        let mut current = first;
        loop {
            used[current] = true;
            let (from, to) = edges[current];
            ring.push(from);
            let candidates = outgoing.get(&to).map(Vec::as_slice).unwrap_or_default();
            match next_edge(&edges, candidates, from, to) {
                Some(next) if !used[next] => current = next,
                _ => break,
            }
        }
        rings.push(drop_collinear(ring));
    }
    rings
}

/// Successor edge at `to`, preferring left, then straight, then right.
fn next_edge(edges: &[(Vertex, Vertex)], candidates: &[usize], from: Vertex, to: Vertex) -> Option<usize> {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let preference = [(-dy, dx), (dx, dy), (dy, -dx)];
    preference.iter().find_map(|&dir| {
        candidates.iter().copied().find(|&i| {
            let (a, b) = edges[i];
            (b.0 - a.0, b.1 - a.1) == dir
        })
    })
}

/// Remove vertices in the middle of straight runs of unit steps.
fn drop_collinear(ring: Vec<Vertex>) -> Vec<Vertex> {
    let n = ring.len();
    (0..n)
        .filter(|&i| {
            let p = ring[(i + n - 1) % n];
            let v = ring[i];
            let q = ring[(i + 1) % n];
            (v.0 - p.0, v.1 - p.1) != (q.0 - v.0, q.1 - v.1)
        })
        .map(|i| ring[i])
        .collect()
}

/// Twice the signed shoelace area in pixel space; positive for outer rings.
fn signed_area2(ring: &[Vertex]) -> i64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let (x1, y1) = ring[i];
            let (x2, y2) = ring[(i + 1) % n];
            x1 * y2 - x2 * y1
        })
        .sum()
}

/// Group rings into polygons and map them into the native frame.
fn assemble(rings: Vec<Vec<Vertex>>, transform: &GeoTransform) -> Vec<Polygon<f64>> {
    let (outer, holes): (Vec<_>, Vec<_>) = rings.into_iter().partition(|r| signed_area2(r) > 0);

    let mut groups: Vec<(Vec<Vertex>, Vec<Vec<Vertex>>)> = outer.into_iter().map(|r| (r, Vec::new())).collect();
    for hole in holes {
        let owner = if groups.len() == 1 {
            Some(0)
        } else {
            groups
                .iter()
                .enumerate()
                .filter(|(_, (ring, _))| encloses(ring, &hole))
                .min_by_key(|(_, (ring, _))| signed_area2(ring))
                .map(|(i, _)| i)
        };
        if let Some(i) = owner {
            groups[i].1.push(hole);
        }
    }

    let to_line = |ring: &[Vertex]| -> LineString<f64> {
        ring.iter()
            .map(|&(c, r)| {
                let (x, y) = transform.apply(c as f64, r as f64);
                Coord { x, y }
            })
            .collect::<Vec<_>>()
            .into()
    };

    groups
        .into_iter()
        .map(|(exterior, holes)| {
            Polygon::new(to_line(&exterior), holes.iter().map(|h| to_line(h)).collect())
                .orient(Direction::Default)
        })
        .collect()
}

/// Bounding-box containment of `inner` by `outer`.
fn encloses(outer: &[Vertex], inner: &[Vertex]) -> bool {
    let bounds = |ring: &[Vertex]| {
        ring.iter().fold((i64::MAX, i64::MAX, i64::MIN, i64::MIN), |b, &(x, y)| {
            (b.0.min(x), b.1.min(y), b.2.max(x), b.3.max(y))
        })
    };
    let o = bounds(outer);
    let i = bounds(inner);
    o.0 <= i.0 && o.1 <= i.1 && o.2 >= i.2 && o.3 >= i.3
}
