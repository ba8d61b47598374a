// THEORY:
// The blob detector turns a chunk heatmap into a list of distinct hot regions.
// Each region is treated as one vehicle by the counter. It uses heatmap peak
// finding followed by region growing, which keeps two cars that touch at a
// diagonal apart and lets a single large vehicle stay one region.
//
// 1.  **Peak Finding (Seeding)**: a chunk at or above the threshold that no
//     8-neighbour beats is a peak. Peaks are where a region starts growing.
// 2.  **Region Growing**: from each unvisited peak, a breadth-first walk adds
//     4-connected neighbours whose heat stays at or above the threshold.
// 3.  **Leftover Regions**: a region whose hottest chunk sits diagonally next
//     to a hotter chunk of another region has no peak of its own. Every hot
//     chunk still unvisited after growing from the peaks seeds one more
//     region, hottest first, so no region goes uncounted.
// 4.  **Aggregation**: every grown region is summarised as a `VehicleBlob`
//     with its bounding box, area and heat-weighted centre.
//
// The detector is stateless: one heatmap in, one list of blobs out.

use crate::core_modules::heatmap::ChunkHeatmap;
use std::collections::VecDeque;

/// A coordinate on the chunk grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridPoint {
    pub x: u32,
    pub y: u32,
}

/// A connected region of hot chunks in a single frame.
#[derive(Debug, Clone)]
pub struct VehicleBlob {
    /// Top-left and bottom-right chunk of the enclosing box.
    pub bounding_box: (GridPoint, GridPoint),
    pub size_in_chunks: usize,
    pub peak_heat: f64,
    /// Heat-weighted centre in chunk coordinates.
    pub center_of_mass: (f64, f64),
}

/// Finds every connected region whose chunks are at least `threshold` hot.
pub fn find_blobs(heatmap: &ChunkHeatmap, threshold: f64) -> Vec<VehicleBlob> {
    let width = heatmap.grid_width;
    let height = heatmap.grid_height;

    // --- 1. Peak Finding ---
    let mut peaks: Vec<GridPoint> = Vec::new();
    let mut hot: Vec<GridPoint> = Vec::new();
    for y in 0..height {
        for x in 0..width {
            let heat = heatmap.at(x, y);
            if heat < threshold {
                continue;
            }
            hot.push(GridPoint { x, y });
            let beaten = neighbours8(x, y, width, height).any(|n| heatmap.at(n.x, n.y) > heat);
            if !beaten {
                peaks.push(GridPoint { x, y });
            }
        }
    }
    // Hottest first, so each region is seeded from its strongest point.
    sort_hottest_first(&mut peaks, heatmap);
    sort_hottest_first(&mut hot, heatmap);

    // --- 2. Region Growing ---
    let mut visited = vec![false; (width * height) as usize];
    let mut blobs = Vec::new();
    for peak in peaks {
        if visited[(peak.y * width + peak.x) as usize] {
            continue;
        }
        blobs.push(grow_from_peak(peak, heatmap, threshold, &mut visited));
    }

    // --- 3. Leftover Regions ---
    for seed in hot {
        if visited[(seed.y * width + seed.x) as usize] {
            continue;
        }
        blobs.push(grow_from_peak(seed, heatmap, threshold, &mut visited));
    }
    blobs
}

fn sort_hottest_first(points: &mut [GridPoint], heatmap: &ChunkHeatmap) {
    points.sort_by(|a, b| heatmap.at(b.x, b.y).total_cmp(&heatmap.at(a.x, a.y)));
}

fn grow_from_peak(
    peak: GridPoint,
    heatmap: &ChunkHeatmap,
    threshold: f64,
    visited: &mut [bool],
) -> VehicleBlob {
    let width = heatmap.grid_width;
    let height = heatmap.grid_height;
    let mut region = Vec::new();
    let mut queue = VecDeque::from([peak]);
    visited[(peak.y * width + peak.x) as usize] = true;

    while let Some(current) = queue.pop_front() {
        region.push(current);
        for n in neighbours4(current.x, current.y, width, height) {
            let index = (n.y * width + n.x) as usize;
            if !visited[index] && heatmap.at(n.x, n.y) >= threshold {
                visited[index] = true;
                queue.push_back(n);
            }
        }
    }

    // --- 4. Aggregation ---
    let mut min = GridPoint { x: u32::MAX, y: u32::MAX };
    let mut max = GridPoint { x: 0, y: 0 };
    let mut total_heat = 0.0;
    let mut weighted = (0.0, 0.0);
    for point in &region {
        min.x = min.x.min(point.x);
        min.y = min.y.min(point.y);
        max.x = max.x.max(point.x);
        max.y = max.y.max(point.y);
        let heat = heatmap.at(point.x, point.y);
        total_heat += heat;
        weighted.0 += point.x as f64 * heat;
        weighted.1 += point.y as f64 * heat;
    }

    VehicleBlob {
        bounding_box: (min, max),
        size_in_chunks: region.len(),
        peak_heat: heatmap.at(peak.x, peak.y),
        center_of_mass: if total_heat > 0.0 {
            (weighted.0 / total_heat, weighted.1 / total_heat)
        } else {
            (peak.x as f64, peak.y as f64)
        },
    }
}

fn neighbours8(x: u32, y: u32, width: u32, height: u32) -> impl Iterator<Item = GridPoint> {
    const OFFSETS: [(i64, i64); 8] = [
        (-1, -1),
        (0, -1),
        (1, -1),
        (-1, 0),
        (1, 0),
        (-1, 1),
        (0, 1),
        (1, 1),
    ];
    offset_points(x, y, width, height, &OFFSETS)
}

fn neighbours4(x: u32, y: u32, width: u32, height: u32) -> impl Iterator<Item = GridPoint> {
    const OFFSETS: [(i64, i64); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];
    offset_points(x, y, width, height, &OFFSETS)
}

fn offset_points(
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    offsets: &'static [(i64, i64)],
) -> impl Iterator<Item = GridPoint> {
    offsets.iter().filter_map(move |(dx, dy)| {
        let nx = x as i64 + dx;
        let ny = y as i64 + dy;
        (nx >= 0 && nx < width as i64 && ny >= 0 && ny < height as i64).then(|| GridPoint {
            x: nx as u32,
            y: ny as u32,
        })
    })
}
