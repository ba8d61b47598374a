// THEORY:
// The heatmap is the bridge between a raw frame and the blob detector. The
// frame is cut into square chunks, each chunk is reduced to its average
// luminance, and the "heat" of a chunk is how far that luminance sits from
// the background of the scene. A vehicle on an empty road shows up as a patch
// of hot chunks; the road itself stays cold.
//
// Key principles:
// 1.  **Spatial Pooling**: averaging a whole chunk removes single-pixel sensor
//     noise and shrinks the problem from pixels to a small grid.
// 2.  **Single Frame**: there is no history here. The background is either
//     supplied or estimated from the frame itself as the median chunk
//     luminance, on the assumption that most of a camera's view is road.
// 3.  **Edges Dropped**: partial chunks on the right and bottom borders are
//     ignored, so every cell has the same pixel area.

use image::RgbaImage;

/// Rec. 601 luma of an RGB triple.
pub fn luminance(red: u8, green: u8, blue: u8) -> f64 {
    0.299 * red as f64 + 0.587 * green as f64 + 0.114 * blue as f64
}

/// How the cold level of a scene is chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Background {
    /// A fixed luminance, e.g. measured from an empty road.
    Fixed(f64),
    /// The median chunk luminance of the frame being analysed.
    Median,
}

/// Per-chunk distance from the background, laid out row-major.
#[derive(Debug, Clone)]
pub struct ChunkHeatmap {
    pub grid_width: u32,
    pub grid_height: u32,
    heat: Vec<f64>,
}

impl ChunkHeatmap {
    /// Builds the heatmap. Returns `None` when the frame is smaller than one chunk.
    pub fn from_frame(frame: &RgbaImage, chunk_size: u32, background: Background) -> Option<Self> {
        if chunk_size == 0 {
            return None;
        }
        let grid_width = frame.width() / chunk_size;
        let grid_height = frame.height() / chunk_size;
        if grid_width == 0 || grid_height == 0 {
            return None;
        }

        // --- 1. Chunk Averages ---
        let mut averages = Vec::with_capacity((grid_width * grid_height) as usize);
        for chunk_y in 0..grid_height {
            for chunk_x in 0..grid_width {
                averages.push(chunk_luminance(frame, chunk_x, chunk_y, chunk_size));
            }
        }

        // --- 2. Background Level ---
        let cold = match background {
            Background::Fixed(level) => level,
            Background::Median => median(&averages),
        };

        // --- 3. Heat ---
        let heat = averages.iter().map(|lum| (lum - cold).abs()).collect();

        Some(Self {
            grid_width,
            grid_height,
            heat,
        })
    }

    #[cfg(test)]
    pub(crate) fn from_values(grid_width: u32, grid_height: u32, heat: Vec<f64>) -> Self {
        assert_eq!(heat.len(), (grid_width * grid_height) as usize);
        Self {
            grid_width,
            grid_height,
            heat,
        }
    }

    pub fn at(&self, x: u32, y: u32) -> f64 {
        self.heat[(y * self.grid_width + x) as usize]
    }

    pub fn values(&self) -> &[f64] {
        &self.heat
    }
}

fn chunk_luminance(frame: &RgbaImage, chunk_x: u32, chunk_y: u32, chunk_size: u32) -> f64 {
    let start_x = chunk_x * chunk_size;
    let start_y = chunk_y * chunk_size;
    let mut total = 0.0;
    for y in start_y..start_y + chunk_size {
        for x in start_x..start_x + chunk_size {
            let p = frame.get_pixel(x, y);
            total += luminance(p[0], p[1], p[2]);
        }
    }
    total / (chunk_size * chunk_size) as f64
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn uniform_frame_is_cold_against_its_median() {
        let frame = RgbaImage::from_pixel(40, 30, Rgba([90, 90, 90, 255]));
        let map = ChunkHeatmap::from_frame(&frame, 10, Background::Median).unwrap();
        assert_eq!((map.grid_width, map.grid_height), (4, 3));
        assert!(map.values().iter().all(|h| h.abs() < 1e-9));
    }

    #[test]
    fn bright_chunk_is_hot_against_fixed_background() {
        let mut frame = RgbaImage::from_pixel(20, 20, Rgba([0, 0, 0, 255]));
        for y in 0..10 {
            for x in 10..20 {
                frame.put_pixel(x, y, Rgba([200, 200, 200, 255]));
            }
        }
        let map = ChunkHeatmap::from_frame(&frame, 10, Background::Fixed(0.0)).unwrap();
        assert!((map.at(1, 0) - 200.0).abs() < 1e-6);
        assert_eq!(map.at(0, 0), 0.0);
        assert_eq!(map.at(1, 1), 0.0);
    }

    #[test]
    fn frame_smaller_than_a_chunk_has_no_heatmap() {
        let frame = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255]));
        assert!(ChunkHeatmap::from_frame(&frame, 10, Background::Median).is_none());
        assert!(ChunkHeatmap::from_frame(&frame, 0, Background::Median).is_none());
    }

    #[test]
    fn median_of_even_count_is_midpoint() {
        assert_eq!(median(&[1.0, 9.0, 3.0, 5.0]), 4.0);
    }
}
