/// Default tile edge length, matching the model's practical input size
pub const TILE_SIZE: u32 = 128;

/// Top-left origin of one tile on the padded canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
}

/// Partition of an image into non-overlapping fixed-size tiles.
///
/// The canvas is padded up to the next multiple of the tile size in each
/// axis; tiles are yielded in deterministic row-major order and cover the
/// padded canvas exactly.
#[derive(Debug, Clone, Copy)]
pub struct TileGrid {
    image_width: u32,
    image_height: u32,
    tile_size: u32,
}

impl TileGrid {
    pub fn new(image_width: u32, image_height: u32, tile_size: u32) -> Self {
        debug_assert!(tile_size > 0);
        Self {
            image_width,
            image_height,
            tile_size,
        }
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Image width rounded up to the next tile-size multiple
    pub fn padded_width(&self) -> u32 {
        self.image_width.div_ceil(self.tile_size) * self.tile_size
    }

    /// Image height rounded up to the next tile-size multiple
    pub fn padded_height(&self) -> u32 {
        self.image_height.div_ceil(self.tile_size) * self.tile_size
    }

    /// Number of tiles covering the padded canvas
    pub fn tile_count(&self) -> u32 {
        (self.padded_width() / self.tile_size) * (self.padded_height() / self.tile_size)
    }

    /// Tile origins in row-major order
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        let (pw, ph, t) = (self.padded_width(), self.padded_height(), self.tile_size);
        (0..ph)
            .step_by(t as usize)
            .flat_map(move |y| (0..pw).step_by(t as usize).map(move |x| Tile { x, y }))
    }
}
