//! Toroidal grid addressing.
//!
//! The world is a square grid that wraps on both axes. Tiles are addressed
//! either by `(x, y)` or by a linear id in row-major order; zones partition
//! the grid into a fixed 4x4 arrangement of equal bands.

use spitfire_protocol::{TileId, ZoneId};

/// The grid is always partitioned into 4x4 = 16 zones.
pub const ZONE_COUNT: usize = 16;

const ZONE_BANDS: i32 = 4;

/// Linear id for `(x, y)`, wrapping both coordinates onto the torus.
///
/// Negative and `>= size` coordinates reduce with Euclidean modulo, so the
/// result is always in `[0, size * size)`.
#[inline]
pub fn tile_id(x: i32, y: i32, size: u32) -> TileId {
    let s = size as i32;
    let x = x.rem_euclid(s);
    let y = y.rem_euclid(s);
    TileId((y * s + x) as u32)
}

/// Inverse of [`tile_id`] on the normalized domain.
#[inline]
pub fn tile_xy(id: TileId, size: u32) -> (u32, u32) {
    (id.0 % size, id.0 / size)
}

/// Zone index for a normalized coordinate, row-major `0..=15`.
///
/// Returns `None` outside `[0, size) x [0, size)`; callers normalize first.
#[inline]
pub fn zone_of(x: i32, y: i32, size: u32) -> Option<ZoneId> {
    let s = size as i32;
    if x < 0 || y < 0 || x >= s || y >= s {
        return None;
    }
    let band = s / ZONE_BANDS;
    Some(ZoneId((y / band * ZONE_BANDS + x / band) as u8))
}

/// Zone of a linear tile id.
#[inline]
pub fn zone_of_tile(id: TileId, size: u32) -> Option<ZoneId> {
    let (x, y) = tile_xy(id, size);
    zone_of(x as i32, y as i32, size)
}
