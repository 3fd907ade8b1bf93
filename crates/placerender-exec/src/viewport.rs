use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use placerender_core::{BBox, ImageSize, LonLat, Zoom};

/// Edge length of a Web Mercator tile in pixels.
pub const TILE_SIZE: f64 = 256.0;

/// Latitude limit of the square Web Mercator world.
pub const MAX_LAT: f64 = 85.051_128_78;

/// The area an image of `size` pixels covers when centered on `center` at `zoom`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: LonLat,
    pub zoom: Zoom,
    pub size: ImageSize,
}

impl Viewport {
    pub fn new(center: LonLat, zoom: Zoom, size: ImageSize) -> Self {
        Self { center, zoom, size }
    }

    /// Width of the whole world in pixels at this zoom.
    pub fn world_size(&self) -> f64 {
        TILE_SIZE * 2.0_f64.powi(self.zoom as i32)
    }

    /// Convert a coordinate to global pixel space at this zoom.
    pub fn lonlat_to_pixel(&self, p: &LonLat) -> (f64, f64) {
        let world = self.world_size();
        let lat_rad = p.lat.clamp(-MAX_LAT, MAX_LAT).to_radians();
        let x = (p.lon + 180.0) / 360.0 * world;
        let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * world;
        (x, y)
    }

    /// Convert a global pixel position back to a coordinate.
    pub fn pixel_to_lonlat(&self, x: f64, y: f64) -> LonLat {
        let world = self.world_size();
        let lon = x / world * 360.0 - 180.0;
        let lat = (PI * (1.0 - 2.0 * y / world)).sinh().atan().to_degrees();
        LonLat::new(lon, lat)
    }

    /// Geographic bounds of the image.
    pub fn bounds(&self) -> BBox {
        let (cx, cy) = self.lonlat_to_pixel(&self.center);
        let half_w = self.size.width as f64 / 2.0;
        let half_h = self.size.height as f64 / 2.0;
        let north_west = self.pixel_to_lonlat(cx - half_w, cy - half_h);
        let south_east = self.pixel_to_lonlat(cx + half_w, cy + half_h);
        BBox::new(
            LonLat::new(north_west.lon, south_east.lat),
            LonLat::new(south_east.lon, north_west.lat),
        )
    }
}
