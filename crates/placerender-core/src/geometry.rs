use serde::{Deserialize, Serialize};

/// A geographic coordinate in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// True when both components are finite and inside the WGS84 range.
    pub fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
    }
}

/// An axis-aligned geographic bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min: LonLat,
    pub max: LonLat,
}

impl BBox {
    pub fn new(min: LonLat, max: LonLat) -> Self {
        Self { min, max }
    }

    pub fn width(&self) -> f64 {
        self.max.lon - self.min.lon
    }

    pub fn height(&self) -> f64 {
        self.max.lat - self.min.lat
    }

    pub fn center(&self) -> LonLat {
        LonLat::new(
            (self.min.lon + self.max.lon) / 2.0,
            (self.min.lat + self.max.lat) / 2.0,
        )
    }

    pub fn contains(&self, p: &LonLat) -> bool {
        p.lon >= self.min.lon && p.lon <= self.max.lon && p.lat >= self.min.lat && p.lat <= self.max.lat
    }
}

/// Pixel dimensions of a rendered image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lonlat_validity() {
        assert!(LonLat::new(-122.4, 37.8).is_valid());
        assert!(!LonLat::new(181.0, 0.0).is_valid());
        assert!(!LonLat::new(0.0, f64::NAN).is_valid());
    }

    #[test]
    fn test_bbox_center() {
        let bb = BBox::new(LonLat::new(-10.0, -5.0), LonLat::new(10.0, 15.0));
        let c = bb.center();
        assert!((c.lon - 0.0).abs() < 1e-10);
        assert!((c.lat - 5.0).abs() < 1e-10);
        assert!(bb.contains(&c));
        assert!(!bb.contains(&LonLat::new(11.0, 0.0)));
    }

    #[test]
    fn test_image_size_empty() {
        assert!(ImageSize::new(0, 256).is_empty());
        assert!(!ImageSize::new(512, 256).is_empty());
    }
}
