//! Small 3D vector for normals and light directions.

/// A vector in a right-handed frame: x east, y north, z up.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    /// East component.
    pub x: f64,
    /// North component.
    pub y: f64,
    /// Up component.
    pub z: f64,
}

impl Vector3 {
    /// Create a vector from its components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Unit vector pointing at a light source.
    ///
    /// `azimuth` is clockwise from north and `zenith` is measured from the
    /// vertical, both in degrees.
    pub fn from_azimuth_zenith(azimuth: f64, zenith: f64) -> Self {
        let (az, zen) = (azimuth.to_radians(), zenith.to_radians());
        Self::new(az.sin() * zen.sin(), az.cos() * zen.sin(), zen.cos())
    }

    /// Dot product.
    pub fn dot(&self, other: &Vector3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Euclidean length.
    pub fn length(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// This vector scaled to unit length.
    pub fn normalized(&self) -> Vector3 {
        let len = self.length();
        Self::new(self.x / len, self.y / len, self.z / len)
    }
}
