//! Geographic primitives: points and bounding boxes.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use crate::error::ConfigError;

/// A geographic point with latitude and longitude in degrees.
///
/// Equality and hashing compare the raw bits of both coordinates, so a
/// `GeoPoint` can key the precomputed travel time matrix.
///
/// # Examples
///
/// ```
/// use route_chain::geo::GeoPoint;
///
/// let philadelphia = GeoPoint::new(39.9526, -75.1652);
/// assert_eq!(philadelphia, GeoPoint::new(39.9526, -75.1652));
/// assert_ne!(philadelphia, GeoPoint::new(40.7128, -74.0060));
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
}

impl GeoPoint {
    /// Creates a new point.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Returns `(latitude, longitude)`.
    #[inline]
    pub fn as_tuple(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    /// True when both coordinates compare equal as floats.
    #[inline]
    pub fn same_coordinates(&self, other: &GeoPoint) -> bool {
        self.latitude == other.latitude && self.longitude == other.longitude
    }
}

impl PartialEq for GeoPoint {
    fn eq(&self, other: &Self) -> bool {
        self.latitude.to_bits() == other.latitude.to_bits()
            && self.longitude.to_bits() == other.longitude.to_bits()
    }
}

impl Eq for GeoPoint {}

impl Hash for GeoPoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.latitude.to_bits().hash(state);
        self.longitude.to_bits().hash(state);
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.latitude, self.longitude)
    }
}

/// Rectangular area of interest, used for map display and validation.
///
/// The north-east corner is always strictly north-east of the south-west one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    south_west: GeoPoint,
    north_east: GeoPoint,
}

impl BoundingBox {
    /// Creates a bounding box, rejecting corners that are not strictly ordered.
    ///
    /// # Examples
    ///
    /// ```
    /// use route_chain::geo::{BoundingBox, GeoPoint};
    ///
    /// let bbox = BoundingBox::new(GeoPoint::new(39.9, -75.2), GeoPoint::new(40.0, -75.1));
    /// assert!(bbox.is_ok());
    ///
    /// let flipped = BoundingBox::new(GeoPoint::new(40.0, -75.1), GeoPoint::new(39.9, -75.2));
    /// assert!(flipped.is_err());
    /// ```
    pub fn new(south_west: GeoPoint, north_east: GeoPoint) -> Result<Self, ConfigError> {
        if north_east.latitude <= south_west.latitude || north_east.longitude <= south_west.longitude {
            return Err(ConfigError::InvalidBounds {
                south_west: south_west.as_tuple(),
                north_east: north_east.as_tuple(),
            });
        }
        Ok(Self {
            south_west,
            north_east,
        })
    }

    /// Smallest box enclosing all points.
    ///
    /// Returns `None` for an empty set or when the points share a latitude
    /// or a longitude, since such a box has no area.
    pub fn enclosing<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a GeoPoint>,
    {
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lon = f64::MAX;
        let mut max_lon = f64::MIN;
        let mut any = false;

        for point in points {
            any = true;
            min_lat = min_lat.min(point.latitude);
            max_lat = max_lat.max(point.latitude);
            min_lon = min_lon.min(point.longitude);
            max_lon = max_lon.max(point.longitude);
        }

        if !any {
            return None;
        }
        Self::new(GeoPoint::new(min_lat, min_lon), GeoPoint::new(max_lat, max_lon)).ok()
    }

    pub fn south_west(&self) -> GeoPoint {
        self.south_west
    }

    pub fn north_east(&self) -> GeoPoint {
        self.north_east
    }

    /// Expands the box by a factor of its size on each side (0.1 = 10%).
    pub fn expand(&self, factor: f64) -> Self {
        let lat_pad = (self.north_east.latitude - self.south_west.latitude) * factor;
        let lon_pad = (self.north_east.longitude - self.south_west.longitude) * factor;

        Self {
            south_west: GeoPoint::new(
                self.south_west.latitude - lat_pad,
                self.south_west.longitude - lon_pad,
            ),
            north_east: GeoPoint::new(
                self.north_east.latitude + lat_pad,
                self.north_east.longitude + lon_pad,
            ),
        }
    }

    /// True if the point lies inside or on the edge of the box.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.latitude >= self.south_west.latitude
            && point.latitude <= self.north_east.latitude
            && point.longitude >= self.south_west.longitude
            && point.longitude <= self.north_east.longitude
    }
}
