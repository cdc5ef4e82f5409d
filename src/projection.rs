use crate::viewport::Rect;

/// Latitude below which a coordinate may belong to the southern inset.
pub const INSET_MAX_LAT: f64 = 29.0;
/// Longitude below which a coordinate may belong to the southern inset.
pub const INSET_MAX_LNG: f64 = 130.0;

/// Share of the extent a fitted projection fills.
pub const FIT_MARGIN: f64 = 0.9;

/// Geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Point on the render surface. `y` grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn midpoint(&self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Linear projection anchored on a geographic midpoint.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AffineProjection {
    pub center_x: f64,
    pub center_y: f64,
    pub mid_lng: f64,
    pub mid_lat: f64,
    pub scale: f64,
}

impl AffineProjection {
    pub fn apply(&self, lat: f64, lng: f64) -> Point {
        Point {
            x: self.center_x + (lng - self.mid_lng) * self.scale,
            y: self.center_y - (lat - self.mid_lat) * self.scale,
        }
    }
}

/// Two independent projections: the main archipelago and the detached
/// southern islands drawn as an inset box elsewhere on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MapProjection {
    pub main: AffineProjection,
    pub inset: AffineProjection,
}

impl MapProjection {
    pub fn uses_inset(lat: f64, lng: f64) -> bool {
        lat < INSET_MAX_LAT && lng < INSET_MAX_LNG
    }

    /// Projects a coordinate onto the render surface.
    ///
    /// Out-of-range coordinates are not clamped; they simply land outside the
    /// visible canvas.
    pub fn project(&self, lat: f64, lng: f64) -> Point {
        if Self::uses_inset(lat, lng) {
            self.inset.apply(lat, lng)
        } else {
            self.main.apply(lat, lng)
        }
    }

    pub fn project_latlng(&self, position: LatLng) -> Point {
        self.project(position.lat, position.lng)
    }

    /// One projection for both halves that fits the box `south_west`..`north_east`
    /// into `extent`, centred, with [`FIT_MARGIN`] of slack.
    pub fn fit(extent: Rect, south_west: LatLng, north_east: LatLng) -> Self {
        let span_lng = (north_east.lng - south_west.lng).abs();
        let span_lat = (north_east.lat - south_west.lat).abs();
        let scale_for = |size: f64, span: f64| if span > 0.0 { size / span } else { f64::INFINITY };

        let scale = scale_for(extent.width, span_lng).min(scale_for(extent.height, span_lat)) * FIT_MARGIN;
        let center = extent.center();
        let affine = AffineProjection {
            center_x: center.x,
            center_y: center.y,
            mid_lng: (south_west.lng + north_east.lng) / 2.0,
            mid_lat: (south_west.lat + north_east.lat) / 2.0,
            scale: if scale.is_finite() && scale > 0.0 { scale } else { 1.0 },
        };

        Self {
            main: affine,
            inset: affine,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    #[error("failed to parse map calibration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("view box must contain four numbers, got `{0}`")]
    InvalidViewBox(String),
}

#[derive(Debug, Clone, Copy, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct MainCalibration {
    cx: f64,
    cy: f64,
    mid_lng: f64,
    mid_lat: f64,
    scale: f64,
}

#[derive(Debug, Clone, Copy, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsetCalibration {
    offset_x: f64,
    offset_y: f64,
    w: f64,
    h: f64,
    mid_lng: f64,
    mid_lat: f64,
    scale: f64,
}

#[derive(Debug, Clone, Copy, serde::Deserialize)]
struct Calibration {
    main: MainCalibration,
    #[serde(alias = "okinawa")]
    inset: InsetCalibration,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct SurfaceDocument {
    view_box: String,
    projection: Calibration,
}

impl From<Calibration> for MapProjection {
    fn from(calibration: Calibration) -> Self {
        let main = calibration.main;
        let inset = calibration.inset;

        Self {
            main: AffineProjection {
                center_x: main.cx,
                center_y: main.cy,
                mid_lng: main.mid_lng,
                mid_lat: main.mid_lat,
                scale: main.scale,
            },
            inset: AffineProjection {
                center_x: inset.offset_x + inset.w / 2.0,
                center_y: inset.offset_y + inset.h / 2.0,
                mid_lng: inset.mid_lng,
                mid_lat: inset.mid_lat,
                scale: inset.scale,
            },
        }
    }
}

/// A full map surface: its fixed coordinate extent and the projection onto it.
///
/// Both are calibration data shipped with the prefecture outlines, e.g.
/// `{"viewBox": "0 0 1000 800", "projection": {"main": {...}, "okinawa": {...}}}`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapSurface {
    pub extent: Rect,
    pub projection: MapProjection,
}

impl MapSurface {
    pub fn from_json(json: &str) -> Result<Self, ProjectionError> {
        let document: SurfaceDocument = serde_json::from_str(json)?;
        let extent = parse_view_box(&document.view_box)?;

        Ok(Self {
            extent,
            projection: document.projection.into(),
        })
    }

    pub fn project(&self, lat: f64, lng: f64) -> Point {
        self.projection.project(lat, lng)
    }
}

/// Parses `"x y width height"`. The size must be finite and positive.
pub fn parse_view_box(value: &str) -> Result<Rect, ProjectionError> {
    let numbers: Vec<f64> = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| ProjectionError::InvalidViewBox(value.to_string()))?;

    match numbers.as_slice() {
        [x, y, width, height] => {
            let rect = Rect::new(*x, *y, *width, *height);
            if rect.x.is_finite() && rect.y.is_finite() && rect.has_area() {
                Ok(rect)
            } else {
                Err(ProjectionError::InvalidViewBox(value.to_string()))
            }
        }
        _ => Err(ProjectionError::InvalidViewBox(value.to_string())),
    }
}
