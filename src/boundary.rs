use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt::Write;
use std::rc::Rc;

use geo::{BoundingRect, Coord, Geometry, MultiPolygon};
use geojson::GeoJson;

use crate::config::DataConfig;
use crate::projection::{LatLng, MapProjection};

/// A named, coded area from a boundary feature collection.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoRegion {
    pub code: String,
    pub name: String,
    /// Enclosing municipality, used to tell same-named wards apart.
    pub parent: Option<String>,
    /// Outline in longitude/latitude degrees (`x` = lng, `y` = lat).
    pub geometry: MultiPolygon<f64>,
}

impl GeoRegion {
    /// Display label with the parent municipality appended, e.g. `北区（堺市）`.
    pub fn display_label(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{}（{}）", self.name, parent),
            None => self.name.clone(),
        }
    }

    /// SVG path data of the outline projected onto the render surface.
    pub fn svg_path(&self, projection: &MapProjection) -> String {
        let mut path = String::new();

        for polygon in &self.geometry.0 {
            for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
                if ring.0.is_empty() {
                    continue;
                }
                for (index, coord) in ring.coords().enumerate() {
                    let point = projection.project(coord.y, coord.x);
                    let command = if index == 0 { 'M' } else { 'L' };
                    let _ = write!(path, "{command}{:.2},{:.2}", point.x, point.y);
                }
                path.push('Z');
            }
        }
        path
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum BoundaryError {
    #[error("boundary request failed with HTTP {status}")]
    Http { status: u16 },
    #[error("boundary request failed: {0}")]
    Network(String),
    #[error("failed to parse boundary data: {0}")]
    Parse(String),
}

/// Regions of one feature collection: the prefectures of the country, the
/// municipalities of one prefecture, or the districts of one municipality.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundaryCollection {
    regions: Vec<GeoRegion>,
}

impl BoundaryCollection {
    pub fn new(regions: Vec<GeoRegion>) -> Self {
        Self { regions }
    }

    pub fn from_geojson_str(text: &str) -> Result<Self, BoundaryError> {
        let geojson: GeoJson = text
            .parse()
            .map_err(|error: geojson::Error| BoundaryError::Parse(error.to_string()))?;
        Self::from_geojson(geojson)
    }

    /// Builds the collection from a `FeatureCollection`. Features lacking a
    /// name or code are skipped; features without geometry keep an empty outline.
    pub fn from_geojson(geojson: GeoJson) -> Result<Self, BoundaryError> {
        let GeoJson::FeatureCollection(collection) = geojson else {
            return Err(BoundaryError::Parse(
                "expected a FeatureCollection".to_string(),
            ));
        };

        let mut regions = Vec::with_capacity(collection.features.len());

        for feature in collection.features {
            let Some(properties) = feature.properties.as_ref() else {
                continue;
            };
            let (Some(name), Some(code)) = (
                string_property(properties, "name"),
                string_property(properties, "code"),
            ) else {
                continue;
            };
            let parent = string_property(properties, "parent");

            let geometry = match feature.geometry {
                Some(geometry) => to_multi_polygon(geometry.value)?,
                None => MultiPolygon::new(Vec::new()),
            };

            regions.push(GeoRegion {
                code,
                name,
                parent,
                geometry,
            });
        }

        Ok(Self { regions })
    }

    pub fn regions(&self) -> &[GeoRegion] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn find(&self, code: &str) -> Option<&GeoRegion> {
        self.regions.iter().find(|region| region.code == code)
    }

    /// South-west and north-east corners around every outline.
    pub fn bounds(&self) -> Option<(LatLng, LatLng)> {
        self.regions
            .iter()
            .filter_map(|region| region.geometry.bounding_rect())
            .map(|rect| (rect.min(), rect.max()))
            .reduce(|(min, max), (next_min, next_max)| {
                (
                    Coord {
                        x: min.x.min(next_min.x),
                        y: min.y.min(next_min.y),
                    },
                    Coord {
                        x: max.x.max(next_max.x),
                        y: max.y.max(next_max.y),
                    },
                )
            })
            .map(|(min, max)| (LatLng::new(min.y, min.x), LatLng::new(max.y, max.x)))
    }

    /// True when some display name is shared by more than one region.
    pub fn has_duplicate_names(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        self.regions.iter().any(|region| !seen.insert(region.name.as_str()))
    }
}

fn string_property(properties: &geojson::JsonObject, key: &str) -> Option<String> {
    match properties.get(key)? {
        serde_json::Value::String(value) if !value.is_empty() => Some(value.clone()),
        serde_json::Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

fn to_multi_polygon(value: geojson::Value) -> Result<MultiPolygon<f64>, BoundaryError> {
    let geometry: Geometry<f64> = value
        .try_into()
        .map_err(|error: geojson::Error| BoundaryError::Parse(error.to_string()))?;

    Ok(match geometry {
        Geometry::Polygon(polygon) => MultiPolygon::new(vec![polygon]),
        Geometry::MultiPolygon(multi) => multi,
        _ => MultiPolygon::new(Vec::new()),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundaryKind {
    /// Municipalities of one prefecture, keyed by prefecture code.
    Municipalities,
    /// Districts (大字・町) of one municipality, keyed by municipality code.
    Districts,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BoundaryKey {
    pub kind: BoundaryKind,
    pub code: String,
}

impl BoundaryKey {
    pub fn municipalities(prefecture_code: impl Into<String>) -> Self {
        Self {
            kind: BoundaryKind::Municipalities,
            code: prefecture_code.into(),
        }
    }

    pub fn districts(municipality_code: impl Into<String>) -> Self {
        Self {
            kind: BoundaryKind::Districts,
            code: municipality_code.into(),
        }
    }

    pub fn url(&self, config: &DataConfig) -> String {
        let dir = match self.kind {
            BoundaryKind::Municipalities => &config.geojson_dir,
            BoundaryKind::Districts => &config.oaza_dir,
        };
        format!(
            "{}/{}/{}.json",
            config.base_url.trim_end_matches('/'),
            dir,
            self.code
        )
    }
}

/// Read-only provider of boundary collections.
#[allow(async_fn_in_trait)]
pub trait BoundarySource {
    async fn fetch(&self, key: &BoundaryKey) -> Result<BoundaryCollection, BoundaryError>;
}

/// Process-wide cache in front of a [`BoundarySource`]. The first successful
/// fetch of a key is kept; later requests resolve from memory. Failures are
/// not cached.
pub struct BoundaryCache<S> {
    source: S,
    entries: RefCell<HashMap<BoundaryKey, Rc<BoundaryCollection>>>,
}

impl<S: BoundarySource> BoundaryCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            entries: RefCell::new(HashMap::new()),
        }
    }

    pub fn cached(&self, key: &BoundaryKey) -> Option<Rc<BoundaryCollection>> {
        self.entries.borrow().get(key).cloned()
    }

    pub async fn load(&self, key: &BoundaryKey) -> Result<Rc<BoundaryCollection>, BoundaryError> {
        if let Some(hit) = self.cached(key) {
            log::debug!("boundary cache hit for {:?} {}", key.kind, key.code);
            return Ok(hit);
        }

        log::debug!("fetching boundary data for {:?} {}", key.kind, key.code);
        let collection = Rc::new(self.source.fetch(key).await?);
        self.entries
            .borrow_mut()
            .entry(key.clone())
            .or_insert_with(|| collection.clone());

        Ok(collection)
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Idle,
    Loading,
    Ready(Rc<BoundaryCollection>),
    Failed(String),
}

/// Handle for one outstanding fetch. Once cancelled, its result is dropped.
#[derive(Debug, Clone)]
pub struct LoadTicket {
    key: BoundaryKey,
    cancelled: Rc<Cell<bool>>,
}

impl LoadTicket {
    pub fn key(&self) -> &BoundaryKey {
        &self.key
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

/// Loading state of the boundary data one quiz or map depends on.
///
/// The fetch itself is never aborted: tearing the owner down or switching
/// keys only marks the outstanding ticket cancelled so its result is ignored.
#[derive(Debug)]
pub struct BoundaryLoad {
    key: Option<BoundaryKey>,
    state: LoadState,
    pending: Option<Rc<Cell<bool>>>,
}

impl Default for BoundaryLoad {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundaryLoad {
    pub fn new() -> Self {
        Self {
            key: None,
            state: LoadState::Idle,
            pending: None,
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn key(&self) -> Option<&BoundaryKey> {
        self.key.as_ref()
    }

    pub fn data(&self) -> Option<Rc<BoundaryCollection>> {
        match &self.state {
            LoadState::Ready(data) => Some(data.clone()),
            _ => None,
        }
    }

    /// Starts loading `key`. Resolves immediately from the cache when possible;
    /// otherwise returns a ticket the caller fetches with and hands back to
    /// [`BoundaryLoad::complete`].
    pub fn begin<S: BoundarySource>(
        &mut self,
        key: BoundaryKey,
        cache: &BoundaryCache<S>,
    ) -> Option<LoadTicket> {
        self.cancel();

        if let Some(hit) = cache.cached(&key) {
            self.key = Some(key);
            self.state = LoadState::Ready(hit);
            return None;
        }

        let cancelled = Rc::new(Cell::new(false));
        self.pending = Some(cancelled.clone());
        self.key = Some(key.clone());
        self.state = LoadState::Loading;

        Some(LoadTicket { key, cancelled })
    }

    /// Applies a fetch result. Returns false when the ticket was cancelled.
    pub fn complete(
        &mut self,
        ticket: &LoadTicket,
        result: Result<Rc<BoundaryCollection>, BoundaryError>,
    ) -> bool {
        if ticket.is_cancelled() {
            log::debug!("discarding cancelled boundary load for {}", ticket.key.code);
            return false;
        }

        self.pending = None;
        self.state = match result {
            Ok(data) => LoadState::Ready(data),
            Err(error) => {
                log::warn!("boundary load for {} failed: {error}", ticket.key.code);
                LoadState::Failed(error.to_string())
            }
        };
        true
    }

    /// Re-requests the current key after a failure.
    pub fn retry<S: BoundarySource>(&mut self, cache: &BoundaryCache<S>) -> Option<LoadTicket> {
        if !matches!(self.state, LoadState::Failed(_)) {
            return None;
        }
        let key = self.key.clone()?;
        self.begin(key, cache)
    }

    pub fn cancel(&mut self) {
        if let Some(flag) = self.pending.take() {
            flag.set(true);
        }
    }

    /// Convenience driver for callers able to await in place.
    pub async fn load<S: BoundarySource>(&mut self, key: BoundaryKey, cache: &BoundaryCache<S>) {
        if let Some(ticket) = self.begin(key, cache) {
            let result = cache.load(ticket.key()).await;
            self.complete(&ticket, result);
        }
    }
}

impl Drop for BoundaryLoad {
    fn drop(&mut self) {
        self.cancel();
    }
}
