use geo::{BoundingRect, Contains, Coord, Geometry, MultiPolygon, Point, Rect};
use geojson::{GeoJson, feature::Id};
use log::{debug, warn};
use std::rc::Rc;

/// Numeric region code: two-digit FIPS for states, five-digit for counties.
pub type RegionId = u32;

/// Raised when a boundary cannot be evaluated for containment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryFault;

/// A state or county boundary.
#[derive(Debug, Clone)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
    shape: MultiPolygon<f64>,
    bbox: Option<Rect<f64>>,
    /// Every ring closed and finite; fixed at construction.
    evaluable: bool,
}

impl Region {
    pub fn new(id: RegionId, name: impl Into<String>, shape: MultiPolygon<f64>) -> Self {
        let bbox = shape.bounding_rect();
        let evaluable = bbox.is_some()
            && shape.0.iter().all(|poly| {
                std::iter::once(poly.exterior())
                    .chain(poly.interiors())
                    .all(|ring| ring.0.len() >= 4 && ring.0.iter().all(|c| c.x.is_finite() && c.y.is_finite()))
            });
        Self { id, name: name.into(), shape, bbox, evaluable }
    }

    /// County codes carry their state's code in the leading digits.
    pub fn parent_state(&self) -> RegionId {
        self.id / 1000
    }

    pub fn shape(&self) -> &MultiPolygon<f64> {
        &self.shape
    }

    pub fn bbox(&self) -> Option<Rect<f64>> {
        self.bbox
    }

    /// Point-in-polygon test; rings that are too short or carry non-finite
    /// coordinates cannot be evaluated.
    pub fn try_contains(&self, lon: f64, lat: f64) -> Result<bool, GeometryFault> {
        let (Some(bbox), true) = (self.bbox, self.evaluable) else {
            return Err(GeometryFault);
        };
        if !lon.is_finite() || !lat.is_finite() {
            return Err(GeometryFault);
        }
        let (min, max) = (bbox.min(), bbox.max());
        if lon < min.x || lon > max.x || lat < min.y || lat > max.y {
            return Ok(false);
        }
        Ok(self.shape.contains(&Point::new(lon, lat)))
    }
}

/// Reads every Polygon/MultiPolygon feature of a FeatureCollection.
/// Features without a usable id or geometry are skipped.
pub fn regions_from_geojson(raw: GeoJson) -> Vec<Rc<Region>> {
    let mut items = Vec::new();

    let GeoJson::FeatureCollection(fc) = raw else {
        warn!("geometry source is not a FeatureCollection");
        return items;
    };

    for feature in fc.features {
        let property = |key: &str| {
            feature
                .properties
                .as_ref()
                .and_then(|p| p.get(key))
                .cloned()
        };

        let id = match &feature.id {
            Some(Id::String(s)) => s.trim().parse::<RegionId>().ok(),
            Some(Id::Number(n)) => n.as_u64().and_then(|n| RegionId::try_from(n).ok()),
            None => property("id").and_then(|v| match v {
                serde_json::Value::String(s) => s.trim().parse().ok(),
                serde_json::Value::Number(n) => n.as_u64().and_then(|n| RegionId::try_from(n).ok()),
                _ => None,
            }),
        };
        let Some(id) = id else {
            debug!("skipping feature without numeric id");
            continue;
        };

        let name = property("name")
            .or_else(|| property("NAME"))
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_default();

        let Some(gj) = feature.geometry else {
            continue;
        };
        let geom: Geometry<f64> = match gj.value.try_into() {
            Ok(geom) => geom,
            Err(err) => {
                warn!("skipping region {id}: {err}");
                continue;
            }
        };
        let shape = match geom {
            Geometry::Polygon(p) => p.into(),
            Geometry::MultiPolygon(m) => m,
            _ => continue,
        };

        items.push(Rc::new(Region::new(id, name, shape)));
    }

    items
}

/// Smallest rectangle covering every region in the slice.
pub fn bounds_of<'a>(regions: impl IntoIterator<Item = &'a Rc<Region>>) -> Option<Rect<f64>> {
    regions
        .into_iter()
        .filter_map(|r| r.bbox())
        .reduce(|a, b| {
            Rect::new(
                Coord { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                Coord { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
            )
        })
}
