//! Coordinate and name lookups over a [`PlaceGateway`].

use strsim::jaro_winkler;
use tracing::debug;

use crate::coordinate::Coordinate;
use crate::error::{Error, Result};
use crate::gateway::{AreaQuery, PlaceGateway};
use crate::graph::Place;

/// Largest page an area search may request.
pub const MAX_AREA_LIMIT: usize = 100;

/// Minimum Jaro-Winkler similarity for a name to be suggested.
pub const SUGGESTION_THRESHOLD: f64 = 0.75;

/// Validating front-end over the gateway's geocoding queries.
#[derive(Debug, Clone)]
pub struct Geocoder<G> {
    gateway: G,
}

impl<G: PlaceGateway> Geocoder<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Place at `position`, or the nearest one within the position tolerance.
    pub fn find_by_position(&self, position: &Coordinate) -> Result<Option<Place>> {
        let place = self.gateway.find_place_by_position(position)?;
        debug!(position = %position, found = place.is_some(), "position lookup");
        Ok(place)
    }

    /// Places whose name contains `pattern`, ignoring case.
    pub fn find_like_name(&self, pattern: &str) -> Result<Vec<Place>> {
        let pattern = require_pattern(pattern)?;
        let places = self.gateway.find_places_like_name(pattern)?;
        debug!(pattern, matches = places.len(), "name lookup");
        Ok(places)
    }

    /// Like [`Geocoder::find_like_name`], but an empty result becomes
    /// [`Error::NoMatchingPlace`] carrying similar names.
    pub fn require_like_name(&self, pattern: &str, suggestions: usize) -> Result<Vec<Place>> {
        let places = self.find_like_name(pattern)?;
        if places.is_empty() {
            return Err(Error::NoMatchingPlace {
                name: pattern.trim().to_string(),
                suggestions: self.suggest_names(pattern, suggestions)?,
            });
        }
        Ok(places)
    }

    /// Names of matching places inside the query circle, nearest first.
    pub fn find_names_in_area_like_name(&self, query: &AreaQuery) -> Result<Vec<String>> {
        require_pattern(&query.pattern)?;
        if !query.center.is_complete() {
            return Err(invalid("area center needs both latitude and longitude"));
        }
        if !query.radius.is_finite() || query.radius <= 0.0 {
            return Err(invalid("radius must be a positive number of meters"));
        }
        if query.limit == 0 || query.limit > MAX_AREA_LIMIT {
            return Err(invalid(format!(
                "limit must be between 1 and {MAX_AREA_LIMIT}"
            )));
        }

        let query = AreaQuery {
            pattern: query.pattern.trim().to_string(),
            ..query.clone()
        };
        let names = self.gateway.find_names_in_area(&query)?;
        debug!(
            pattern = %query.pattern,
            center = %query.center,
            radius = query.radius,
            matches = names.len(),
            "area lookup"
        );
        Ok(names)
    }

    /// Up to `limit` stored names most similar to `name`, best first.
    pub fn suggest_names(&self, name: &str, limit: usize) -> Result<Vec<String>> {
        let wanted = name.trim().to_lowercase();
        let mut scored: Vec<(f64, String)> = self
            .gateway
            .list_places()?
            .into_iter()
            .map(|place| {
                let score = jaro_winkler(&wanted, &place.name().to_lowercase());
                (score, place.name().to_string())
            })
            .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        scored.dedup_by(|a, b| a.1 == b.1);
        Ok(scored.into_iter().take(limit).map(|(_, name)| name).collect())
    }
}

fn require_pattern(pattern: &str) -> Result<&str> {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return Err(invalid("name pattern cannot be empty"));
    }
    Ok(pattern)
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidQuery {
        message: message.into(),
    }
}
