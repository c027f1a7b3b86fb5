//! Gazetteer-backed geocoding with an explicit cache and remote quota
//!
//! Lookups resolve in three stages: provider-owned cache, built-in
//! gazetteer, then (when enabled and under quota) a remote Nominatim
//! query. Unresolvable names return `None`; the provider never fails a
//! lookup.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use tracing::{debug, warn};

use crisisnet_core::Coordinates;

use crate::traits::GeocodeProvider;

/// Well-known places and their coordinates (lowercased keys)
const GAZETTEER: &[(&str, f64, f64)] = &[
    ("new york", 40.7128, -74.0060),
    ("london", 51.5074, -0.1278),
    ("california", 36.7783, -119.4179),
    ("texas", 31.9686, -99.9018),
    ("japan", 36.2048, 138.2529),
    ("tokyo", 35.6762, 139.6503),
    ("delhi", 28.6139, 77.2090),
    ("mumbai", 19.0760, 72.8777),
    ("chennai", 13.0827, 80.2707),
    ("kolkata", 22.5726, 88.3639),
    ("kerala", 10.8505, 76.2711),
    ("sydney", -33.8688, 151.2093),
    ("melbourne", -37.8136, 144.9631),
    ("queensland", -20.9176, 142.7028),
    ("singapore", 1.3521, 103.8198),
    ("dubai", 25.2048, 55.2708),
    ("istanbul", 41.0082, 28.9784),
    ("paris", 48.8566, 2.3522),
    ("madrid", 40.4168, -3.7038),
    ("rome", 41.9028, 12.4964),
    ("berlin", 52.5200, 13.4050),
    ("moscow", 55.7558, 37.6173),
    ("toronto", 43.6532, -79.3832),
    ("vancouver", 49.2827, -123.1207),
    ("mexico city", 19.4326, -99.1332),
    ("sao paulo", -23.5558, -46.6396),
    ("buenos aires", -34.6037, -58.3816),
    ("lagos", 6.5244, 3.3792),
    ("nairobi", -1.2921, 36.8219),
    ("cape town", -33.9249, 18.4241),
    ("cairo", 30.0444, 31.2357),
    ("manila", 14.5995, 120.9842),
    ("jakarta", -6.2088, 106.8456),
    ("bangkok", 13.7563, 100.5018),
    ("seoul", 37.5665, 126.9780),
    ("beijing", 39.9042, 116.4074),
    ("shanghai", 31.2304, 121.4737),
    ("hong kong", 22.3193, 114.1694),
    ("los angeles", 34.0522, -118.2437),
    ("san francisco", 37.7749, -122.4194),
    ("chicago", 41.8781, -87.6298),
    ("miami", 25.7617, -80.1918),
    ("washington", 38.9072, -77.0369),
    ("boston", 42.3601, -71.0589),
    ("usa", 37.0902, -95.7129),
    ("united states", 37.0902, -95.7129),
    ("india", 20.5937, 78.9629),
    ("china", 35.8617, 104.1954),
    ("australia", -25.2744, 133.7751),
    ("canada", 56.1304, -106.3468),
    ("brazil", -14.2350, -51.9253),
    ("germany", 51.1657, 10.4515),
    ("france", 46.2276, 2.2137),
    ("italy", 41.8719, 12.5674),
    ("spain", 40.4637, -3.7492),
    ("turkey", 38.9637, 35.2433),
    ("mexico", 23.6345, -102.5528),
    ("indonesia", -0.7893, 113.9213),
    ("philippines", 12.8797, 121.7740),
    ("thailand", 15.8700, 100.9925),
    ("pakistan", 30.3753, 69.3451),
    ("bangladesh", 23.6850, 90.3563),
    ("nepal", 28.3949, 84.1240),
];

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";

/// Geocoder configuration
#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    /// Query Nominatim for names missing from the gazetteer
    pub enable_remote: bool,
    /// Hard cap on remote lookups over the provider's lifetime
    pub max_remote_lookups: usize,
    /// User agent sent with remote requests
    pub user_agent: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            enable_remote: false,
            max_remote_lookups: 75,
            user_agent: "crisisnet-geocoder/0.1".to_string(),
        }
    }
}

/// Gazetteer + cache + optional remote lookup [`GeocodeProvider`]
pub struct GazetteerGeocoder {
    config: GeocoderConfig,
    cache: DashMap<String, Coordinates>,
    remote_lookups: AtomicUsize,
    client: reqwest::Client,
}

impl GazetteerGeocoder {
    pub fn new(config: GeocoderConfig) -> Self {
        Self {
            config,
            cache: DashMap::new(),
            remote_lookups: AtomicUsize::new(0),
            client: reqwest::Client::new(),
        }
    }

    /// Number of remote lookups performed so far
    pub fn remote_lookup_count(&self) -> usize {
        self.remote_lookups.load(Ordering::Relaxed)
    }

    fn gazetteer_lookup(key: &str) -> Option<Coordinates> {
        GAZETTEER
            .iter()
            .find(|(name, _, _)| *name == key)
            .map(|&(_, lat, lon)| Coordinates::new(lat, lon))
    }

    async fn remote_lookup(&self, place: &str) -> Option<Coordinates> {
        #[derive(Deserialize)]
        struct NominatimHit {
            lat: String,
            lon: String,
        }

        let response = self
            .client
            .get(NOMINATIM_URL)
            .header(reqwest::header::USER_AGENT, &self.config.user_agent)
            .query(&[("q", place), ("format", "json"), ("limit", "1")])
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!("remote geocode request failed for {place}: {e}");
                return None;
            }
        };

        let hits: Vec<NominatimHit> = match response.json().await {
            Ok(h) => h,
            Err(e) => {
                warn!("remote geocode parse failed for {place}: {e}");
                return None;
            }
        };

        let hit = hits.first()?;
        let lat = hit.lat.parse::<f64>().ok()?;
        let lon = hit.lon.parse::<f64>().ok()?;
        Some(Coordinates::new(lat, lon))
    }
}

impl Default for GazetteerGeocoder {
    fn default() -> Self {
        Self::new(GeocoderConfig::default())
    }
}

#[async_trait]
impl GeocodeProvider for GazetteerGeocoder {
    async fn geocode(&self, place: &str) -> Option<Coordinates> {
        let key = place.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }

        if let Some(cached) = self.cache.get(&key) {
            return Some(*cached);
        }

        if let Some(coords) = Self::gazetteer_lookup(&key) {
            self.cache.insert(key, coords);
            return Some(coords);
        }

        if !self.config.enable_remote {
            return None;
        }

        // Quota check is advisory: a concurrent burst may slightly overshoot
        if self.remote_lookups.load(Ordering::Relaxed) >= self.config.max_remote_lookups {
            debug!("remote geocode quota exhausted, skipping {place}");
            return None;
        }

        let coords = self.remote_lookup(place).await?;
        self.remote_lookups.fetch_add(1, Ordering::Relaxed);
        self.cache.insert(key, coords);
        Some(coords)
    }
}
