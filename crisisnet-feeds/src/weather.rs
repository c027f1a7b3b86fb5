//! Hazard alerts derived from Open-Meteo weather forecasts
//!
//! Forecast weather codes plus precipitation and wind-gust intensity map
//! onto the common severity scale; only locations with an elevated-or-worse
//! hour in the next day produce an alert.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::{debug, warn};

use crisisnet_core::{Coordinates, HazardAlert, Severity};
use crisisnet_ports::{GeocodeProvider, HazardFeed, PortError};

const OPEN_METEO_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Distinct locations queried per fetch, to bound API traffic
const MAX_FEED_LOCATIONS: usize = 15;

/// Classify a forecast hour into a severity level
pub fn severity_from_weathercode(code: u16, precipitation_mm: f64, wind_gust_ms: f64) -> Severity {
    // Thunderstorm / severe convective weather
    if matches!(code, 95 | 96 | 99) {
        return Severity::Critical;
    }

    // Violent showers and heavy snow showers
    if matches!(code, 82 | 85 | 86) {
        return Severity::High;
    }

    // Wind gusts (m/s; 20 is roughly 72 km/h)
    if wind_gust_ms >= 20.0 {
        return Severity::High;
    }
    if wind_gust_ms >= 15.0 {
        return Severity::Elevated;
    }

    // Precipitation (mm in one hour)
    if precipitation_mm >= 20.0 {
        return Severity::High;
    }
    if precipitation_mm >= 5.0 {
        return Severity::Elevated;
    }

    // Remaining rain/snow codes
    if code >= 60 {
        return Severity::Elevated;
    }

    Severity::Normal
}

/// Human-readable event name for an Open-Meteo weather code
pub fn event_name_from_weathercode(code: u16) -> &'static str {
    match code {
        0 => "Clear Weather",
        1 => "Mainly Clear",
        2 => "Partly Cloudy",
        3 => "Overcast",
        45 => "Fog Alert",
        48 => "Rime Fog Alert",
        51 => "Light Drizzle",
        53 => "Moderate Drizzle",
        55 => "Dense Drizzle",
        61 => "Light Rain",
        63 => "Moderate Rain",
        65 => "Heavy Rain",
        66 => "Light Freezing Rain",
        67 => "Heavy Freezing Rain",
        71 => "Slight Snowfall",
        73 => "Moderate Snowfall",
        75 => "Heavy Snowfall",
        77 => "Snow Grains",
        80 => "Slight Rain Showers",
        81 => "Moderate Rain Showers",
        82 => "Violent Rain Showers",
        85 => "Slight Snow Showers",
        86 => "Heavy Snow Showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with Hail",
        99 => "Severe Thunderstorm with Hail",
        _ => "Weather Alert",
    }
}

#[derive(Debug, Default, Deserialize)]
struct HourlyForecast {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    weathercode: Vec<u16>,
    #[serde(default)]
    precipitation: Vec<Option<f64>>,
    #[serde(default)]
    windgusts_10m: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    hourly: Option<HourlyForecast>,
}

/// Pick the most severe hour and turn it into an alert (normal hours yield none)
fn alert_from_forecast(
    hourly: &HourlyForecast,
    coords: Coordinates,
    location_name: &str,
) -> Option<HazardAlert> {
    let n = hourly.time.len().min(hourly.weathercode.len());
    if n == 0 {
        return None;
    }

    let mut best_idx = 0usize;
    let mut best = Severity::Normal;
    for i in 0..n {
        let precip = hourly.precipitation.get(i).copied().flatten().unwrap_or(0.0);
        let gust = hourly.windgusts_10m.get(i).copied().flatten().unwrap_or(0.0);
        let severity = severity_from_weathercode(hourly.weathercode[i], precip, gust);
        if severity.rank() > best.rank() {
            best = severity;
            best_idx = i;
        }
    }

    if best == Severity::Normal {
        return None;
    }

    let code = hourly.weathercode[best_idx];
    let precip = hourly
        .precipitation
        .get(best_idx)
        .copied()
        .flatten()
        .unwrap_or(0.0);
    let gust = hourly
        .windgusts_10m
        .get(best_idx)
        .copied()
        .flatten()
        .unwrap_or(0.0);
    let event = event_name_from_weathercode(code);

    let mut description = format!(
        "Forecasted {} for {} based on Open-Meteo data.",
        event.to_lowercase(),
        location_name
    );
    if precip > 0.0 {
        description.push_str(&format!(" Precipitation intensity around {precip:.1} mm/h."));
    }
    if gust > 0.0 {
        description.push_str(&format!(" Wind gusts up to {gust:.1} m/s."));
    }

    // Open-Meteo returns naive ISO timestamps in the requested zone (UTC)
    let start_time = hourly.time.get(best_idx).and_then(|t| {
        NaiveDateTime::parse_from_str(t, "%Y-%m-%dT%H:%M")
            .ok()
            .map(|dt| dt.and_utc())
    });

    Some(HazardAlert {
        event: event.to_string(),
        severity: best,
        lat: coords.lat,
        lon: coords.lon,
        start_time,
        end_time: None,
        provider: "Open-Meteo Forecast Service".to_string(),
        description: Some(description),
        location_name: Some(location_name.to_string()),
    })
}

/// [`HazardFeed`] backed by Open-Meteo forecasts for a set of corpus locations
pub struct OpenMeteoFeed {
    client: reqwest::Client,
    geocoder: Arc<dyn GeocodeProvider>,
    locations: Vec<String>,
}

impl OpenMeteoFeed {
    pub fn new(geocoder: Arc<dyn GeocodeProvider>, locations: Vec<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            geocoder,
            locations,
        }
    }

    async fn fetch_forecast(&self, coords: Coordinates) -> Result<ForecastResponse, PortError> {
        let response = self
            .client
            .get(OPEN_METEO_URL)
            .query(&[
                ("latitude", coords.lat.to_string()),
                ("longitude", coords.lon.to_string()),
                ("hourly", "weathercode,precipitation,windgusts_10m".to_string()),
                ("forecast_days", "1".to_string()),
                ("timezone", "UTC".to_string()),
            ])
            .send()
            .await
            .map_err(|e| PortError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PortError::Unavailable(format!(
                "open-meteo returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| PortError::Parse(e.to_string()))
    }
}

#[async_trait]
impl HazardFeed for OpenMeteoFeed {
    async fn fetch(&self) -> Result<Vec<HazardAlert>, PortError> {
        let mut alerts = Vec::new();
        let mut seen_names: HashSet<String> = HashSet::new();
        let mut seen_coords: HashSet<(i64, i64)> = HashSet::new();

        for location in &self.locations {
            let name = location.trim();
            if name.is_empty() || !seen_names.insert(name.to_lowercase()) {
                continue;
            }
            if seen_names.len() > MAX_FEED_LOCATIONS {
                break;
            }

            let Some(coords) = self.geocoder.geocode(name).await else {
                debug!("no coordinates for {name}, skipping");
                continue;
            };

            // Nearby locations collapse to one forecast cell
            let key = ((coords.lat * 1000.0).round() as i64, (coords.lon * 1000.0).round() as i64);
            if !seen_coords.insert(key) {
                continue;
            }

            match self.fetch_forecast(coords).await {
                Ok(forecast) => {
                    if let Some(alert) = forecast
                        .hourly
                        .as_ref()
                        .and_then(|h| alert_from_forecast(h, coords, name))
                    {
                        alerts.push(alert);
                    }
                }
                Err(e) => {
                    // One failed location never fails the feed
                    warn!("forecast fetch failed for {name}: {e}");
                }
            }
        }

        Ok(alerts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thunderstorm_codes_are_critical() {
        for code in [95, 96, 99] {
            assert_eq!(severity_from_weathercode(code, 0.0, 0.0), Severity::Critical);
        }
    }

    #[test]
    fn test_violent_showers_are_high() {
        assert_eq!(severity_from_weathercode(82, 0.0, 0.0), Severity::High);
        assert_eq!(severity_from_weathercode(86, 0.0, 0.0), Severity::High);
    }

    #[test]
    fn test_wind_gust_thresholds() {
        assert_eq!(severity_from_weathercode(0, 0.0, 20.0), Severity::High);
        assert_eq!(severity_from_weathercode(0, 0.0, 15.0), Severity::Elevated);
        assert_eq!(severity_from_weathercode(0, 0.0, 14.9), Severity::Normal);
    }

    #[test]
    fn test_precipitation_thresholds() {
        assert_eq!(severity_from_weathercode(0, 20.0, 0.0), Severity::High);
        assert_eq!(severity_from_weathercode(0, 5.0, 0.0), Severity::Elevated);
        assert_eq!(severity_from_weathercode(0, 4.9, 0.0), Severity::Normal);
    }

    #[test]
    fn test_rain_codes_default_elevated() {
        assert_eq!(severity_from_weathercode(61, 0.0, 0.0), Severity::Elevated);
        assert_eq!(severity_from_weathercode(3, 0.0, 0.0), Severity::Normal);
    }

    #[test]
    fn test_event_names() {
        assert_eq!(event_name_from_weathercode(99), "Severe Thunderstorm with Hail");
        assert_eq!(event_name_from_weathercode(12345), "Weather Alert");
    }

    #[test]
    fn test_alert_from_forecast_picks_most_severe_hour() {
        let hourly = HourlyForecast {
            time: vec![
                "2024-03-01T00:00".to_string(),
                "2024-03-01T01:00".to_string(),
                "2024-03-01T02:00".to_string(),
            ],
            weathercode: vec![0, 95, 61],
            precipitation: vec![Some(0.0), Some(2.0), Some(1.0)],
            windgusts_10m: vec![Some(0.0), Some(10.0), Some(0.0)],
        };
        let alert =
            alert_from_forecast(&hourly, Coordinates::new(51.5, -0.13), "London").unwrap();
        assert_eq!(alert.severity, Severity::Critical);
        assert_eq!(alert.event, "Thunderstorm");
        assert_eq!(alert.location_name.as_deref(), Some("London"));
        assert!(alert.start_time.is_some());
        assert!(alert.description.unwrap().contains("London"));
    }

    #[test]
    fn test_calm_forecast_yields_no_alert() {
        let hourly = HourlyForecast {
            time: vec!["2024-03-01T00:00".to_string()],
            weathercode: vec![1],
            precipitation: vec![Some(0.0)],
            windgusts_10m: vec![Some(3.0)],
        };
        assert!(alert_from_forecast(&hourly, Coordinates::new(0.0, 0.0), "x").is_none());
    }
}
