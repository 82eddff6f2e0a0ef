// Weather provider and scene selection
// One OpenWeatherMap fetch serves both the weather routine and the sunset
// cache: the current-weather response carries the day's sunset timestamp.

use crate::{Error, Result};
use chrono::{DateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use serde::Deserialize;
use std::time::Duration;

const API_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
const FREEZING_F: f64 = 32.0;

/// One parsed current-weather observation
#[derive(Debug, Clone)]
pub struct WeatherReport {
    /// Condition group from the provider vocabulary, lowercased ("clouds", "rain", ...)
    pub condition: String,
    /// Feels-like outside temperature in Fahrenheit
    pub feels_like_f: f64,
    /// Today's sunset in the configured timezone
    pub sunset: DateTime<Tz>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    weather: Vec<ApiCondition>,
    main: ApiMain,
    sys: ApiSys,
}

#[derive(Debug, Deserialize)]
struct ApiCondition {
    main: String,
}

#[derive(Debug, Deserialize)]
struct ApiMain {
    feels_like: f64,
}

#[derive(Debug, Deserialize)]
struct ApiSys {
    sunset: i64,
}

pub struct WeatherClient {
    client: reqwest::Client,
    city: String,
    api_key: String,
    timezone: Tz,
}

impl WeatherClient {
    pub fn new(city: impl Into<String>, api_key: impl Into<String>, timezone: Tz) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            city: city.into(),
            api_key: api_key.into(),
            timezone,
        })
    }

    /// Fetch the current weather for the configured city
    pub async fn fetch(&self) -> Result<WeatherReport> {
        let response = self
            .client
            .get(API_URL)
            .query(&[
                ("q", self.city.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", "imperial"),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: ApiResponse = response.json().await?;
        let condition = body
            .weather
            .first()
            .map(|w| w.main.to_lowercase())
            .ok_or_else(|| Error::provider("weather", "response has no weather conditions"))?;
        let sunset = self
            .timezone
            .timestamp_opt(body.sys.sunset, 0)
            .single()
            .ok_or_else(|| Error::provider("weather", "invalid sunset timestamp"))?;

        Ok(WeatherReport {
            condition,
            feels_like_f: body.main.feels_like,
            sunset,
        })
    }

}

impl WeatherReport {
    /// Today's sunset as a wall-clock time in the configured timezone
    pub fn sunset_time(&self) -> NaiveTime {
        self.sunset.time()
    }
}

/// Select the zone scene matching a weather condition.
///
/// Unmapped conditions fall back to a scene named "default" if the zone has
/// one; otherwise no scene is selected and the lights are left alone.
pub fn condition_scene_name<'a>(condition: &str, scene_names: &'a [String]) -> Option<&'a str> {
    scene_names
        .iter()
        .find(|name| name.eq_ignore_ascii_case(condition))
        .or_else(|| {
            scene_names
                .iter()
                .find(|name| name.eq_ignore_ascii_case("default"))
        })
        .map(|name| name.as_str())
}

/// Scene name for the inside/outside temperature comparison
pub fn temperature_scene(inside_f: f64, outside_f: f64, band_f: f64) -> &'static str {
    if outside_f < FREEZING_F {
        "freezing"
    } else if outside_f < inside_f - band_f {
        "colder"
    } else if outside_f > inside_f + band_f {
        "hotter"
    } else {
        "same"
    }
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 1.8 + 32.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene_names() -> Vec<String> {
        ["Clouds", "Rain", "Clear", "Default"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_condition_match() {
        let names = scene_names();
        assert_eq!(condition_scene_name("rain", &names), Some("Rain"));
        assert_eq!(condition_scene_name("clouds", &names), Some("Clouds"));
    }

    #[test]
    fn test_unmapped_condition_falls_back_to_default() {
        let names = scene_names();
        assert_eq!(condition_scene_name("tornado", &names), Some("Default"));
    }

    #[test]
    fn test_unmapped_condition_without_default_is_no_action() {
        let names = vec!["Clouds".to_string(), "Rain".to_string()];
        assert_eq!(condition_scene_name("tornado", &names), None);
    }

    #[test]
    fn test_temperature_bands() {
        assert_eq!(temperature_scene(70.0, 20.0, 5.0), "freezing");
        assert_eq!(temperature_scene(70.0, 60.0, 5.0), "colder");
        assert_eq!(temperature_scene(70.0, 80.0, 5.0), "hotter");
        assert_eq!(temperature_scene(70.0, 72.0, 5.0), "same");
        // boundaries are inclusive on the "same" side
        assert_eq!(temperature_scene(70.0, 65.0, 5.0), "same");
        assert_eq!(temperature_scene(70.0, 75.0, 5.0), "same");
    }

    #[test]
    fn test_celsius_conversion() {
        assert_eq!(celsius_to_fahrenheit(0.0), 32.0);
        assert_eq!(celsius_to_fahrenheit(100.0), 212.0);
        assert!((celsius_to_fahrenheit(21.0) - 69.8).abs() < 1e-9);
    }
}
