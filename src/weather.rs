//! Weather and astronomy data for the installation site.
//!
//! Reads a cached Yahoo weather query result and works out today's sunrise
//! and sunset for the reported location. Nothing here affects rendering, it
//! only feeds the log.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use json::JsonValue;
use thiserror::Error;

const JULIAN_UNIX_EPOCH: f64 = 2440587.5;
const JULIAN_2000: f64 = 2451545.0;
const SECONDS_PER_DAY: f64 = 86400.0;

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("Cannot read weather file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Cannot parse weather data: {0}")]
    Parse(#[from] json::Error),

    #[error("Weather data lacks {0}")]
    Missing(&'static str),
}

#[derive(Clone, Debug, PartialEq)]
pub struct WeatherReport {
    /// Sunrise and sunset as reported by the weather service.
    pub astronomy: Option<(String, String)>,
    pub wind: Option<String>,
    pub temperature: Option<String>,
    pub lat: f64,
    pub long: f64,
    /// Computed for the local date, `None` during polar day or night.
    pub sun_times: Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)>,
}

fn number(value: &JsonValue) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

fn text(value: &JsonValue) -> Option<String> {
    if value.is_null() {
        None
    } else if let Some(s) = value.as_str() {
        Some(s.to_string())
    } else {
        Some(value.dump())
    }
}

pub fn load_weather(path: &Path, now: DateTime<FixedOffset>) -> Result<WeatherReport, WeatherError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(source) => {
            return Err(WeatherError::Io {
                path: path.display().to_string(),
                source,
            })
        }
    };

    parse_weather(&contents, now)
}

pub fn parse_weather(contents: &str, now: DateTime<FixedOffset>) -> Result<WeatherReport, WeatherError> {
    let weather = json::parse(contents)?;
    let channel = &weather["query"]["results"]["channel"];
    if !channel.is_object() {
        return Err(WeatherError::Missing("query.results.channel"));
    }

    let item = &channel["item"];
    let lat = number(&item["lat"]).ok_or(WeatherError::Missing("item.lat"))?;
    let long = number(&item["long"]).ok_or(WeatherError::Missing("item.long"))?;

    let astronomy = &channel["astronomy"];
    let astronomy = match (text(&astronomy["sunrise"]), text(&astronomy["sunset"])) {
        (Some(sunrise), Some(sunset)) => Some((sunrise, sunset)),
        _ => None,
    };

    let offset = *now.offset();
    let sun_times = sun_times(lat, long, now.date_naive())
        .map(|(rise, set)| (rise.with_timezone(&offset), set.with_timezone(&offset)));

    Ok(WeatherReport {
        astronomy,
        wind: text(&channel["wind"]["speed"]),
        temperature: text(&item["condition"]["temp"]),
        lat,
        long,
        sun_times,
    })
}

fn julian_to_utc(julian: f64) -> Option<DateTime<Utc>> {
    let seconds = ((julian - JULIAN_UNIX_EPOCH) * SECONDS_PER_DAY).round();
    DateTime::<Utc>::from_timestamp(seconds as i64, 0)
}

/// Sunrise and sunset on `date` at latitude `lat` and longitude `long` (both
/// in degrees, east positive), using the sunrise equation with standard
/// refraction. Returns `None` when the sun does not cross the horizon.
pub fn sun_times(lat: f64, long: f64, date: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let noon = date.and_hms_opt(12, 0, 0)?.and_utc().timestamp() as f64;
    let day = (noon / SECONDS_PER_DAY + JULIAN_UNIX_EPOCH - JULIAN_2000).round();

    let mean_solar_time = day - long / 360.0;
    let anomaly = (357.5291 + 0.98560028 * mean_solar_time).rem_euclid(360.0);
    let m = anomaly.to_radians();
    let center = 1.9148 * m.sin() + 0.0200 * (2.0 * m).sin() + 0.0003 * (3.0 * m).sin();
    let ecliptic = (anomaly + center + 180.0 + 102.9372).rem_euclid(360.0).to_radians();
    let transit = JULIAN_2000 + mean_solar_time + 0.0053 * m.sin() - 0.0069 * (2.0 * ecliptic).sin();

    let declination = (ecliptic.sin() * 23.4397f64.to_radians().sin()).asin();
    let phi = lat.to_radians();
    let cos_hour_angle = ((-0.833f64).to_radians().sin() - phi.sin() * declination.sin())
        / (phi.cos() * declination.cos());
    if !(-1.0..=1.0).contains(&cos_hour_angle) {
        return None;
    }

    let hour_angle = cos_hour_angle.acos().to_degrees();
    let sunrise = julian_to_utc(transit - hour_angle / 360.0)?;
    let sunset = julian_to_utc(transit + hour_angle / 360.0)?;
    Some((sunrise, sunset))
}

/// Reloads the weather report every `refresh` and logs it.
pub struct WeatherMonitor {
    path: PathBuf,
    refresh: Duration,
    offset: FixedOffset,
    last_refresh: Option<Instant>,
    report: Option<WeatherReport>,
}

impl WeatherMonitor {
    pub fn new(path: PathBuf, refresh: Duration, offset: FixedOffset) -> WeatherMonitor {
        WeatherMonitor {
            path,
            refresh,
            offset,
            last_refresh: None,
            report: None,
        }
    }

    #[cfg(test)]
    pub fn report(&self) -> Option<&WeatherReport> {
        self.report.as_ref()
    }

    /// Returns true if a refresh was attempted.
    pub fn poll(&mut self, now: Instant, wall_clock: DateTime<Utc>) -> bool {
        if let Some(last_refresh) = self.last_refresh {
            if now.duration_since(last_refresh) < self.refresh {
                return false;
            }
        }
        self.last_refresh = Some(now);

        let local = wall_clock.with_timezone(&self.offset);
        match load_weather(&self.path, local) {
            Ok(report) => {
                log::info!("Local time {}", local.format("%Y-%m-%d %H:%M:%S %:z"));
                log_report(&report);
                self.report = Some(report);
            }
            Err(err) => log::warn!("Weather unavailable: {err}"),
        }

        true
    }
}

fn log_report(report: &WeatherReport) {
    log::info!(
        "Weather at {:.2}/{:.2}: {} C, wind {}",
        report.lat,
        report.long,
        report.temperature.as_deref().unwrap_or("?"),
        report.wind.as_deref().unwrap_or("?"),
    );
    if let Some((sunrise, sunset)) = &report.astronomy {
        log::info!("Reported sunrise {sunrise}, sunset {sunset}");
    }
    match &report.sun_times {
        Some((sunrise, sunset)) => log::info!(
            "Computed sunrise {}, sunset {}",
            sunrise.format("%H:%M"),
            sunset.format("%H:%M")
        ),
        None => log::info!("The sun does not rise or set today"),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    const CHATHAM: &str = r#"{
        "query": {"results": {"channel": {
            "astronomy": {"sunrise": "5:47 am", "sunset": "8:21 pm"},
            "wind": {"speed": "25"},
            "item": {
                "lat": "-44.02",
                "long": "-176.37",
                "condition": {"temp": "14", "text": "Cloudy"}
            }
        }}}
    }"#;

    fn minutes_apart(a: DateTime<Utc>, b: DateTime<Utc>) -> i64 {
        (a - b).num_minutes().abs()
    }

    #[test]
    fn london_midsummer() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
        let (sunrise, sunset) = sun_times(51.5, -0.13, date).unwrap();
        assert!(minutes_apart(sunrise, Utc.with_ymd_and_hms(2024, 6, 21, 3, 43, 0).unwrap()) < 5);
        assert!(minutes_apart(sunset, Utc.with_ymd_and_hms(2024, 6, 21, 20, 21, 0).unwrap()) < 5);
    }

    #[test]
    fn equator_equinox_has_twelve_hour_day() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        let (sunrise, sunset) = sun_times(0.0, 0.0, date).unwrap();
        let day_length = (sunset - sunrise).num_minutes();
        assert!((720..=735).contains(&day_length), "{day_length}");
        assert!(minutes_apart(sunrise, Utc.with_ymd_and_hms(2024, 3, 20, 6, 0, 0).unwrap()) < 15);
    }

    #[test]
    fn polar_day_has_no_sunrise() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
        assert_eq!(sun_times(80.0, 15.0, date), None);
        assert_eq!(sun_times(-80.0, 15.0, date), None);
    }

    #[test]
    fn parses_cached_query() {
        let offset = FixedOffset::east_opt(12 * 3600 + 45 * 60).unwrap();
        let now = offset.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();
        let report = parse_weather(CHATHAM, now).unwrap();

        assert_eq!(
            report.astronomy,
            Some(("5:47 am".to_string(), "8:21 pm".to_string()))
        );
        assert_eq!(report.wind.as_deref(), Some("25"));
        assert_eq!(report.temperature.as_deref(), Some("14"));
        assert_eq!(report.lat, -44.02);
        assert_eq!(report.long, -176.37);

        let (sunrise, sunset) = report.sun_times.unwrap();
        assert_eq!(sunrise.offset(), &offset);
        assert!(sunrise < sunset);
    }

    #[test]
    fn missing_location_is_an_error() {
        let now = Utc::now().fixed_offset();
        let err = parse_weather(r#"{"query": {"results": {"channel": {}}}}"#, now).unwrap_err();
        assert!(matches!(err, WeatherError::Missing("item.lat")));

        let err = parse_weather(r#"{"query": {}}"#, now).unwrap_err();
        assert!(matches!(err, WeatherError::Missing("query.results.channel")));

        assert!(matches!(parse_weather("nope", now), Err(WeatherError::Parse(_))));
    }

    #[test]
    fn monitor_refreshes_on_interval_and_survives_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weather.json");
        let mut monitor =
            WeatherMonitor::new(path.clone(), Duration::from_secs(60), FixedOffset::east_opt(0).unwrap());

        let start = Instant::now();
        assert!(monitor.poll(start, Utc::now()));
        assert!(monitor.report().is_none());

        std::fs::write(&path, CHATHAM).unwrap();
        assert!(!monitor.poll(start + Duration::from_secs(30), Utc::now()));
        assert!(monitor.report().is_none());

        assert!(monitor.poll(start + Duration::from_secs(61), Utc::now()));
        assert_eq!(monitor.report().unwrap().wind.as_deref(), Some("25"));
    }
}
