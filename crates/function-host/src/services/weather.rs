//! `get_weather_info` tool.
//!
//! Returns randomized mock weather shaped like a real provider response.
//! Temperatures follow a seasonal table (roughly Tokyo's climate) and snow is
//! only ever reported from December to March.

use chrono::{Datelike, NaiveDate, SecondsFormat, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

pub const DEFAULT_LOCATION: &str = "Tokyo,Japan";

pub const DATA_SOURCE: &str = "Mock Weather Service (Demo)";

pub const MOCK_NOTE: &str =
    "This is mock data for demonstration purposes. Connect a weather provider for real observations.";

#[derive(Debug, Clone, Serialize)]
pub struct WeatherReport {
    pub location: String,
    pub date: String,
    pub temperature: Temperature,
    pub weather: Condition,
    pub humidity: String,
    pub pressure: String,
    pub wind: Wind,
    pub forecast: Forecast,
    pub last_updated: String,
    pub data_source: &'static str,
    pub note: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Temperature {
    pub current: i32,
    pub feels_like: i32,
    pub min: i32,
    pub max: i32,
    pub unit: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Condition {
    pub main: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Wind {
    pub speed: String,
    pub direction: u16,
}

#[derive(Debug, Clone, Serialize)]
pub struct Forecast {
    pub tomorrow: DayForecast,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayForecast {
    pub high: i32,
    pub low: i32,
    pub condition: &'static str,
}

const CLEAR: Condition = Condition {
    main: "Clear",
    description: "clear sky",
};
const CLOUDS: Condition = Condition {
    main: "Clouds",
    description: "overcast",
};
const RAIN: Condition = Condition {
    main: "Rain",
    description: "rain",
};
const SNOW: Condition = Condition {
    main: "Snow",
    description: "snow",
};
const THIN_CLOUDS: Condition = Condition {
    main: "Clouds",
    description: "thin clouds",
};

/// Seasonal (min, max) in °C for a month (1-12).
pub fn seasonal_range(month: u32) -> (i32, i32) {
    match month {
        1 => (-2, 8),
        2 => (0, 10),
        3 => (4, 14),
        4 => (10, 20),
        5 => (15, 25),
        6 => (19, 28),
        7 => (23, 32),
        8 => (25, 33),
        9 => (21, 29),
        10 => (15, 23),
        11 => (8, 17),
        12 => (2, 12),
        _ => (10, 20),
    }
}

fn conditions_for(month: u32) -> [Condition; 4] {
    let fourth = if matches!(month, 12 | 1..=3) {
        SNOW
    } else {
        THIN_CLOUDS
    };
    [CLEAR, CLOUDS, RAIN, fourth]
}

/// Mock weather for `location` on `date` (`YYYY-MM-DD`).
///
/// A missing or unparseable date means today.
pub fn weather_info(location: &str, date: Option<&str>) -> WeatherReport {
    let target_date = date
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .unwrap_or_else(|| Utc::now().date_naive());

    generate_report(location, target_date, &mut rand::thread_rng())
}

pub(crate) fn generate_report<R: Rng>(
    location: &str,
    date: NaiveDate,
    rng: &mut R,
) -> WeatherReport {
    let month = date.month();
    let (min, max) = seasonal_range(month);
    let current = rng.gen_range(min..=max);
    let feels_like = current + rng.gen_range(-3..=3);

    let conditions = conditions_for(month);
    let weather = conditions.choose(rng).copied().unwrap_or(CLEAR);
    let tomorrow_condition = conditions.choose(rng).copied().unwrap_or(CLEAR);

    WeatherReport {
        location: location.to_string(),
        date: date.format("%Y-%m-%d").to_string(),
        temperature: Temperature {
            current,
            feels_like,
            min,
            max,
            unit: "°C",
        },
        weather,
        humidity: format!("{}%", rng.gen_range(40..=80)),
        pressure: format!("{} hPa", rng.gen_range(1010..=1025)),
        wind: Wind {
            speed: format!("{} m/s", rng.gen_range(0..=15)),
            direction: rng.gen_range(0..360),
        },
        forecast: Forecast {
            tomorrow: DayForecast {
                high: current + rng.gen_range(-5..=5),
                low: current - rng.gen_range(3..=8),
                condition: tomorrow_condition.description,
            },
        },
        last_updated: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        data_source: DATA_SOURCE,
        note: MOCK_NOTE,
    }
}
