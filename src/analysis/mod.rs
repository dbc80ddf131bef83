/// Trend analysis over measurement windows.
///
/// Everything here is pure: inputs are borrowed and folded into a new
/// [`AnalysisResult`]. "First" and "last" are always chronological, whatever
/// order the store returned the rows in.
use crate::domain::{
    AnalysisResult, DailyMeasurement, DataPoint, HourlyMeasurement, Measurement,
    TemperatureDataPoint,
};
use crate::utils::round_to;
use chrono::{DateTime, Duration, Utc};

/// A day counts as rainy when its rain sum exceeds this.
pub const RAINY_DAY_THRESHOLD: f64 = 0.1;
/// Smallest number of raw samples requested for a recent-window analysis.
pub const MIN_RECENT_SAMPLES: u32 = 50;
/// Samples per hour at the station's ~2 minute cadence.
pub const SAMPLES_PER_HOUR: u32 = 30;

/// How many raw samples to request to cover the last `hours`.
pub fn recent_sample_count(hours: u32) -> u32 {
    MIN_RECENT_SAMPLES.max(hours.saturating_mul(SAMPLES_PER_HOUR))
}

/// Reduce daily aggregates (statistics) and hourly aggregates (chart series).
///
/// Either series may be empty; the matching fields then stay at their defaults.
pub fn summarize_window(daily: &[DailyMeasurement], hourly: &[HourlyMeasurement]) -> AnalysisResult {
    let mut result = AnalysisResult {
        success: true,
        ..Default::default()
    };

    let mut days: Vec<&DailyMeasurement> = daily.iter().collect();
    days.sort_by_key(|d| d.timestamp_ms);

    if let (Some(first), Some(last)) = (days.first(), days.last()) {
        result.highest_temperature = max_of(days.iter().map(|d| d.fields.temperature.max));
        result.lowest_temperature = min_of(days.iter().map(|d| d.fields.temperature.min));
        result.average_temperature = mean(days.iter().map(|d| d.fields.temperature.avg));

        result.highest_pressure = max_of(days.iter().map(|d| d.fields.pressure.avg));
        result.lowest_pressure = min_of(days.iter().map(|d| d.fields.pressure.avg));
        result.average_pressure = mean(days.iter().map(|d| d.fields.pressure.avg));

        result.total_rainfall = days.iter().map(|d| d.fields.rain.sum).sum();
        result.rainy_days_count = days
            .iter()
            .filter(|d| d.fields.rain.sum > RAINY_DAY_THRESHOLD)
            .count();

        result.start_date = Some(first.timestamp_ms);
        result.end_date = Some(last.timestamp_ms);

        result.temperature_trend = last.fields.temperature.avg - first.fields.temperature.avg;
        result.pressure_trend = last.fields.pressure.avg - first.fields.pressure.avg;
    }

    let mut hours: Vec<&HourlyMeasurement> = hourly.iter().collect();
    hours.sort_by_key(|h| h.timestamp_ms);

    result.hourly_temperatures = hours
        .iter()
        .map(|h| TemperatureDataPoint {
            timestamp: h.timestamp_ms,
            temperature: h.fields.temperature.avg,
            min: h.fields.temperature.min,
            max: h.fields.temperature.max,
        })
        .collect();
    result.hourly_pressures = hours
        .iter()
        .map(|h| DataPoint {
            timestamp: h.timestamp_ms,
            value: h.fields.pressure.avg,
        })
        .collect();

    result
}

/// Reduce raw samples to the ones taken within `hours` of `now`.
pub fn summarize_recent(samples: &[Measurement], hours: u32, now: DateTime<Utc>) -> AnalysisResult {
    if samples.is_empty() {
        return AnalysisResult::failed("No recent measurements available");
    }

    // An unrepresentable threshold means no lower bound.
    let threshold = Duration::try_hours(i64::from(hours))
        .and_then(|span| now.checked_sub_signed(span));
    let mut window: Vec<&Measurement> = samples
        .iter()
        .filter(|m| threshold.map_or(true, |t| m.timestamp_ms >= t))
        .collect();
    window.sort_by_key(|m| m.timestamp_ms);

    let (first, last) = match (window.first(), window.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => {
            return AnalysisResult::failed(format!(
                "No measurements found in the last {} hour(s)",
                hours
            ))
        }
    };

    let mut result = AnalysisResult {
        success: true,
        highest_temperature: max_of(window.iter().map(|m| m.temperature())),
        lowest_temperature: min_of(window.iter().map(|m| m.temperature())),
        average_temperature: mean(window.iter().map(|m| m.temperature())),
        temperature_trend: last.temperature() - first.temperature(),
        highest_pressure: max_of(window.iter().map(|m| m.pressure())),
        lowest_pressure: min_of(window.iter().map(|m| m.pressure())),
        average_pressure: mean(window.iter().map(|m| m.pressure())),
        pressure_trend: last.pressure() - first.pressure(),
        total_rainfall: window.iter().map(|m| m.rain()).sum(),
        start_date: Some(first.timestamp_ms),
        end_date: Some(last.timestamp_ms),
        measurement_count: Some(window.len()),
        ..Default::default()
    };

    // Raw samples carry no intra-sample range.
    result.hourly_temperatures = window
        .iter()
        .map(|m| TemperatureDataPoint {
            timestamp: m.timestamp_ms,
            temperature: m.temperature(),
            min: m.temperature(),
            max: m.temperature(),
        })
        .collect();
    result.hourly_pressures = window
        .iter()
        .map(|m| DataPoint {
            timestamp: m.timestamp_ms,
            value: m.pressure(),
        })
        .collect();

    let elapsed_minutes =
        (last.timestamp_ms - first.timestamp_ms).num_milliseconds() as f64 / 60_000.0;
    if window.len() > 1 && elapsed_minutes > 0.0 {
        result.sample_rate = Some(round_to(elapsed_minutes / (window.len() - 1) as f64, 1));
    }

    result
}

fn max_of(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(f64::NEG_INFINITY, f64::max)
}

fn min_of(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(f64::INFINITY, f64::min)
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
