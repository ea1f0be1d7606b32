//! Monthly and daily spending forecast
//!
//! The forecast is recomputed from scratch on every run:
//!
//! 1. Bucket amounts into calendar months, leaving out the in-progress month,
//!    and into days within each month
//! 2. This month: single exponential smoothing over the monthly history,
//!    then a progress correction using what has already been spent
//! 3. Next month: smoothed value plus a share of the latest month-over-month
//!    delta, scaled by a same-calendar-month seasonal index and blended with
//!    an AR(1)-style estimate
//! 4. Confidence band of one sample standard deviation of the history
//! 5. Daily values from the average day-of-month share of historical months

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::stats;

/// Ratios and totals at or below this are treated as zero
const EPSILON: f64 = 1e-9;

/// Day-of-month slots in the ratio profile
const MAX_DAYS: usize = 31;

/// Forecast coefficients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Smoothing factor for the monthly series
    pub alpha: f64,
    /// AR(1) coefficient
    pub phi: f64,
    /// Share of the latest month-over-month delta added to next month
    pub trend_weight: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            alpha: 0.7,
            phi: 0.5,
            trend_weight: 0.5,
        }
    }
}

/// A calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn of(date: NaiveDate) -> Self {
        Self::new(date.year(), date.month())
    }

    pub fn next(self) -> Self {
        if self.month >= 12 {
            Self::new(self.year + 1, 1)
        } else {
            Self::new(self.year, self.month + 1)
        }
    }

    pub fn days(self) -> u32 {
        days_in_month(self.year, self.month)
    }

    /// Date of a day in this month
    pub fn day(self, day: u32) -> Result<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, day).ok_or_else(|| {
            Error::InvalidData(format!("Invalid calendar date {}-{:02}", self, day))
        })
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in a month, leap years included
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Single exponential smoothing, oldest to newest
///
/// `S_0 = x_0`, `S_t = alpha * x_t + (1 - alpha) * S_{t-1}`. Empty input
/// smooths to 0.
pub fn exponential_smoothing(values: &[f64], alpha: f64) -> f64 {
    let Some((&first, rest)) = values.split_first() else {
        return 0.0;
    };
    rest.iter()
        .fold(first, |smoothed, &x| alpha * x + (1.0 - alpha) * smoothed)
}

/// Mean of months sharing `calendar_month` over the overall mean
///
/// 1.0 when no such month exists or the overall mean is zero.
pub fn seasonal_index(history: &[(YearMonth, f64)], calendar_month: u32) -> f64 {
    let all: Vec<f64> = history.iter().map(|(_, v)| *v).collect();
    let same: Vec<f64> = history
        .iter()
        .filter(|(m, _)| m.month == calendar_month)
        .map(|(_, v)| *v)
        .collect();
    if same.is_empty() {
        return 1.0;
    }

    let overall = stats::mean(&all);
    if overall > EPSILON {
        stats::mean(&same) / overall
    } else {
        1.0
    }
}

/// Average share of each day-of-month across months with a positive total
pub fn day_ratio_profile(daily: &BTreeMap<YearMonth, BTreeMap<u32, f64>>) -> [f64; MAX_DAYS] {
    let mut ratios = [0.0; MAX_DAYS];
    let mut months = 0usize;

    for days in daily.values() {
        let month_total: f64 = days.values().sum();
        if days.is_empty() || month_total < EPSILON {
            continue;
        }
        for (&day, &amount) in days {
            if (1..=MAX_DAYS as u32).contains(&day) {
                ratios[day as usize - 1] += amount / month_total;
            }
        }
        months += 1;
    }

    if months > 0 {
        for r in ratios.iter_mut() {
            *r /= months as f64;
        }
    }
    ratios
}

/// Per-day values for a whole month from a ratio profile
///
/// Days without an observed share get a uniform 1/days share.
pub fn distribute_daily(
    month: YearMonth,
    total: f64,
    ratios: &[f64; MAX_DAYS],
) -> Result<Vec<DailyValue>> {
    let days = month.days();
    (1..=days)
        .map(|d| {
            let observed = ratios[d as usize - 1];
            let ratio = if observed > EPSILON {
                observed
            } else {
                1.0 / days as f64
            };
            Ok(DailyValue {
                date: month.day(d)?,
                value: total * ratio,
            })
        })
        .collect()
}

/// Predicted value for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyValue {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThisMonthPredict {
    /// "YYYY-MM"
    pub month: String,
    /// Smoothed estimate of the full month
    pub total: f64,
    /// Already spent plus the smoothed estimate for the remaining days
    pub adjusted: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextMonthPredict {
    /// "YYYY-MM"
    pub month: String,
    /// Trend baseline before seasonal and AR adjustment
    pub total: f64,
    /// Final prediction: seasonal baseline blended with the AR estimate
    pub seasonal_adjusted: f64,
    /// [low, high]
    pub confidence_interval: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPredict {
    pub this_month: ThisMonthPredict,
    pub next_month: NextMonthPredict,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPredict {
    pub this_month: Vec<DailyValue>,
    pub next_month: Vec<DailyValue>,
}

/// Coefficients and intermediate values behind a forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastModel {
    pub alpha: f64,
    pub phi: f64,
    pub history_months: usize,
    pub seasonal_index: f64,
    /// Absent with fewer than two months of history
    pub ar_prediction: Option<f64>,
    pub std_dev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub monthly_predict: MonthlyPredict,
    pub daily_predict: DailyPredict,
    #[serde(rename = "forecast_model")]
    pub model: ForecastModel,
}

/// Amounts bucketed by month and by day within month
#[derive(Debug, Default)]
struct MonthBuckets {
    history: BTreeMap<YearMonth, f64>,
    history_daily: BTreeMap<YearMonth, BTreeMap<u32, f64>>,
    current_total: f64,
}

impl MonthBuckets {
    fn collect<I>(points: I, current: YearMonth) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        let mut buckets = Self::default();
        for (date, amount) in points {
            let month = YearMonth::of(date);
            if month == current {
                buckets.current_total += amount;
                continue;
            }
            *buckets.history.entry(month).or_insert(0.0) += amount;
            *buckets
                .history_daily
                .entry(month)
                .or_default()
                .entry(date.day())
                .or_insert(0.0) += amount;
        }
        buckets
    }
}

/// Calendar-aware spending forecaster
#[derive(Debug, Clone, Copy, Default)]
pub struct Forecaster {
    config: ForecastConfig,
}

impl Forecaster {
    pub fn new(config: ForecastConfig) -> Self {
        Self { config }
    }

    /// Forecast this and next month from (date, amount) pairs
    ///
    /// `today` decides the in-progress month and how many of its days have
    /// elapsed.
    pub fn forecast<I>(&self, points: I, today: NaiveDate) -> Result<Forecast>
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        let this_month = YearMonth::of(today);
        let next_month = this_month.next();
        let buckets = MonthBuckets::collect(points, this_month);

        let history: Vec<(YearMonth, f64)> =
            buckets.history.iter().map(|(m, v)| (*m, *v)).collect();
        let values: Vec<f64> = history.iter().map(|(_, v)| *v).collect();

        // This month
        let this_total = exponential_smoothing(&values, self.config.alpha);
        let days_this = this_month.days();
        let remaining_days = days_this.saturating_sub(today.day());
        let adjusted =
            buckets.current_total + this_total * remaining_days as f64 / days_this as f64;

        // Next month
        let next_baseline = match values.as_slice() {
            [.., prev, last] => this_total + self.config.trend_weight * (last - prev),
            _ => this_total,
        };
        let season = seasonal_index(&history, next_month.month);
        let seasonal_next = next_baseline * season;

        let history_mean = stats::mean(&values);
        let ar_prediction = match values.last() {
            Some(&last) if values.len() >= 2 => {
                Some(history_mean + self.config.phi * (last - history_mean))
            }
            _ => None,
        };
        let next_total = match ar_prediction {
            Some(ar) => (seasonal_next + ar) / 2.0,
            None => seasonal_next,
        };

        let std_dev = stats::sample_std_dev(&values, history_mean);
        let confidence_interval = [next_total - std_dev, next_total + std_dev];

        // Daily distribution
        let ratios = day_ratio_profile(&buckets.history_daily);
        let daily_this = distribute_daily(this_month, this_total, &ratios)?;
        let daily_next = distribute_daily(next_month, next_total, &ratios)?;

        debug!(
            history_months = values.len(),
            this_month = %this_month,
            this_total,
            next_total,
            seasonal_index = season,
            "Forecast computed"
        );

        Ok(Forecast {
            monthly_predict: MonthlyPredict {
                this_month: ThisMonthPredict {
                    month: this_month.to_string(),
                    total: this_total,
                    adjusted,
                },
                next_month: NextMonthPredict {
                    month: next_month.to_string(),
                    total: next_baseline,
                    seasonal_adjusted: next_total,
                    confidence_interval,
                },
            },
            daily_predict: DailyPredict {
                this_month: daily_this,
                next_month: daily_next,
            },
            model: ForecastModel {
                alpha: self.config.alpha,
                phi: self.config.phi,
                history_months: values.len(),
                seasonal_index: season,
                ar_prediction,
                std_dev,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{approx_eq, approx_eq_within, date};

    const TOLERANCE: f64 = 1e-6;

    fn points(rows: &[(&str, f64)]) -> Vec<(NaiveDate, f64)> {
        rows.iter().map(|(d, a)| (date(d), *a)).collect()
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(1900, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
        assert_eq!(days_in_month(2024, 4), 30);
        assert_eq!(days_in_month(2024, 12), 31);
    }

    #[test]
    fn test_year_month_rollover() {
        assert_eq!(YearMonth::new(2024, 12).next(), YearMonth::new(2025, 1));
        assert_eq!(YearMonth::new(2024, 3).next(), YearMonth::new(2024, 4));
        assert_eq!(YearMonth::new(2024, 3).to_string(), "2024-03");
        assert!(YearMonth::new(2024, 2).day(30).is_err());
    }

    #[test]
    fn test_exponential_smoothing() {
        assert_eq!(exponential_smoothing(&[], 0.7), 0.0);
        assert_eq!(exponential_smoothing(&[42.0], 0.7), 42.0);
        assert!(approx_eq_within(exponential_smoothing(&[100.0, 210.0], 0.7), 177.0, TOLERANCE));
        // 0.7 * 300 + 0.3 * 177
        assert!(approx_eq_within(
            exponential_smoothing(&[100.0, 210.0, 300.0], 0.7),
            263.1,
            TOLERANCE,
        ));
    }

    #[test]
    fn test_scenario_two_history_months() {
        let records = points(&[
            ("2024-01-05", 100.0),
            ("2024-02-05", 120.0),
            ("2024-02-20", 90.0),
        ]);
        let forecast = Forecaster::default()
            .forecast(records, date("2024-03-10"))
            .unwrap();

        let this = &forecast.monthly_predict.this_month;
        assert_eq!(this.month, "2024-03");
        assert!(approx_eq_within(this.total, 177.0, TOLERANCE));
        // Nothing spent yet; 21 of 31 days remain
        assert!(approx_eq_within(this.adjusted, 177.0 * 21.0 / 31.0, TOLERANCE));

        let next = &forecast.monthly_predict.next_month;
        assert_eq!(next.month, "2024-04");
        assert!(approx_eq_within(next.total, 232.0, TOLERANCE));
        // No April history: seasonal index 1, AR = 155 + 0.5 * 55 = 182.5
        assert!(approx_eq_within(forecast.model.seasonal_index, 1.0, TOLERANCE));
        assert!(approx_eq_within(forecast.model.ar_prediction.unwrap(), 182.5, TOLERANCE));
        assert!(approx_eq_within(next.seasonal_adjusted, (232.0 + 182.5) / 2.0, TOLERANCE));

        let sd = 6050.0f64.sqrt();
        assert!(approx_eq_within(forecast.model.std_dev, sd, TOLERANCE));
        assert!(approx_eq_within(next.confidence_interval[0], 207.25 - sd, TOLERANCE));
        assert!(approx_eq_within(next.confidence_interval[1], 207.25 + sd, TOLERANCE));
    }

    #[test]
    fn test_current_month_excluded_and_progress_corrected() {
        let records = points(&[
            ("2024-01-10", 300.0),
            ("2024-02-10", 300.0),
            ("2024-03-01", 50.0),
            ("2024-03-02", 25.0),
        ]);
        let forecast = Forecaster::default()
            .forecast(records, date("2024-03-02"))
            .unwrap();

        assert_eq!(forecast.model.history_months, 2);
        let this = &forecast.monthly_predict.this_month;
        assert!(approx_eq_within(this.total, 300.0, TOLERANCE));
        assert!(approx_eq_within(this.adjusted, 75.0 + 300.0 * 29.0 / 31.0, TOLERANCE));
    }

    #[test]
    fn test_single_history_month_degrades() {
        let records = points(&[("2024-02-14", 80.0)]);
        let forecast = Forecaster::default()
            .forecast(records, date("2024-03-31"))
            .unwrap();

        let next = &forecast.monthly_predict.next_month;
        assert!(approx_eq_within(forecast.monthly_predict.this_month.total, 80.0, TOLERANCE));
        assert!(approx_eq_within(forecast.monthly_predict.this_month.adjusted, 0.0, TOLERANCE));
        assert!(approx_eq_within(next.total, 80.0, TOLERANCE));
        assert!(approx_eq_within(next.seasonal_adjusted, 80.0, TOLERANCE));
        assert!(forecast.model.ar_prediction.is_none());
        assert_eq!(next.confidence_interval, [80.0, 80.0]);
    }

    #[test]
    fn test_no_history() {
        let forecast = Forecaster::default()
            .forecast(Vec::new(), date("2024-02-10"))
            .unwrap();
        assert_eq!(forecast.monthly_predict.this_month.total, 0.0);
        assert_eq!(forecast.monthly_predict.next_month.seasonal_adjusted, 0.0);
        // Leap-year February, then March
        assert_eq!(forecast.daily_predict.this_month.len(), 29);
        assert_eq!(forecast.daily_predict.next_month.len(), 31);
        assert!(forecast
            .daily_predict
            .this_month
            .iter()
            .all(|d| d.value == 0.0));
    }

    #[test]
    fn test_seasonal_index_uses_same_calendar_month() {
        let mut history = vec![(YearMonth::new(2023, 4), 200.0)];
        for m in 5..=12 {
            history.push((YearMonth::new(2023, m), 100.0));
        }
        for m in 1..=2 {
            history.push((YearMonth::new(2024, m), 100.0));
        }
        let overall = 1200.0 / 11.0;
        assert!(approx_eq_within(seasonal_index(&history, 4), 200.0 / overall, TOLERANCE));
        assert!(approx_eq_within(seasonal_index(&history, 3), 1.0, TOLERANCE));
        assert!(approx_eq_within(seasonal_index(&[], 4), 1.0, TOLERANCE));
    }

    #[test]
    fn test_seasonal_adjustment_applied_to_next_month() {
        let mut rows = vec![("2023-04-15".to_string(), 200.0)];
        for m in 5..=12 {
            rows.push((format!("2023-{:02}-15", m), 100.0));
        }
        rows.push(("2024-01-15".to_string(), 100.0));
        rows.push(("2024-02-15".to_string(), 100.0));
        let records: Vec<(NaiveDate, f64)> = rows.iter().map(|(d, a)| (date(d), *a)).collect();

        let forecast = Forecaster::default()
            .forecast(records, date("2024-03-15"))
            .unwrap();
        let model = &forecast.model;
        let mean = 1200.0 / 11.0;
        assert!(approx_eq_within(model.seasonal_index, 200.0 / mean, TOLERANCE));

        // Flat recent history: baseline 100 (smoothing converges on 100)
        let baseline = forecast.monthly_predict.next_month.total;
        let ar = mean + 0.5 * (100.0 - mean);
        assert!(approx_eq_within(
            forecast.monthly_predict.next_month.seasonal_adjusted,
            (baseline * model.seasonal_index + ar) / 2.0,
            TOLERANCE,
        ));
    }

    #[test]
    fn test_day_ratio_profile_averages_months() {
        let mut daily = BTreeMap::new();
        daily.insert(YearMonth::new(2024, 1), BTreeMap::from([(5, 100.0)]));
        daily.insert(
            YearMonth::new(2024, 2),
            BTreeMap::from([(5, 120.0), (20, 90.0)]),
        );
        // Zero-total month does not contribute
        daily.insert(YearMonth::new(2023, 12), BTreeMap::from([(1, 0.0)]));

        let ratios = day_ratio_profile(&daily);
        assert!(approx_eq_within(ratios[4], (1.0 + 120.0 / 210.0) / 2.0, TOLERANCE));
        assert!(approx_eq_within(ratios[19], (90.0 / 210.0) / 2.0, TOLERANCE));
        assert_eq!(ratios[0], 0.0);
    }

    #[test]
    fn test_daily_distribution_uses_ratios_and_fallback() {
        let records = points(&[
            ("2024-01-05", 100.0),
            ("2024-02-05", 120.0),
            ("2024-02-20", 90.0),
        ]);
        let forecast = Forecaster::default()
            .forecast(records, date("2024-03-10"))
            .unwrap();

        let daily = &forecast.daily_predict.this_month;
        assert_eq!(daily.len(), 31);
        assert_eq!(daily[0].date, date("2024-03-01"));
        assert_eq!(daily[30].date, date("2024-03-31"));
        assert!(approx_eq_within(daily[4].value, 177.0 * (1.0 + 120.0 / 210.0) / 2.0, TOLERANCE));
        assert!(approx_eq_within(daily[0].value, 177.0 / 31.0, TOLERANCE));

        let next = &forecast.daily_predict.next_month;
        assert_eq!(next.len(), 30);
        assert_eq!(next[29].date, date("2024-04-30"));
    }

    #[test]
    fn test_december_rolls_into_next_year() {
        let records = points(&[("2024-11-03", 40.0)]);
        let forecast = Forecaster::default()
            .forecast(records, date("2024-12-24"))
            .unwrap();
        assert_eq!(forecast.monthly_predict.next_month.month, "2025-01");
        assert_eq!(
            forecast.daily_predict.next_month[0].date,
            date("2025-01-01")
        );
    }

    #[test]
    fn test_forecast_is_deterministic() {
        let rows = points(&[
            ("2023-11-02", 10.0),
            ("2023-12-09", 250.0),
            ("2024-01-05", 100.0),
            ("2024-02-05", 120.0),
            ("2024-02-20", 90.0),
        ]);
        let a = Forecaster::default()
            .forecast(rows.clone(), date("2024-03-10"))
            .unwrap();
        let b = Forecaster::default()
            .forecast(rows, date("2024-03-10"))
            .unwrap();
        assert_eq!(a, b);
        assert!(approx_eq(
            a.monthly_predict.this_month.total,
            b.monthly_predict.this_month.total
        ));
    }

    #[test]
    fn test_serialized_layout() {
        let records = points(&[("2024-01-05", 100.0), ("2024-02-05", 210.0)]);
        let forecast = Forecaster::default()
            .forecast(records, date("2024-03-10"))
            .unwrap();
        let json = serde_json::to_value(&forecast).unwrap();

        assert_eq!(json["monthly_predict"]["this_month"]["month"], "2024-03");
        assert!(json["monthly_predict"]["this_month"]["adjusted"].is_number());
        assert!(json["monthly_predict"]["next_month"]["seasonal_adjusted"].is_number());
        assert_eq!(
            json["monthly_predict"]["next_month"]["confidence_interval"]
                .as_array()
                .unwrap()
                .len(),
            2
        );
        assert_eq!(json["daily_predict"]["this_month"][0]["date"], "2024-03-01");
        assert!(json["daily_predict"]["next_month"][0]["value"].is_number());
        assert_eq!(json["forecast_model"]["history_months"], 2);
    }
}
