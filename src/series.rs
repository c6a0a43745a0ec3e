// 📈 Series preparation - indicator observations as time series + event regressors

use crate::dataset::Dataset;
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Time-ordered observations of one indicator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    pub indicator_code: String,
    pub points: Vec<SeriesPoint>,
}

/// One value per calendar year, consecutive years
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnualSeries {
    pub years: Vec<i32>,
    pub values: Vec<f64>,
    /// Years that carry a real observation (rest are interpolated)
    pub observed: Vec<bool>,
}

/// A dated event used as a regressor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventMarker {
    pub record_id: String,
    pub name: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum RegressorShape {
    /// 1 from the event year on
    Step,
    /// 1 from the event date until `lag_months` later
    Window { lag_months: u32 },
}

// ============================================================================
// PREPARATION
// ============================================================================

/// Observations of `indicator_code`, sorted by date
pub fn prepare_time_series(dataset: &Dataset, indicator_code: &str) -> TimeSeries {
    let mut points: Vec<SeriesPoint> = dataset
        .observations(None)
        .into_iter()
        .filter(|r| {
            r.indicator_code
                .as_deref()
                .map(|c| c.eq_ignore_ascii_case(indicator_code))
                .unwrap_or(false)
        })
        .filter_map(|r| match (r.observation_date, r.value_numeric) {
            (Some(date), Some(value)) => Some(SeriesPoint { date, value }),
            _ => None,
        })
        .collect();
    points.sort_by_key(|p| p.date);

    TimeSeries {
        indicator_code: indicator_code.to_string(),
        points,
    }
}

impl TimeSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn last(&self) -> Option<&SeriesPoint> {
        self.points.last()
    }

    /// Annual grid: mean per observed year, gaps linearly interpolated
    pub fn to_annual(&self) -> AnnualSeries {
        let mut by_year: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
        for p in &self.points {
            let entry = by_year.entry(p.date.year()).or_insert((0.0, 0));
            entry.0 += p.value;
            entry.1 += 1;
        }
        let means: BTreeMap<i32, f64> = by_year
            .into_iter()
            .map(|(year, (sum, count))| (year, sum / count as f64))
            .collect();

        let (first, last) = match (means.keys().next(), means.keys().next_back()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => {
                return AnnualSeries {
                    years: Vec::new(),
                    values: Vec::new(),
                    observed: Vec::new(),
                }
            }
        };

        let mut years = Vec::new();
        let mut values = Vec::new();
        let mut observed = Vec::new();
        for year in first..=last {
            years.push(year);
            match means.get(&year) {
                Some(&v) => {
                    values.push(v);
                    observed.push(true);
                }
                None => {
                    // Both neighbours exist because first/last are observed
                    let (&lo, &lo_v) = means.range(..year).next_back().unwrap_or((&first, &0.0));
                    let (&hi, &hi_v) = means.range(year..).next().unwrap_or((&last, &0.0));
                    let frac = (year - lo) as f64 / (hi - lo) as f64;
                    values.push(lo_v + (hi_v - lo_v) * frac);
                    observed.push(false);
                }
            }
        }

        AnnualSeries {
            years,
            values,
            observed,
        }
    }
}

impl AnnualSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn last_year(&self) -> Option<i32> {
        self.years.last().copied()
    }

    /// The `steps` years after the grid
    pub fn future_years(&self, steps: usize) -> Vec<i32> {
        match self.last_year() {
            Some(last) => (1..=steps as i32).map(|h| last + h).collect(),
            None => Vec::new(),
        }
    }
}

// ============================================================================
// DATES
// ============================================================================

/// Year plus elapsed fraction of that year
pub fn decimal_year(date: NaiveDate) -> f64 {
    let year = date.year();
    let days_in_year = if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
        366.0
    } else {
        365.0
    };
    year as f64 + date.ordinal0() as f64 / days_in_year
}

pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months)).unwrap_or(date)
}

// ============================================================================
// EVENT REGRESSORS
// ============================================================================

/// Dated events of the dataset, optionally restricted to `ids`
pub fn event_markers(dataset: &Dataset, ids: Option<&[String]>) -> Vec<EventMarker> {
    dataset
        .events()
        .into_iter()
        .filter(|e| ids.map(|ids| ids.contains(&e.record_id)).unwrap_or(true))
        .filter_map(|e| {
            e.observation_date.map(|date| EventMarker {
                record_id: e.record_id.clone(),
                name: e.label().to_string(),
                date,
            })
        })
        .collect()
}

/// One 0/1 column per event over `years`
pub fn event_indicators(years: &[i32], events: &[EventMarker], shape: RegressorShape) -> Vec<Vec<f64>> {
    events
        .iter()
        .map(|event| {
            years
                .iter()
                .map(|&year| {
                    let active = match shape {
                        RegressorShape::Step => year >= event.date.year(),
                        RegressorShape::Window { lag_months } => {
                            let end = add_months(event.date, lag_months);
                            year >= event.date.year() && year <= end.year()
                        }
                    };
                    if active {
                        1.0
                    } else {
                        0.0
                    }
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FinancialInclusionRecord, Pillar};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ownership_dataset() -> Dataset {
        let mut ds = Dataset::new();
        let obs = [
            ("REC_0001", 22.0, date(2011, 12, 31)),
            ("REC_0002", 35.0, date(2014, 12, 31)),
            ("REC_0003", 35.0, date(2017, 12, 31)),
            ("REC_0004", 46.0, date(2021, 12, 31)),
            ("OBS_2024_001", 48.5, date(2024, 6, 30)),
        ];
        // Insert out of order on purpose
        for (id, value, d) in obs.iter().rev() {
            ds.push(FinancialInclusionRecord::observation(id, Pillar::Access, "ACC_OWNERSHIP", *value, *d))
                .unwrap();
        }
        ds.push(FinancialInclusionRecord::observation(
            "REC_0100", Pillar::Usage, "USG_DIGITAL_PAYMENT", 21.0, date(2021, 12, 31),
        ))
        .unwrap();
        ds.push(FinancialInclusionRecord::event("EVT_0001", "Telebirr Launch", date(2021, 5, 11)))
            .unwrap();
        ds
    }

    #[test]
    fn test_prepare_time_series_sorted_and_filtered() {
        let series = prepare_time_series(&ownership_dataset(), "ACC_OWNERSHIP");

        assert_eq!(series.len(), 5);
        assert_eq!(series.values(), vec![22.0, 35.0, 35.0, 46.0, 48.5]);
        assert_eq!(series.last().unwrap().date, date(2024, 6, 30));
    }

    #[test]
    fn test_to_annual_interpolates_gaps() {
        let annual = prepare_time_series(&ownership_dataset(), "ACC_OWNERSHIP").to_annual();

        assert_eq!(annual.years.first(), Some(&2011));
        assert_eq!(annual.last_year(), Some(2024));
        assert_eq!(annual.len(), 14);
        assert!((annual.values[1] - (22.0 + 13.0 / 3.0)).abs() < 1e-9);
        assert!((annual.values[8] - 40.5).abs() < 1e-9);
        assert_eq!(annual.observed.iter().filter(|o| **o).count(), 5);
        assert_eq!(annual.future_years(3), vec![2025, 2026, 2027]);
    }

    #[test]
    fn test_to_annual_averages_same_year() {
        let series = TimeSeries {
            indicator_code: "X".to_string(),
            points: vec![
                SeriesPoint { date: date(2020, 3, 1), value: 10.0 },
                SeriesPoint { date: date(2020, 9, 1), value: 20.0 },
                SeriesPoint { date: date(2021, 3, 1), value: 30.0 },
            ],
        };
        let annual = series.to_annual();
        assert_eq!(annual.values, vec![15.0, 30.0]);
    }

    #[test]
    fn test_decimal_year() {
        assert_eq!(decimal_year(date(2021, 1, 1)), 2021.0);
        assert!((decimal_year(date(2024, 7, 1)) - (2024.0 + 182.0 / 366.0)).abs() < 1e-12);
    }

    #[test]
    fn test_event_indicators_shapes() {
        let years: Vec<i32> = (2019..=2024).collect();
        let events = event_markers(&ownership_dataset(), None);

        let step = event_indicators(&years, &events, RegressorShape::Step);
        assert_eq!(step[0], vec![0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);

        let window = event_indicators(&years, &events, RegressorShape::Window { lag_months: 12 });
        assert_eq!(window[0], vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0]);
    }
}
