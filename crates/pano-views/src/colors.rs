//! Age-based color ramp shared by markers, chart bars and legend rows

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Days per year used for capture ages
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Scale maximum when a dataset has no oldest capture date
pub const DEFAULT_MAX_AGE_YEARS: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#rrggbb`
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    fn lerp(self, other: Color, t: f64) -> Color {
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Color::from_rgb(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

/// Nine-stop yellow → orange → red ramp
pub const YL_OR_RD: [Color; 9] = [
    Color::from_rgb(255, 255, 204),
    Color::from_rgb(255, 237, 160),
    Color::from_rgb(254, 217, 118),
    Color::from_rgb(254, 178, 76),
    Color::from_rgb(253, 141, 60),
    Color::from_rgb(252, 78, 42),
    Color::from_rgb(227, 26, 28),
    Color::from_rgb(189, 0, 38),
    Color::from_rgb(128, 0, 38),
];

/// Sample the ramp at `t` in [0, 1]
pub fn yl_or_rd(t: f64) -> Color {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (YL_OR_RD.len() - 1) as f64;
    let lower = scaled.floor() as usize;
    if lower >= YL_OR_RD.len() - 1 {
        return YL_OR_RD[YL_OR_RD.len() - 1];
    }
    YL_OR_RD[lower].lerp(YL_OR_RD[lower + 1], scaled - lower as f64)
}

/// Age in years between a capture date and `today`
pub fn age_in_years(date: NaiveDate, today: NaiveDate) -> f64 {
    (today - date).num_days() as f64 / DAYS_PER_YEAR
}

/// Maps capture dates to colors, from 0 years (yellow) to the dataset's
/// oldest age (dark red)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgeColorScale {
    today: NaiveDate,
    max_years: f64,
}

impl AgeColorScale {
    pub fn new(today: NaiveDate, max_years: f64) -> Self {
        let max_years = if max_years.is_finite() && max_years > 0.0 {
            max_years
        } else {
            DEFAULT_MAX_AGE_YEARS
        };
        Self { today, max_years }
    }

    /// Scale ending at the age of `oldest`, if known
    pub fn from_oldest(today: NaiveDate, oldest: Option<NaiveDate>) -> Self {
        let max_years = oldest.map_or(DEFAULT_MAX_AGE_YEARS, |date| age_in_years(date, today));
        Self::new(today, max_years)
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn max_years(&self) -> f64 {
        self.max_years
    }

    pub fn color_for_age(&self, years: f64) -> Color {
        yl_or_rd(years / self.max_years)
    }

    pub fn color_for_date(&self, date: NaiveDate) -> Color {
        self.color_for_age(age_in_years(date, self.today))
    }

    /// Color of a whole capture year, taken at its midpoint
    pub fn color_for_year(&self, year: i32) -> Color {
        NaiveDate::from_ymd_opt(year, 7, 1)
            .map_or(YL_OR_RD[YL_OR_RD.len() - 1], |mid| self.color_for_date(mid))
    }
}

impl Default for AgeColorScale {
    fn default() -> Self {
        let today = chrono::Local::now().date_naive();
        Self::new(today, DEFAULT_MAX_AGE_YEARS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_ramp_endpoints() {
        assert_eq!(yl_or_rd(0.0), YL_OR_RD[0]);
        assert_eq!(yl_or_rd(1.0), YL_OR_RD[8]);
        assert_eq!(yl_or_rd(7.0), YL_OR_RD[8]);
        assert_eq!(yl_or_rd(f64::NAN), YL_OR_RD[0]);
        assert_eq!(yl_or_rd(0.5), YL_OR_RD[4]);
        assert_eq!(YL_OR_RD[0].to_hex(), "#ffffcc");
    }

    #[test]
    fn test_age_scale() {
        let today = date(2024, 1, 1);
        let scale = AgeColorScale::from_oldest(today, Some(date(2014, 1, 1)));
        assert!((scale.max_years() - 10.0).abs() < 0.01);
        assert_eq!(scale.color_for_date(today), YL_OR_RD[0]);
        assert_eq!(scale.color_for_date(date(2014, 1, 1)), YL_OR_RD[8]);
        assert_eq!(scale.color_for_date(date(1990, 1, 1)), YL_OR_RD[8]);
        assert_eq!(scale.color_for_year(2030), YL_OR_RD[0]);
    }

    #[test]
    fn test_missing_oldest_uses_default() {
        let scale = AgeColorScale::from_oldest(date(2024, 1, 1), None);
        assert_eq!(scale.max_years(), DEFAULT_MAX_AGE_YEARS);

        let degenerate = AgeColorScale::from_oldest(date(2024, 1, 1), Some(date(2024, 1, 1)));
        assert_eq!(degenerate.max_years(), DEFAULT_MAX_AGE_YEARS);
    }

    #[test]
    fn test_age_in_years() {
        assert!((age_in_years(date(2020, 1, 1), date(2021, 1, 1)) - 366.0 / 365.25).abs() < 1e-9);
    }
}
