use std::fs;

use camino::Utf8Path;
use chrono::NaiveDate;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{FontDesc, FontFamily, FontStyle};
use tracing::debug;

use crate::domain::{Category, ChartMode, RegionKey};
use crate::error::CovidError;
use crate::series::RegionSeries;

pub const CHART_SIZE: (u32, u32) = (1600, 800);

const BLUE_TAB: RGBColor = RGBColor(31, 119, 180);
const GREEN_TAB: RGBColor = RGBColor(44, 160, 44);
const RED_TAB: RGBColor = RGBColor(214, 39, 40);
const GREY: RGBColor = RGBColor(128, 128, 128);
const ZERO_LINE: RGBColor = RGBColor(64, 64, 64);

type DrawResult<DB> = Result<(), DrawingAreaErrorKind<<DB as DrawingBackend>::ErrorType>>;

pub struct ChartRequest<'a> {
    pub mode: ChartMode,
    pub region: &'a RegionKey,
    pub start_date: NaiveDate,
    pub series: &'a RegionSeries,
}

impl ChartRequest<'_> {
    pub fn title(&self) -> String {
        let mut parts = vec![
            "COVID-19".to_string(),
            self.mode.to_string(),
            format!("since {}", self.start_date.format("%Y-%m-%d")),
        ];
        if !self.region.state.is_empty() {
            parts.push(self.region.state.clone());
        }
        parts.push(self.region.country.clone());
        parts.join(" ")
    }
}

pub fn render_svg(request: &ChartRequest<'_>, path: &Utf8Path) -> Result<(), CovidError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| CovidError::Filesystem(err.to_string()))?;
    }
    let root = SVGBackend::new(path.as_std_path(), CHART_SIZE).into_drawing_area();
    draw(&root, request).map_err(|err| CovidError::Render(err.to_string()))?;
    root.present()
        .map_err(|err| CovidError::Render(err.to_string()))?;
    debug!(%path, mode = %request.mode, "chart written");
    Ok(())
}

pub fn render_svg_string(request: &ChartRequest<'_>) -> Result<String, CovidError> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        draw(&root, request).map_err(|err| CovidError::Render(err.to_string()))?;
        root.present()
            .map_err(|err| CovidError::Render(err.to_string()))?;
    }
    Ok(svg)
}

fn draw<DB>(root: &DrawingArea<DB, Shift>, request: &ChartRequest<'_>) -> DrawResult<DB>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let titled = root.titled(
        &request.title(),
        FontDesc::new(FontFamily::SansSerif, 28.0, FontStyle::Normal),
    )?;
    let panels = titled.split_evenly((1, 2));
    let (left, right) = (&panels[0], &panels[1]);

    match request.mode.single_category() {
        None => {
            draw_cumulated(left, request.series)?;
            draw_daily(right, request.series)?;
        }
        Some(category) => {
            draw_linear(left, request.series, category)?;
            draw_logarithmic(right, request.series, category)?;
        }
    }
    Ok(())
}

fn draw_cumulated<DB>(area: &DrawingArea<DB, Shift>, series: &RegionSeries) -> DrawResult<DB>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let active = series.active();
    let days = active.len();
    let deaths_top: Vec<f64> = series.deaths.cumulative[..days]
        .iter()
        .map(|v| *v as f64)
        .collect();
    let recovered_top: Vec<f64> = deaths_top
        .iter()
        .zip(&series.recovered.cumulative[..days])
        .map(|(below, v)| below + *v as f64)
        .collect();
    let active_top: Vec<f64> = recovered_top
        .iter()
        .zip(&active)
        .map(|(below, v)| below + *v as f64)
        .collect();

    let (y_min, y_max) = value_bounds(
        deaths_top
            .iter()
            .chain(&recovered_top)
            .chain(&active_top)
            .copied()
            .chain(std::iter::once(0.0)),
    );

    let change: Vec<(f64, f64)> = series
        .active_change_percent()
        .into_iter()
        .enumerate()
        .filter_map(|(i, value)| value.map(|v| (day_x(i + 1), v)))
        .collect();
    let (pct_min, pct_max) = value_bounds(change.iter().map(|(_, v)| *v).chain([0.0]));

    let x_range = day_range(days);
    let mut chart = ChartBuilder::on(area)
        .caption("cumulated view", label_font(22.0))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .right_y_label_area_size(60)
        .build_cartesian_2d(x_range.clone(), y_min..y_max)?
        .set_secondary_coord(x_range, pct_min..pct_max);

    chart
        .configure_mesh()
        .x_desc("days")
        .y_desc("cases")
        .x_labels(week_ticks(days))
        .x_label_formatter(&|v| format!("{v:.0}"))
        .y_label_formatter(&|v| eng_format(*v))
        .light_line_style(BLACK.mix(0.05))
        .draw()?;
    chart
        .configure_secondary_axes()
        .y_desc("%")
        .y_label_formatter(&|v| format!("{v:.0}"))
        .draw()?;

    let layers = [
        ("active", &active_top, BLUE_TAB),
        ("recovered", &recovered_top, GREEN_TAB),
        ("deaths", &deaths_top, RED_TAB),
    ];
    for (label, values, color) in layers {
        chart
            .draw_series(AreaSeries::new(
                values.iter().enumerate().map(|(i, v)| (day_x(i), *v)),
                0.0,
                color.mix(0.85),
            ))?
            .label(label)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], color.filled()));
    }

    chart
        .draw_secondary_series(LineSeries::new(change.iter().copied(), &GREY))?
        .label("change active %")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &GREY));
    chart.draw_secondary_series(DashedLineSeries::new(
        (0..days).map(|i| (day_x(i), 0.0)),
        2,
        4,
        ZERO_LINE.into(),
    ))?;

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK.mix(0.3))
        .label_font(label_font(16.0))
        .position(SeriesLabelPosition::UpperLeft)
        .draw()?;
    Ok(())
}

fn draw_daily<DB>(area: &DrawingArea<DB, Shift>, series: &RegionSeries) -> DrawResult<DB>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let lines = [
        ("active", &series.infected.delta, BLUE_TAB),
        ("recovered", &series.recovered.delta, GREEN_TAB),
        ("deaths", &series.deaths.delta, RED_TAB),
    ];
    let (y_min, y_max) = value_bounds(
        lines
            .iter()
            .flat_map(|(_, values, _)| values.iter().map(|v| *v as f64))
            .chain([0.0]),
    );
    let days = series.days();

    let mut chart = ChartBuilder::on(area)
        .caption("daily view", label_font(22.0))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(day_range(days), y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("days")
        .y_desc("cases")
        .x_labels(week_ticks(days))
        .x_label_formatter(&|v| format!("{v:.0}"))
        .y_label_formatter(&|v| eng_format(*v))
        .light_line_style(BLACK.mix(0.05))
        .draw()?;

    for (label, values, color) in lines {
        chart
            .draw_series(LineSeries::new(
                values.iter().enumerate().map(|(i, v)| (day_x(i + 1), *v as f64)),
                &color,
            ))?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK.mix(0.3))
        .label_font(label_font(16.0))
        .position(SeriesLabelPosition::UpperLeft)
        .draw()?;
    Ok(())
}

fn draw_linear<DB>(
    area: &DrawingArea<DB, Shift>,
    series: &RegionSeries,
    category: Category,
) -> DrawResult<DB>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let points: Vec<(f64, f64)> = series
        .get(category)
        .cumulative
        .iter()
        .enumerate()
        .map(|(i, v)| (day_x(i), *v as f64))
        .collect();
    let days = points.len();
    let (y_min, y_max) = value_bounds(points.iter().map(|(_, v)| *v).chain([0.0]));

    let mut chart = ChartBuilder::on(area)
        .caption("linear", label_font(22.0))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(day_range(days), y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("days")
        .x_labels(week_ticks(days))
        .x_label_formatter(&|v| format!("{v:.0}"))
        .y_label_formatter(&|v| eng_format(*v))
        .light_line_style(BLACK.mix(0.05))
        .draw()?;

    chart.draw_series(LineSeries::new(points.iter().copied(), &BLUE_TAB))?;
    chart.draw_series(
        points
            .iter()
            .map(|(x, y)| Circle::new((*x, *y), 3, BLUE_TAB.filled())),
    )?;
    Ok(())
}

fn draw_logarithmic<DB>(
    area: &DrawingArea<DB, Shift>,
    series: &RegionSeries,
    category: Category,
) -> DrawResult<DB>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let cumulative = &series.get(category).cumulative;
    let days = cumulative.len();
    let points: Vec<(f64, f64)> = cumulative
        .iter()
        .enumerate()
        .filter(|(_, v)| **v > 0)
        .map(|(i, v)| (day_x(i), *v as f64))
        .collect();

    let min_pos = points.iter().map(|(_, v)| *v).fold(f64::INFINITY, f64::min);
    let max_pos = points.iter().map(|(_, v)| *v).fold(1.0, f64::max);
    let min_pos = if min_pos.is_finite() { min_pos.max(1.0) } else { 1.0 };
    let max_pos = if max_pos > min_pos { max_pos * 1.5 } else { min_pos * 10.0 };

    let mut chart = ChartBuilder::on(area)
        .caption("logarithmic", label_font(22.0))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(day_range(days), (min_pos..max_pos).log_scale())?;

    chart
        .configure_mesh()
        .x_desc("days")
        .x_labels(week_ticks(days))
        .x_label_formatter(&|v| format!("{v:.0}"))
        .y_label_formatter(&|v| eng_format(*v))
        .light_line_style(BLACK.mix(0.05))
        .draw()?;

    chart.draw_series(LineSeries::new(points.iter().copied(), &BLUE_TAB))?;
    chart.draw_series(
        points
            .iter()
            .map(|(x, y)| Circle::new((*x, *y), 3, BLUE_TAB.filled())),
    )?;
    Ok(())
}

pub fn eng_format(value: f64) -> String {
    const PREFIXES: [&str; 4] = ["", "k", "M", "G"];
    let mut mantissa = value;
    let mut prefix = 0;
    // prefix follows the mantissa as printed, with one decimal
    while prefix + 1 < PREFIXES.len() && (mantissa * 10.0).round().abs() >= 10_000.0 {
        mantissa /= 1000.0;
        prefix += 1;
    }
    format!("{}{}", trim_fraction(mantissa), PREFIXES[prefix])
}

fn trim_fraction(value: f64) -> String {
    let text = format!("{value:.1}");
    let text = text.strip_suffix(".0").map(str::to_string).unwrap_or(text);
    if text == "-0" { "0".to_string() } else { text }
}

// Day numbers start at 1 for the start date.
fn day_x(index: usize) -> f64 {
    (index + 1) as f64
}

fn day_range(days: usize) -> std::ops::Range<f64> {
    1.0..(days.max(2) as f64)
}

fn week_ticks(days: usize) -> usize {
    (days / 7).clamp(2, 30) + 1
}

fn value_bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let span = (max - min).max(1.0);
    let lower = if min < 0.0 { min - span * 0.05 } else { min };
    (lower, max + span * 0.05)
}

fn label_font(size: f64) -> FontDesc<'static> {
    FontDesc::new(FontFamily::SansSerif, size, FontStyle::Normal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RegionSeries {
        RegionSeries::new(vec![10, 12, 15], vec![0, 1, 3], vec![0, 0, 1])
    }

    #[test]
    fn engineering_labels() {
        assert_eq!(eng_format(0.0), "0");
        assert_eq!(eng_format(999.0), "999");
        assert_eq!(eng_format(1500.0), "1.5k");
        assert_eq!(eng_format(2_000_000.0), "2M");
        assert_eq!(eng_format(-2500.0), "-2.5k");
        assert_eq!(eng_format(0.5), "0.5");
    }

    #[test]
    fn engineering_labels_carry_into_next_prefix() {
        assert_eq!(eng_format(999_999.0), "1M");
        assert_eq!(eng_format(999.96), "1k");
        assert_eq!(eng_format(-999_960.0), "-1M");
        assert_eq!(eng_format(999.94), "999.9");
    }

    #[test]
    fn bounds_have_headroom() {
        assert_eq!(value_bounds(std::iter::empty()), (0.0, 1.0));
        let (lo, hi) = value_bounds([0.0, 100.0].into_iter());
        assert_eq!(lo, 0.0);
        assert!(hi > 100.0);
        let (lo, _) = value_bounds([-10.0, 10.0].into_iter());
        assert!(lo < -10.0);
    }

    #[test]
    fn title_skips_empty_state() {
        let series = sample();
        let region = RegionKey::new("", "Germany");
        let request = ChartRequest {
            mode: ChartMode::Stacked,
            region: &region,
            start_date: NaiveDate::from_ymd_opt(2020, 3, 1).unwrap(),
            series: &series,
        };
        assert_eq!(request.title(), "COVID-19 stacked since 2020-03-01 Germany");

        let region = RegionKey::new("Hubei", "China");
        let request = ChartRequest {
            mode: ChartMode::Deaths,
            region: &region,
            ..request
        };
        assert_eq!(request.title(), "COVID-19 deaths since 2020-03-01 Hubei China");
    }

    #[test]
    fn renders_every_mode() {
        let series = sample();
        let region = RegionKey::new("", "X");
        for mode in [
            ChartMode::Stacked,
            ChartMode::Infected,
            ChartMode::Recovered,
            ChartMode::Deaths,
        ] {
            let request = ChartRequest {
                mode,
                region: &region,
                start_date: NaiveDate::from_ymd_opt(2020, 3, 1).unwrap(),
                series: &series,
            };
            let svg = render_svg_string(&request).unwrap();
            assert!(svg.contains("<svg"), "mode {mode}");
            assert!(svg.contains(&format!("COVID-19 {mode}")));
        }
    }

    #[test]
    fn stacked_chart_has_both_views() {
        let series = sample();
        let region = RegionKey::new("", "X");
        let request = ChartRequest {
            mode: ChartMode::Stacked,
            region: &region,
            start_date: NaiveDate::from_ymd_opt(2020, 3, 1).unwrap(),
            series: &series,
        };
        let svg = render_svg_string(&request).unwrap();
        assert!(svg.contains("cumulated view"));
        assert!(svg.contains("daily view"));
        assert!(svg.contains("change active %"));
        // the zero line on the % axis is drawn in short dashes
        assert!(svg.matches("#404040").count() > 1);
    }

    #[test]
    fn single_day_series_still_renders() {
        let series = RegionSeries::new(vec![0], vec![0], vec![0]);
        let region = RegionKey::new("", "X");
        let request = ChartRequest {
            mode: ChartMode::Infected,
            region: &region,
            start_date: NaiveDate::from_ymd_opt(2020, 3, 1).unwrap(),
            series: &series,
        };
        let svg = render_svg_string(&request).unwrap();
        assert!(svg.contains("logarithmic"));
    }
}
