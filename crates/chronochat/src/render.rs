use std::error::Error;

use chrono::DateTime;
use chronochat_core::chart::{
    ChartDescription, ChartSeries, LegendLayout, LegendOrientation, SeriesMode,
};
use chronochat_core::export::{ChartRenderer, ExportError};
use plotters::prelude::*;

const CAPTION_FONT: (&str, u32) = ("sans-serif", 22);
const DEFAULT_MARKER_SIZE: u32 = 4;

/// Draws chart descriptions with plotters' bitmap backend and encodes the
/// result as PNG.
pub struct PlottersRenderer;

impl ChartRenderer for PlottersRenderer {
    fn render_png(
        &self,
        chart: &ChartDescription,
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>, ExportError> {
        let mut rgb = vec![0u8; width as usize * height as usize * 3];
        draw(chart, &mut rgb, width, height).map_err(|err| ExportError::Render(err.to_string()))?;
        encode_png(&rgb, width, height)
    }
}

fn seconds(point_time: DateTime<chrono::Utc>) -> f64 {
    point_time.timestamp_millis() as f64 / 1000.0
}

/// Named CSS colours used by chart descriptions, plus `#rrggbb`.
fn parse_color(name: &str) -> Option<RGBColor> {
    let name = name.trim().to_ascii_lowercase();
    if let Some(hex) = name.strip_prefix('#') {
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        return Some(RGBColor(channel(0..2)?, channel(2..4)?, channel(4..6)?));
    }
    let rgb = match name.as_str() {
        "black" => (0, 0, 0),
        "white" => (255, 255, 255),
        "red" => (255, 0, 0),
        "green" => (0, 128, 0),
        "blue" => (0, 0, 255),
        "yellow" => (255, 255, 0),
        "cyan" => (0, 255, 255),
        "magenta" => (255, 0, 255),
        "orange" => (255, 165, 0),
        "purple" => (128, 0, 128),
        "pink" => (255, 192, 203),
        "gray" | "grey" => (128, 128, 128),
        _ => return None,
    };
    Some(RGBColor(rgb.0, rgb.1, rgb.2))
}

fn series_color(series: &ChartSeries, idx: usize) -> RGBAColor {
    series
        .marker
        .as_ref()
        .and_then(|marker| marker.color.as_deref())
        .and_then(parse_color)
        .map(|color| color.to_rgba())
        .unwrap_or_else(|| Palette99::pick(idx).to_rgba())
}

/// Maps the legend anchor onto the nearest slot inside the plot area; anchors
/// outside 0..1 are clamped to the edge they point at.
fn legend_position(legend: &LegendLayout) -> SeriesLabelPosition {
    if legend.orientation == LegendOrientation::Horizontal {
        return SeriesLabelPosition::UpperMiddle;
    }
    let column = match legend.x.unwrap_or(1.0) {
        x if x < 1.0 / 3.0 => 0,
        x if x < 2.0 / 3.0 => 1,
        _ => 2,
    };
    let row = match legend.y.unwrap_or(1.0) {
        y if y > 2.0 / 3.0 => 0,
        y if y > 1.0 / 3.0 => 1,
        _ => 2,
    };
    match (row, column) {
        (0, 0) => SeriesLabelPosition::UpperLeft,
        (0, 1) => SeriesLabelPosition::UpperMiddle,
        (0, _) => SeriesLabelPosition::UpperRight,
        (1, 0) => SeriesLabelPosition::MiddleLeft,
        (1, 1) => SeriesLabelPosition::MiddleMiddle,
        (1, _) => SeriesLabelPosition::MiddleRight,
        (_, 0) => SeriesLabelPosition::LowerLeft,
        (_, 1) => SeriesLabelPosition::LowerMiddle,
        _ => SeriesLabelPosition::LowerRight,
    }
}

fn legend_border(legend: &LegendLayout) -> ShapeStyle {
    let color = legend
        .border_color
        .as_deref()
        .and_then(parse_color)
        .unwrap_or(BLACK);
    let width = legend
        .border_width
        .map(|width| width.round().max(1.0) as u32)
        .unwrap_or(1);
    color.stroke_width(width)
}

fn padded(lo: f64, hi: f64) -> (f64, f64) {
    if (hi - lo).abs() < f64::EPSILON {
        (lo - 1.0, hi + 1.0)
    } else {
        let pad = (hi - lo) * 0.05;
        (lo - pad, hi + pad)
    }
}

fn draw(
    chart: &ChartDescription,
    buffer: &mut [u8],
    width: u32,
    height: u32,
) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::with_buffer(buffer, (width, height)).into_drawing_area();
    root.fill(&WHITE)?;

    let (start, end) = chart.time_range().ok_or("chart has no points")?;
    let (x_min, x_max) = padded(seconds(start), seconds(end));
    let (value_min, value_max) = chart.value_range().ok_or("chart has no points")?;
    let (y_min, y_max) = match chart.series.first().map(|series| series.mode) {
        Some(SeriesMode::Bars) => (0.0, value_max * 1.1 + 1.0),
        _ => padded(value_min, value_max),
    };

    let mut ctx = ChartBuilder::on(&root)
        .caption(&chart.layout.title, CAPTION_FONT)
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    let time_label = |x: &f64| {
        DateTime::from_timestamp(*x as i64, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default()
    };
    ctx.configure_mesh()
        .x_desc(chart.layout.x_axis_title.as_str())
        .y_desc(chart.layout.y_axis_title.as_str())
        .x_labels(6)
        .x_label_formatter(&time_label)
        .draw()?;

    let bar_slots = chart.series.len().max(1) as f64;
    let bar_width = (x_max - x_min) / 60.0;

    for (idx, series) in chart.series.iter().enumerate() {
        let color = series_color(series, idx);
        let points: Vec<(f64, f64)> = series
            .points
            .iter()
            .map(|point| (seconds(point.timestamp), point.value))
            .collect();

        match series.mode {
            SeriesMode::LinesMarkers => {
                let size = series
                    .marker
                    .as_ref()
                    .map(|marker| marker.size.round() as u32)
                    .unwrap_or(DEFAULT_MARKER_SIZE);
                ctx.draw_series(LineSeries::new(points.iter().copied(), &color))?
                    .label(series.name.clone())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
                ctx.draw_series(
                    points
                        .iter()
                        .map(|&point| Circle::new(point, size, color.filled())),
                )?;
            }
            SeriesMode::Markers => {
                ctx.draw_series(
                    points
                        .iter()
                        .map(|&point| Circle::new(point, DEFAULT_MARKER_SIZE, color.filled())),
                )?
                .label(series.name.clone())
                .legend(move |(x, y)| Circle::new((x + 10, y), DEFAULT_MARKER_SIZE, color.filled()));
            }
            SeriesMode::Bars => {
                // Series sit side by side inside one slot per timestamp.
                let offset = (idx as f64 - (bar_slots - 1.0) / 2.0) * bar_width / bar_slots;
                let half = bar_width / bar_slots / 2.0;
                ctx.draw_series(points.iter().map(|&(x, count)| {
                    Rectangle::new(
                        [(x + offset - half, 0.0), (x + offset + half, count)],
                        color.filled(),
                    )
                }))?
                .label(series.name.clone())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
            }
        }
    }

    ctx.configure_series_labels()
        .position(legend_position(&chart.layout.legend))
        .background_style(WHITE.mix(0.8))
        .border_style(legend_border(&chart.layout.legend))
        .draw()?;

    root.present()?;
    Ok(())
}

fn encode_png(rgb: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ExportError> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|err| ExportError::Render(err.to_string()))?;
        writer
            .write_image_data(rgb)
            .map_err(|err| ExportError::Render(err.to_string()))?;
    }
    Ok(out)
}
