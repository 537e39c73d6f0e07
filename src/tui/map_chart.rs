//! Plotters-powered location map widget for Ratatui.
//!
//! Records are drawn as coloured dots at their (longitude, latitude); the
//! town centre is drawn in white so an empty map still shows where it is.
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// Smallest span (degrees) shown on either axis.
const MIN_SPAN_DEG: f64 = 0.02;

/// A render-only map description; bounds are computed outside the render call.
pub struct DpeMapChart<'a> {
    /// `(longitude, latitude, rgb)` per located record.
    pub points: &'a [(f64, f64, (u8, u8, u8))],
    /// Town centre, `(longitude, latitude)`.
    pub center: (f64, f64),
    pub lon_bounds: [f64; 2],
    pub lat_bounds: [f64; 2],
}

impl<'a> DpeMapChart<'a> {
    /// Compute bounds enclosing `points` and `center`, padded by 5%.
    pub fn new(points: &'a [(f64, f64, (u8, u8, u8))], center: (f64, f64)) -> Self {
        let (lon_bounds, lat_bounds) = map_bounds(points, center);
        Self {
            points,
            center,
            lon_bounds,
            lat_bounds,
        }
    }
}

pub fn map_bounds(points: &[(f64, f64, (u8, u8, u8))], center: (f64, f64)) -> ([f64; 2], [f64; 2]) {
    let (mut lon0, mut lon1) = (center.0, center.0);
    let (mut lat0, mut lat1) = (center.1, center.1);
    for &(lon, lat, _) in points {
        lon0 = lon0.min(lon);
        lon1 = lon1.max(lon);
        lat0 = lat0.min(lat);
        lat1 = lat1.max(lat);
    }

    let pad = |lo: f64, hi: f64| -> [f64; 2] {
        let span = (hi - lo).max(MIN_SPAN_DEG);
        let mid = (lo + hi) / 2.0;
        let half = span * 1.05 / 2.0;
        [mid - half, mid + half]
    };

    (pad(lon0, lon1), pad(lat0, lat1))
}

impl Widget for DpeMapChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Map area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.lon_bounds;
        let [y0, y1] = self.lat_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 2)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_labels(3)
                .y_labels(3)
                .x_label_formatter(&|v| format!("{v:.2}"))
                .y_label_formatter(&|v| format!("{v:.2}"))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .draw()?;

            chart.draw_series(
                self.points
                    .iter()
                    .map(|&(lon, lat, (r, g, b))| Pixel::new((lon, lat), RGBColor(r, g, b))),
            )?;

            chart.draw_series(std::iter::once(Pixel::new(self.center, WHITE)))?;

            Ok(())
        });

        widget.render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_cover_points_and_center() {
        let points = [(5.70, 49.50, (0, 0, 0)), (5.80, 49.55, (0, 0, 0))];
        let (lon, lat) = map_bounds(&points, (5.76, 49.52));
        assert!(lon[0] < 5.70 && lon[1] > 5.80);
        assert!(lat[0] < 49.50 && lat[1] > 49.55);
    }

    #[test]
    fn lone_center_gets_a_minimum_span() {
        let (lon, lat) = map_bounds(&[], (5.76, 49.52));
        assert!(lon[1] - lon[0] >= MIN_SPAN_DEG);
        assert!(lat[1] - lat[0] >= MIN_SPAN_DEG);
        assert!(lon[0] < 5.76 && 5.76 < lon[1]);
    }
}
