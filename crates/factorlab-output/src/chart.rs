//! SVG charts.
//!
//! Charts are laid out as a grid of [`Panel`]s and written as standalone SVG
//! files. Only the handful of panel kinds the studies need are supported.

use crate::error::Result;
use std::fmt::Write as _;
use std::path::Path;

const PANEL_WIDTH: f64 = 480.0;
const PANEL_HEIGHT: f64 = 340.0;
const PAD_LEFT: f64 = 62.0;
const PAD_RIGHT: f64 = 18.0;
const PAD_TOP: f64 = 34.0;
const PAD_BOTTOM: f64 = 48.0;
const TICKS: usize = 5;

const POINT_COLOR: &str = "#1f77b4";
const FIT_COLOR: &str = "#d62728";
const GRID_COLOR: &str = "#dddddd";

/// What a panel draws.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelKind {
    /// Scatter plot with an optional fitted line `y = intercept + slope * x`.
    Scatter {
        /// Points to plot.
        points: Vec<(f64, f64)>,
        /// Optional `(intercept, slope)` line.
        fit: Option<(f64, f64)>,
    },
    /// Connected line with markers and an optional horizontal reference.
    Line {
        /// Points in x order.
        points: Vec<(f64, f64)>,
        /// Optional dashed horizontal line.
        reference_y: Option<f64>,
    },
    /// Density-normalised histogram.
    Histogram {
        /// Raw values.
        values: Vec<f64>,
        /// Number of equal-width bins.
        bins: usize,
    },
    /// Vertical bars with category labels.
    Bars {
        /// Category labels.
        labels: Vec<String>,
        /// Bar heights.
        values: Vec<f64>,
    },
}

/// One chart in a figure grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    /// Panel title.
    pub title: String,
    /// X axis label.
    pub x_label: String,
    /// Y axis label.
    pub y_label: String,
    /// Optional legend text drawn in the top-left corner.
    pub legend: Option<String>,
    /// Content.
    pub kind: PanelKind,
}

impl Panel {
    /// Create a panel with empty labels.
    pub fn new(title: impl Into<String>, kind: PanelKind) -> Self {
        Self {
            title: title.into(),
            x_label: String::new(),
            y_label: String::new(),
            legend: None,
            kind,
        }
    }

    /// Set axis labels.
    pub fn labels(mut self, x: impl Into<String>, y: impl Into<String>) -> Self {
        self.x_label = x.into();
        self.y_label = y.into();
        self
    }

    /// Set legend text.
    pub fn legend(mut self, text: impl Into<String>) -> Self {
        self.legend = Some(text.into());
        self
    }
}

/// A grid of panels rendered to one SVG document.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    panels: Vec<Panel>,
    columns: usize,
}

impl Figure {
    /// Create a figure with `columns` panels per row.
    pub fn new(columns: usize) -> Self {
        Self {
            panels: Vec::new(),
            columns: columns.max(1),
        }
    }

    /// Add a panel.
    pub fn panel(mut self, panel: Panel) -> Self {
        self.panels.push(panel);
        self
    }

    /// Number of panels.
    pub fn len(&self) -> usize {
        self.panels.len()
    }

    /// Whether the figure has no panels.
    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    /// Render as an SVG document.
    pub fn to_svg(&self) -> String {
        let rows = self.panels.len().div_ceil(self.columns).max(1);
        let width = PANEL_WIDTH * self.columns as f64;
        let height = PANEL_HEIGHT * rows as f64;
        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}" font-family="Helvetica, Arial, sans-serif">"#
        );
        let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
        for (i, panel) in self.panels.iter().enumerate() {
            let ox = (i % self.columns) as f64 * PANEL_WIDTH;
            let oy = (i / self.columns) as f64 * PANEL_HEIGHT;
            render_panel(&mut svg, panel, ox, oy);
        }
        svg.push_str("</svg>\n");
        svg
    }

    /// Write the SVG to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_svg(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_svg())?;
        tracing::info!(path = %path.display(), "Saved figure");
        Ok(())
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Data range padded by 5% on each side; degenerate ranges are widened.
fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return (0.0, 1.0);
    }
    let span = hi - lo;
    if span.abs() < 1e-12 {
        let pad = if lo.abs() > 0.0 { lo.abs() * 0.1 } else { 1.0 };
        return (lo - pad, hi + pad);
    }
    (lo - span * 0.05, hi + span * 0.05)
}

/// Equal-width bins over the data range as `(left_edge, width, density)`.
pub fn histogram_bins(values: &[f64], bins: usize) -> Vec<(f64, f64, f64)> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || bins == 0 {
        return Vec::new();
    }
    let lo = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = if hi > lo { (hi - lo) / bins as f64 } else { 1.0 };
    let mut counts = vec![0_usize; bins];
    for v in &finite {
        let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }
    let n = finite.len() as f64;
    counts
        .into_iter()
        .enumerate()
        .map(|(i, c)| (lo + i as f64 * width, width, c as f64 / (n * width)))
        .collect()
}

struct Frame {
    x0: f64,
    y0: f64,
    w: f64,
    h: f64,
    xr: (f64, f64),
    yr: (f64, f64),
}

impl Frame {
    fn px(&self, x: f64) -> f64 {
        self.x0 + (x - self.xr.0) / (self.xr.1 - self.xr.0) * self.w
    }

    fn py(&self, y: f64) -> f64 {
        self.y0 + self.h - (y - self.yr.0) / (self.yr.1 - self.yr.0) * self.h
    }
}

fn axes(svg: &mut String, f: &Frame, panel: &Panel, x_ticks: bool) {
    for i in 0..=TICKS {
        let t = i as f64 / TICKS as f64;
        let yv = f.yr.0 + t * (f.yr.1 - f.yr.0);
        let y = f.py(yv);
        let _ = writeln!(
            svg,
            r#"<line x1="{:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="{GRID_COLOR}"/><text x="{:.1}" y="{:.1}" font-size="10" text-anchor="end">{}</text>"#,
            f.x0,
            f.x0 + f.w,
            f.x0 - 4.0,
            y + 3.0,
            tick_label(yv)
        );
        if x_ticks {
            let xv = f.xr.0 + t * (f.xr.1 - f.xr.0);
            let x = f.px(xv);
            let _ = writeln!(
                svg,
                r#"<line x1="{x:.1}" y1="{:.1}" x2="{x:.1}" y2="{:.1}" stroke="{GRID_COLOR}"/><text x="{x:.1}" y="{:.1}" font-size="10" text-anchor="middle">{}</text>"#,
                f.y0,
                f.y0 + f.h,
                f.y0 + f.h + 14.0,
                tick_label(xv)
            );
        }
    }
    let _ = writeln!(
        svg,
        r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="none" stroke="black"/>"#,
        f.x0, f.y0, f.w, f.h
    );
    let _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" font-size="13" text-anchor="middle" font-weight="bold">{}</text>"#,
        f.x0 + f.w / 2.0,
        f.y0 - 12.0,
        escape(&panel.title)
    );
    let _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" font-size="11" text-anchor="middle">{}</text>"#,
        f.x0 + f.w / 2.0,
        f.y0 + f.h + 32.0,
        escape(&panel.x_label)
    );
    let cy = f.y0 + f.h / 2.0;
    let cx = f.x0 - 46.0;
    let _ = writeln!(
        svg,
        r#"<text x="{cx:.1}" y="{cy:.1}" font-size="11" text-anchor="middle" transform="rotate(-90 {cx:.1} {cy:.1})">{}</text>"#,
        escape(&panel.y_label)
    );
    if let Some(legend) = &panel.legend {
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-size="10" fill="{FIT_COLOR}">{}</text>"#,
            f.x0 + 6.0,
            f.y0 + 14.0,
            escape(legend)
        );
    }
}

fn tick_label(v: f64) -> String {
    if v.abs() >= 100.0 {
        format!("{v:.0}")
    } else if v.abs() >= 1.0 {
        format!("{v:.1}")
    } else {
        format!("{v:.2}")
    }
}

fn render_panel(svg: &mut String, panel: &Panel, ox: f64, oy: f64) {
    let x0 = ox + PAD_LEFT;
    let y0 = oy + PAD_TOP;
    let w = PANEL_WIDTH - PAD_LEFT - PAD_RIGHT;
    let h = PANEL_HEIGHT - PAD_TOP - PAD_BOTTOM;

    match &panel.kind {
        PanelKind::Scatter { points, fit } => {
            let f = Frame {
                x0,
                y0,
                w,
                h,
                xr: padded_range(points.iter().map(|p| p.0)),
                yr: padded_range(points.iter().map(|p| p.1)),
            };
            axes(svg, &f, panel, true);
            for &(x, y) in points.iter().filter(|(x, y)| x.is_finite() && y.is_finite()) {
                let _ = writeln!(
                    svg,
                    r#"<circle cx="{:.1}" cy="{:.1}" r="2.5" fill="{POINT_COLOR}" fill-opacity="0.6"/>"#,
                    f.px(x),
                    f.py(y)
                );
            }
            if let Some((a, b)) = fit {
                let (xa, xb) = f.xr;
                let _ = writeln!(
                    svg,
                    r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{FIT_COLOR}" stroke-width="2"/>"#,
                    f.px(xa),
                    f.py(a + b * xa).clamp(y0, y0 + h),
                    f.px(xb),
                    f.py(a + b * xb).clamp(y0, y0 + h)
                );
            }
        }
        PanelKind::Line {
            points,
            reference_y,
        } => {
            let f = Frame {
                x0,
                y0,
                w,
                h,
                xr: padded_range(points.iter().map(|p| p.0)),
                yr: padded_range(points.iter().map(|p| p.1).chain(reference_y.iter().copied())),
            };
            axes(svg, &f, panel, true);
            let path: Vec<String> = points
                .iter()
                .filter(|(x, y)| x.is_finite() && y.is_finite())
                .map(|&(x, y)| format!("{:.1},{:.1}", f.px(x), f.py(y)))
                .collect();
            let _ = writeln!(
                svg,
                r#"<polyline points="{}" fill="none" stroke="{POINT_COLOR}" stroke-width="1"/>"#,
                path.join(" ")
            );
            if let Some(r) = reference_y {
                let y = f.py(*r);
                let _ = writeln!(
                    svg,
                    r#"<line x1="{x0:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="{FIT_COLOR}" stroke-dasharray="6,4"/>"#,
                    x0 + w
                );
            }
        }
        PanelKind::Histogram { values, bins } => {
            let bars = histogram_bins(values, *bins);
            let xr = bars
                .first()
                .zip(bars.last())
                .map_or((0.0, 1.0), |(first, last)| (first.0, last.0 + last.1));
            let top = bars.iter().map(|b| b.2).fold(0.0, f64::max);
            let f = Frame {
                x0,
                y0,
                w,
                h,
                xr,
                yr: (0.0, if top > 0.0 { top * 1.1 } else { 1.0 }),
            };
            axes(svg, &f, panel, true);
            for (left, width, density) in bars {
                let x = f.px(left);
                let y = f.py(density);
                let _ = writeln!(
                    svg,
                    r#"<rect x="{x:.1}" y="{y:.1}" width="{:.1}" height="{:.1}" fill="{POINT_COLOR}" fill-opacity="0.7" stroke="black" stroke-width="0.5"/>"#,
                    f.px(left + width) - x,
                    f.py(0.0) - y
                );
            }
        }
        PanelKind::Bars { labels, values } => {
            let n = values.len().max(1);
            let (lo, hi) = padded_range(values.iter().copied().chain(std::iter::once(0.0)));
            let f = Frame {
                x0,
                y0,
                w,
                h,
                xr: (0.0, n as f64),
                yr: (lo, hi),
            };
            axes(svg, &f, panel, false);
            let base = f.py(0.0);
            for (i, v) in values.iter().enumerate() {
                let x = f.px(i as f64 + 0.15);
                let bw = f.px(i as f64 + 0.85) - x;
                let (v, color) = if v.is_finite() { (*v, POINT_COLOR) } else { (0.0, GRID_COLOR) };
                let y = f.py(v);
                let _ = writeln!(
                    svg,
                    r#"<rect x="{x:.1}" y="{:.1}" width="{bw:.1}" height="{:.1}" fill="{color}" fill-opacity="0.8"/>"#,
                    y.min(base),
                    (base - y).abs()
                );
                if let Some(label) = labels.get(i) {
                    let lx = x + bw / 2.0;
                    let ly = y0 + h + 14.0;
                    let _ = writeln!(
                        svg,
                        r#"<text x="{lx:.1}" y="{ly:.1}" font-size="9" text-anchor="end" transform="rotate(-25 {lx:.1} {ly:.1})">{}</text>"#,
                        escape(label)
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn histogram_density_integrates_to_one() {
        let values: Vec<f64> = (0..100).map(|i| f64::from(i) / 10.0).collect();
        let bins = histogram_bins(&values, 25);
        assert_eq!(bins.len(), 25);
        let area: f64 = bins.iter().map(|(_, w, d)| w * d).sum();
        assert_relative_eq!(area, 1.0, epsilon = 1e-12);
        assert!(histogram_bins(&[], 10).is_empty());
    }

    #[test]
    fn constant_values_land_in_one_bin() {
        let bins = histogram_bins(&[0.5; 7], 5);
        assert_eq!(bins[0].2 * bins[0].1, 1.0);
    }

    #[test]
    fn padded_range_handles_degenerate_input() {
        assert_eq!(padded_range(std::iter::empty()), (0.0, 1.0));
        let (lo, hi) = padded_range([2.0, 2.0].into_iter());
        assert!(lo < 2.0 && hi > 2.0);
        let (lo, hi) = padded_range([0.0, 10.0, f64::NAN].into_iter());
        assert_relative_eq!(lo, -0.5);
        assert_relative_eq!(hi, 10.5);
    }

    #[test]
    fn diagnostics_grid_renders_all_panels() {
        let points: Vec<(f64, f64)> = (0..30).map(|i| (f64::from(i), 0.5 * f64::from(i))).collect();
        let fig = Figure::new(2)
            .panel(
                Panel::new("Fit", PanelKind::Scatter { points: points.clone(), fit: Some((0.0, 0.5)) })
                    .labels("UMD (%)", "SPMO excess (%)")
                    .legend("beta=0.500 & R2=1.000"),
            )
            .panel(Panel::new("Residuals", PanelKind::Line { points: points.clone(), reference_y: Some(0.0) }))
            .panel(Panel::new("Histogram", PanelKind::Histogram { values: vec![1.0, 2.0, 2.5], bins: 3 }))
            .panel(Panel::new(
                "Betas",
                PanelKind::Bars {
                    labels: vec!["Winners_VW".into(), "<UMD>".into()],
                    values: vec![0.9, f64::NAN],
                },
            ));
        let svg = fig.to_svg();
        assert_eq!(fig.len(), 4);
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains(r#"width="960""#));
        assert!(svg.contains(r#"height="680""#));
        assert_eq!(svg.matches("<circle").count(), 30);
        assert!(svg.contains("<polyline"));
        assert!(svg.contains("&amp; R2"));
        assert!(svg.contains("&lt;UMD&gt;"));
        assert!(!svg.contains("NaN"));
    }
}
