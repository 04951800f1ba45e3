//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - density histogram: `#` bars
//! - best-fit density: `*` line, drawn over the bars

use crate::domain::{FitResult, Histogram, SeriesFit};
use crate::models::FittedDistribution;

/// Cap on how far the fitted curve may stretch the y-axis past the tallest bar.
const CURVE_HEADROOM: f64 = 3.0;

/// Render the histogram of a fitted series with its best fit overlaid.
pub fn render_fit_plot(fit: &SeriesFit, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);
    let hist = &fit.histogram;

    let (x_min, x_max) = match (hist.edges.first(), hist.edges.last()) {
        (Some(&a), Some(&b)) if b > a => (a, b),
        _ => return format!("Plot: {} (empty histogram)\n", fit.kind.display_name()),
    };

    let curve = fit.best().map(|best| sample_pdf(best, x_min, x_max, width)).unwrap_or_default();

    let bar_max = hist.density.iter().copied().fold(0.0_f64, f64::max);
    let curve_max = curve.iter().map(|&(_, y)| y).fold(0.0_f64, f64::max);
    let y_top = bar_max.max(curve_max.min(CURVE_HEADROOM * bar_max));
    let y_max = if y_top > 0.0 { y_top * 1.05 } else { 1.0 };

    let mut grid = vec![vec![' '; width]; height];

    // Curve first so the bars only fill what is left.
    draw_curve(&mut grid, &curve, x_min, x_max, y_max);
    draw_bars(&mut grid, hist, x_min, x_max, y_max);

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {} | best={} | x=[{x_min:.2}, {x_max:.2}] | density=[0, {y_max:.4e}]\n",
        fit.kind.display_name(),
        fit.best().map(|b| b.family.name()).unwrap_or("none"),
    ));

    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }

    out
}

fn sample_pdf(best: &FitResult, x_min: f64, x_max: f64, n: usize) -> Vec<(f64, f64)> {
    let Some(dist) = FittedDistribution::new(best.family, best.params.clone()) else {
        return Vec::new();
    };
    let n = n.max(2);
    (0..n)
        .map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            let x = x_min + u * (x_max - x_min);
            (x, dist.pdf(x))
        })
        .filter(|&(_, y)| y.is_finite())
        .collect()
}

fn draw_bars(grid: &mut [Vec<char>], hist: &Histogram, x_min: f64, x_max: f64, y_max: f64) {
    let bins = hist.density.len();
    if bins == 0 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    for col in 0..width {
        let u = col as f64 / (width as f64 - 1.0);
        let x = x_min + u * (x_max - x_min);
        let bin = (((x - x_min) / (x_max - x_min)) * bins as f64).floor() as usize;
        let density = hist.density[bin.min(bins - 1)];
        if density <= 0.0 {
            continue;
        }
        let top = map_y(density, 0.0, y_max, height);
        for row in grid.iter_mut().skip(top) {
            if row[col] == ' ' {
                row[col] = '#';
            }
        }
    }
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], x_min: f64, x_max: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in curve {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, 0.0, y_max, height);
        if let Some((c0, r0)) = prev {
            draw_line(grid, c0, r0, col, row, '*');
        } else {
            grid[row][col] = '*';
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
