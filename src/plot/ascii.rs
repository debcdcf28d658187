//! ASCII plotting for terminal output.
//!
//! Fixed-size character grid with deterministic output. Plot elements:
//! - observed points: `o`
//! - fitted curve: `-`
//! - confidence band edges: `:`

use crate::fit::FitResult;

/// Render samples, dense fit and (if attached) band edges.
pub fn render_ascii_plot(result: &FitResult, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let points: Vec<(f64, f64)> = result
        .samples
        .x
        .iter()
        .copied()
        .zip(result.samples.y.iter().copied())
        .collect();
    let curve: Vec<(f64, f64)> = result
        .dense_x
        .iter()
        .copied()
        .zip(result.dense_fit.iter().copied())
        .collect();
    let edges: Vec<Vec<(f64, f64)>> = match &result.band {
        Some(band) if !band.degenerate => vec![
            band.x.iter().copied().zip(band.upper.iter().copied()).collect(),
            band.x.iter().copied().zip(band.lower.iter().copied()).collect(),
        ],
        _ => Vec::new(),
    };

    let (x_min, x_max) = result.samples.x_range().unwrap_or((0.0, 1.0));
    let (x_min, x_max) = if x_max > x_min { (x_min, x_max) } else { pad_range(x_min, x_max, 0.5) };
    let all_y = points
        .iter()
        .chain(&curve)
        .chain(edges.iter().flatten())
        .map(|&(_, y)| y);
    let (y_min, y_max) = y_range(all_y).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let frame = Frame { x_min, x_max, y_min, y_max, width, height };
    let mut grid = vec![vec![' '; width]; height];

    // Band first, then curve, then points: later layers overwrite.
    for edge in &edges {
        draw_polyline(&mut grid, edge, &frame, ':');
    }
    draw_polyline(&mut grid, &curve, &frame, '-');
    for &(x, y) in &points {
        if x.is_finite() && y.is_finite() {
            let (col, row) = frame.cell(x, y);
            grid[row][col] = 'o';
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {} | x=[{x_min:.4}, {x_max:.4}] | y=[{y_min:.4}, {y_max:.4}]\n",
        result.model.display_name()
    ));
    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }
    out
}

struct Frame {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
    width: usize,
    height: usize,
}

impl Frame {
    /// `(column, row)`; row 0 is the top.
    fn cell(&self, x: f64, y: f64) -> (usize, usize) {
        let u = ((x - self.x_min) / (self.x_max - self.x_min)).clamp(0.0, 1.0);
        let v = ((y - self.y_min) / (self.y_max - self.y_min)).clamp(0.0, 1.0);
        let col = (u * (self.width as f64 - 1.0)).round() as usize;
        let row = (self.height as f64 - 1.0 - v * (self.height as f64 - 1.0)).round() as usize;
        (col, row)
    }
}

fn y_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo.is_finite() && hi.is_finite() {
        Some(if hi > lo { (lo, hi) } else { (lo - 0.5, hi + 0.5) })
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let pad = ((max - min).abs() * frac).max(1e-12);
    (min - pad, max + pad)
}

fn draw_polyline(grid: &mut [Vec<char>], line: &[(f64, f64)], frame: &Frame, ch: char) {
    let mut prev: Option<(usize, usize)> = None;
    for &(x, y) in line {
        if !(x.is_finite() && y.is_finite()) {
            prev = None;
            continue;
        }
        let cell = frame.cell(x, y);
        match prev {
            Some(p) => draw_line(grid, p, cell, ch),
            None => grid[cell.1][cell.0] = ch,
        }
        prev = Some(cell);
    }
}

/// Integer line drawing (Bresenham).
fn draw_line(grid: &mut [Vec<char>], from: (usize, usize), to: (usize, usize), ch: char) {
    let (mut x0, mut y0) = (from.0 as isize, from.1 as isize);
    let (x1, y1) = (to.0 as isize, to.1 as isize);

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        grid[y0 as usize][x0 as usize] = ch;
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
