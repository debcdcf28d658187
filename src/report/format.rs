//! Formatted terminal output.
//!
//! Formatting lives here so the fitting code stays free of presentation and
//! output changes stay localized.

use crate::domain::ExtremumKind;
use crate::fit::FitResult;
use crate::report::ModelComparison;

/// Full summary for a single fit.
pub fn format_fit_summary(source: &str, rows_read: usize, result: &FitResult) -> String {
    let mut out = String::new();

    out.push_str("=== autofit ===\n");
    out.push_str(&format!("Data: {source}\n"));
    out.push_str(&format!("Model: {}\n", result.model.display_name()));
    let (x_min, x_max) = result.samples.x_range().unwrap_or((f64::NAN, f64::NAN));
    out.push_str(&format!(
        "Points: used={} of {rows_read} | x=[{x_min:.4}, {x_max:.4}]\n",
        result.samples.len()
    ));
    out.push_str(&format!(
        "Weighting: {}\n",
        if result.weighted { "1/yerr" } else { "none" }
    ));

    out.push_str("\nParameters:\n");
    out.push_str(&format_param_table(result));

    let q = &result.quality;
    out.push_str("\nQuality:\n");
    out.push_str(&format!("- residual std error: {:.6e}\n", q.residual_std_error));
    out.push_str(&format!("- R^2               : {:.6}\n", q.r_squared));
    if let Some(chi2) = q.reduced_chi_squared {
        out.push_str(&format!("- reduced chi^2     : {chi2:.4}\n"));
    }
    out.push_str(&format!("- free parameters   : {} (n={})\n", q.n_free, q.n));

    if result.model.is_linear() {
        out.push_str("\nExtrema:\n");
        if result.extrema.is_empty() {
            out.push_str("  (none in range)\n");
        }
        for e in &result.extrema {
            out.push_str(&format!(
                "  {:<10} x={:.6} y={:.6}\n",
                extremum_label(e.kind),
                e.x,
                e.y
            ));
        }
    }

    match result.termination {
        Some(t) => out.push_str(&format!(
            "\nSolver: {} evaluations ({t:?})\n",
            result.evaluations
        )),
        None => out.push_str("\nSolver: direct linear solve\n"),
    }

    if let Some(band) = &result.band {
        let widest = band.sigma.iter().copied().fold(0.0_f64, f64::max);
        out.push_str(&format!(
            "Band: {:.1}% | max sigma={widest:.4e}{}{}\n",
            band.level * 100.0,
            if band.degenerate { " | degenerate" } else { "" },
            if band.held_assumed_exact { " | held params treated as exact" } else { "" },
        ));
    }

    if !result.diagnostics.is_empty() {
        out.push_str("\nDiagnostics:\n");
        for d in &result.diagnostics {
            out.push_str(&format!("- {d}\n"));
        }
    }

    out
}

fn format_param_table(result: &FitResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<8} {:>16} {:>14} {:<4}", "name", "value", "error", "held").trim_end());
    out.push('\n');
    out.push_str(&format!("{:-<8} {:-<16} {:-<14} {:-<4}", "", "", "", ""));
    out.push('\n');

    for (i, name) in result.names.iter().enumerate() {
        let held = if result.is_held(name) { "yes" } else { "" };
        out.push_str(
            format!(
                "{:<8} {:>16.8e} {:>14.4e} {:<4}",
                truncate(name, 8),
                result.params[i],
                result.errors[i],
                held
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Ranking table for `compare`.
pub fn format_comparison(rows: &[ModelComparison]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<4} {:<26} {:>12} {:>14}", "rank", "model", "R^2", "std error").trim_end());
    out.push('\n');
    out.push_str(&format!("{:-<4} {:-<26} {:-<12} {:-<14}", "", "", "", ""));
    out.push('\n');

    let mut rank = 0;
    for row in rows {
        match &row.outcome {
            Ok(q) => {
                rank += 1;
                out.push_str(&format!(
                    "{rank:<4} {:<26} {:>12.6} {:>14.4e}\n",
                    row.model.display_name(),
                    q.r_squared,
                    q.residual_std_error
                ));
            }
            Err(msg) => {
                out.push_str(&format!("{:<4} {:<26} failed: {msg}\n", "-", row.model.display_name()));
            }
        }
    }
    out
}

fn extremum_label(kind: ExtremumKind) -> &'static str {
    match kind {
        ExtremumKind::Maximum => "maximum",
        ExtremumKind::Minimum => "minimum",
        ExtremumKind::Stationary => "stationary",
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
