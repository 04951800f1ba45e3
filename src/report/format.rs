//! Formatted terminal output for ranked fits.
//!
//! We keep formatting code in one place so:
//! - the fitting code stays clean and testable
//! - output changes are localized (golden tests below)

use crate::domain::{FitResult, SeriesFit};

const SCORE_COLUMNS: [&str; 6] = ["sumsquare_error", "aic", "bic", "kl_div", "ks_statistic", "ks_pvalue"];

/// Format one series: header line, the top `top_n` fits as a table, failed
/// families, and optionally the best fit's parameters.
pub fn format_series_summary(fit: &SeriesFit, top_n: usize, show_params: bool) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{}: n={} | bins={} | ranked by {}\n",
        fit.kind.display_name(),
        fit.n,
        fit.histogram.density.len(),
        fit.metric.name()
    ));
    out.push_str(&format_table(&fit.ranked[..top_n.min(fit.ranked.len())]));

    for failure in &fit.failures {
        out.push_str(&format!("  (failed {}) {}\n", failure.family, failure.reason));
    }

    if show_params {
        if let Some(best) = fit.best() {
            out.push_str(&format!("Best fit: {}\n", format_params(best)));
        }
    }

    out
}

fn format_table(rows: &[FitResult]) -> String {
    let mut out = String::new();

    let mut header = format!("{:<12}", "family");
    let mut rule = format!("{:-<12}", "");
    for col in SCORE_COLUMNS {
        header.push_str(&format!(" {col:>15}"));
        rule.push_str(&format!(" {:-<15}", ""));
    }
    out.push_str(header.trim_end());
    out.push('\n');
    out.push_str(rule.trim_end());
    out.push('\n');

    for r in rows {
        let s = &r.scores;
        let mut line = format!("{:<12}", r.family.name());
        for v in [s.sumsquare_error, s.aic, s.bic, s.kl_div, s.ks_statistic, s.ks_pvalue] {
            line.push_str(&format!(" {:>15}", fmt_score(v)));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

/// `family(name=value, ...)` with every parameter in storage order.
pub fn format_params(fit: &FitResult) -> String {
    let parts: Vec<String> = fit
        .params
        .named(fit.family)
        .into_iter()
        .map(|(name, v)| format!("{name}={}", fmt_score(v)))
        .collect();
    format!("{}({})", fit.family, parts.join(", "))
}

/// Fixed-point for ordinary magnitudes, scientific for tiny or huge ones.
fn fmt_score(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let a = v.abs();
    if a != 0.0 && !(1e-3..1e7).contains(&a) {
        format!("{v:.4e}")
    } else {
        format!("{v:.6}")
    }
}
