//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the measurement/fitting code stays free of presentation
//! - output changes are localized

use crate::domain::{PhaseSpan, RawSeries, SeriesStats};
use crate::fit::ModelFit;
use crate::models::FirstOrder;

/// Format the run summary (series stats + fit diagnostics + fitted model).
///
/// `reference` is the model the data was simulated from, when known; the
/// summary then includes the relative error of the fitted parameters.
pub fn format_run_summary(series: &RawSeries, fit: &ModelFit, reference: Option<&FirstOrder>) -> String {
    let mut out = String::new();

    out.push_str("=== hc - heat capacity fit ===\n");
    match SeriesStats::compute(series) {
        Some(stats) => {
            out.push_str(&format!(
                "Series: n={} | duration={:.3}s | dt={:.4}s\n",
                stats.n_samples, stats.duration, stats.mean_interval
            ));
            out.push_str(&format!(
                "Power: [{:.4e}, {:.4e}] W | Temperature: [{:.4}, {:.4}]\n",
                stats.power_min, stats.power_max, stats.temperature_min, stats.temperature_max
            ));
        }
        None => out.push_str("Series: empty\n"),
    }

    let model = &fit.model;
    out.push_str("\nFitted model:\n");
    out.push_str(&format!("- num: {}\n", fmt_vec(&model.num())));
    out.push_str(&format!("- den: {}\n", fmt_vec(&model.den())));
    out.push_str(&format!("- C  : {:.6e} J/K\n", model.heat_capacity()));
    out.push_str(&format!("- K  : {:.6e} W/K\n", model.thermal_conductivity()));
    out.push_str(&format!("- tau: {:.4} s\n", model.time_constant()));
    out.push_str(&format!(
        "- fit: rmse={:.3e} n={} span={:.3}s\n",
        fit.quality.rmse, fit.quality.n, fit.quality.span
    ));
    if !model.is_physical() {
        out.push_str("  (warning: fitted C or K is not positive)\n");
    }

    if let Some(reference) = reference {
        out.push_str("\nReference model:\n");
        out.push_str(&format!(
            "- C  : {:.6e} J/K ({})\n",
            reference.heat_capacity(),
            fmt_rel_err(model.heat_capacity(), reference.heat_capacity())
        ));
        out.push_str(&format!(
            "- K  : {:.6e} W/K ({})\n",
            reference.thermal_conductivity(),
            fmt_rel_err(model.thermal_conductivity(), reference.thermal_conductivity())
        ));
    }

    out
}

/// Format the adaptive phase log as a table.
pub fn format_phases(phases: &[PhaseSpan]) -> String {
    let mut out = String::new();
    out.push_str("Phases:\n");
    out.push_str(&format!("{:<10} {:>8} {:>8} {:>10}\n", "phase", "first", "samples", "elapsed"));
    out.push_str(&format!("{:-<10} {:-<8} {:-<8} {:-<10}\n", "", "", "", ""));
    for span in phases {
        out.push_str(&format!(
            "{:<10} {:>8} {:>8} {:>9.3}s\n",
            span.phase.display_name(),
            span.first_index,
            span.samples,
            span.elapsed
        ));
    }
    out
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.6e}")).collect();
    format!("[{}]", parts.join(", "))
}

fn fmt_rel_err(actual: f64, expected: f64) -> String {
    if expected == 0.0 {
        return "n/a".to_string();
    }
    format!("fit error {:+.2}%", 100.0 * (actual - expected) / expected)
}
