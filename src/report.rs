//! Human-readable rendering of analysis reports.

use std::fmt;

use crate::fusion::AnalysisReport;
use crate::risk::assess;

/// Plain-text rendering of an [`AnalysisReport`].
struct Summary<'a>(&'a AnalysisReport);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        writeln!(
            f,
            "Fracture analysis ({} bone(s), confidence = {:.2})",
            report.fractures.len(),
            report.confidence
        )?;

        for fracture in &report.fractures {
            let severity = fracture
                .severity
                .map_or_else(|| "unclassified".to_string(), |severity| severity.to_string());
            writeln!(
                f,
                "  {}: {} fracture at {:.0}% of length, {severity}",
                fracture.bone,
                fracture.damage,
                fracture.location * 100.0
            )?;
            writeln!(
                f,
                "    fragments: top = {:+.1} deg, bottom = {:+.1} deg, deviation = {:.1} deg",
                fracture.top_angle,
                fracture.bottom_angle,
                fracture.angular_deviation()
            )?;
            if let Ok(risk) = assess(fracture) {
                writeln!(f, "    at risk: {}", risk.structures.join(", "))?;
            }
        }

        if report.fractures.is_empty() {
            writeln!(f, "  no bone could be analysed")?;
        }
        for warning in &report.warnings {
            writeln!(f, "  warning: {}", warning.message)?;
        }
        Ok(())
    }
}

/// Render a textual summary of a fracture report.
///
/// One block per bone lists the damage type, break location, fragment angles
/// and the structures at risk; warnings follow at the end.
#[must_use]
pub fn render_summary(report: &AnalysisReport) -> String {
    Summary(report).to_string()
}
