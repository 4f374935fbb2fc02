use std::fmt;

use crate::leak::{LeakReport, LoopAnalysis};

impl fmt::Display for LeakReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Leak report for {} processes", self.processes)?;
        for skipped in &self.skipped {
            writeln!(f, "skipped rank {}: {}", skipped.rank, skipped.reason)?;
        }
        for analysis in &self.loops {
            writeln!(f)?;
            write!(f, "{}", analysis)?;
        }
        writeln!(f)?;
        writeln!(f, "processing time: {:.6} s", self.elapsed.as_secs_f64())
    }
}

impl fmt::Display for LoopAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}]", self.index)?;
        writeln!(
            f,
            "iteration send_count recv_count source_sum dest_sum source_xor dest_xor verdict"
        )?;
        for entry in &self.iterations {
            let pattern = &entry.pattern;
            writeln!(
                f,
                "{} {} {} {} {} {} {} {}",
                entry.iteration,
                pattern.send_count,
                pattern.recv_count,
                pattern.source_sum,
                pattern.dest_sum,
                pattern.source_xor,
                pattern.dest_xor,
                entry.verdict
            )?;
        }
        Ok(())
    }
}
