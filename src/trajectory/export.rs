//! Tabular persistence for trajectories and analysis reports.
//!
//! Formats:
//! - trajectory CSV: header `t,x1,y1,x2,y2,theta1,theta2,omega1,omega2`,
//!   values written in shortest round-trip form so reading back is lossless
//! - KS report CSV: `Variable,KS_Statistic,p_value,Interpretation`
//! - entropy report CSV: `Variable,Entropy,Interpretation`, entropy as a
//!   three-decimal string
//! - binary trajectory snapshot (bincode)

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::analysis::{DivergenceReport, EntropyReport};
use crate::error::{SimError, SimResult};
use crate::trajectory::{Trajectory, TrajectorySample, Variable};

/// Header row of the KS report.
pub const DIVERGENCE_HEADER: &str = "Variable,KS_Statistic,p_value,Interpretation";

/// Header row of the entropy report.
pub const ENTROPY_HEADER: &str = "Variable,Entropy,Interpretation";

/// Header row of a trajectory table.
#[must_use]
pub fn trajectory_header() -> String {
    Variable::ALL.map(Variable::name).join(",")
}

/// Default entropy report file name for a scenario.
#[must_use]
pub fn entropy_file_name(scenario: &str) -> String {
    format!("{scenario}_entropy_scores_and_interpretations.csv")
}

fn create(path: &Path) -> SimResult<BufWriter<File>> {
    let file = File::create(path)
        .map_err(|e| SimError::io(format!("Failed to create {}: {e}", path.display())))?;
    Ok(BufWriter::new(file))
}

fn open(path: &Path) -> SimResult<BufReader<File>> {
    let file = File::open(path)
        .map_err(|e| SimError::io(format!("Failed to open {}: {e}", path.display())))?;
    Ok(BufReader::new(file))
}

fn write_line<W: Write>(writer: &mut W, line: &str) -> SimResult<()> {
    writeln!(writer, "{line}").map_err(|e| SimError::io(format!("Write failed: {e}")))
}

fn flush<W: Write>(writer: &mut W) -> SimResult<()> {
    writer
        .flush()
        .map_err(|e| SimError::io(format!("Flush failed: {e}")))
}

/// Write a trajectory as CSV.
///
/// # Errors
///
/// Returns `Io` if writing fails.
pub fn write_trajectory_csv<W: Write>(trajectory: &Trajectory, writer: &mut W) -> SimResult<()> {
    write_line(writer, &trajectory_header())?;
    let mut line = String::new();
    for sample in trajectory.samples() {
        line.clear();
        for (i, value) in sample.to_row().iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            line.push_str(&value.to_string());
        }
        write_line(writer, &line)?;
    }
    flush(writer)
}

/// Read a trajectory CSV.
///
/// Blank lines are skipped. A header-only table yields an empty trajectory.
///
/// # Errors
///
/// Returns `Parse` for a missing or wrong header, a row without exactly nine
/// fields or an unparsable number, and `Io` if reading fails.
pub fn read_trajectory_csv<R: BufRead>(reader: R) -> SimResult<Trajectory> {
    let mut lines = reader.lines().enumerate();
    let expected = trajectory_header();

    let header = match lines.next() {
        Some((_, line)) => line.map_err(|e| SimError::io(format!("Read failed: {e}")))?,
        None => return Err(SimError::parse(1, "missing header")),
    };
    if header.trim() != expected {
        return Err(SimError::parse(
            1,
            format!("expected header '{expected}', found '{}'", header.trim()),
        ));
    }

    let mut samples = Vec::new();
    for (index, line) in lines {
        let line_no = index + 1;
        let line = line.map_err(|e| SimError::io(format!("Read failed: {e}")))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut row = [0.0; 9];
        let mut count = 0;
        for field in line.split(',') {
            if count == row.len() {
                count += 1;
                break;
            }
            row[count] = field.trim().parse::<f64>().map_err(|e| {
                SimError::parse(
                    line_no,
                    format!("column '{}': {e}", Variable::ALL[count]),
                )
            })?;
            count += 1;
        }
        if count != row.len() {
            return Err(SimError::parse(
                line_no,
                format!("expected {} columns, found {}", row.len(), line.split(',').count()),
            ));
        }
        samples.push(TrajectorySample::from_row(row));
    }
    Ok(Trajectory::from_samples(samples))
}

/// Write a trajectory CSV file.
///
/// # Errors
///
/// Returns `Io` if the file cannot be created or written.
pub fn save_trajectory_csv(trajectory: &Trajectory, path: &Path) -> SimResult<()> {
    let mut writer = create(path)?;
    write_trajectory_csv(trajectory, &mut writer)
}

/// Load a trajectory CSV file.
///
/// # Errors
///
/// Returns `Io` if the file cannot be read and `Parse` for malformed content.
pub fn load_trajectory_csv(path: &Path) -> SimResult<Trajectory> {
    read_trajectory_csv(open(path)?)
}

/// Write the KS report table.
///
/// # Errors
///
/// Returns `Io` if writing fails.
pub fn write_divergence_csv<W: Write>(reports: &[DivergenceReport], writer: &mut W) -> SimResult<()> {
    write_line(writer, DIVERGENCE_HEADER)?;
    for r in reports {
        write_line(
            writer,
            &format!(
                "{},{},{},{}",
                r.variable,
                r.statistic,
                r.p_value,
                r.interpretation()
            ),
        )?;
    }
    flush(writer)
}

/// Write the KS report to a file.
///
/// # Errors
///
/// Returns `Io` if the file cannot be created or written.
pub fn save_divergence_csv(reports: &[DivergenceReport], path: &Path) -> SimResult<()> {
    let mut writer = create(path)?;
    write_divergence_csv(reports, &mut writer)
}

/// Write the entropy report table.
///
/// # Errors
///
/// Returns `Io` if writing fails.
pub fn write_entropy_csv<W: Write>(reports: &[EntropyReport], writer: &mut W) -> SimResult<()> {
    write_line(writer, ENTROPY_HEADER)?;
    for r in reports {
        write_line(
            writer,
            &format!("{},{},{}", r.variable, r.formatted(), r.interpretation()),
        )?;
    }
    flush(writer)
}

/// Write the entropy report to a file.
///
/// # Errors
///
/// Returns `Io` if the file cannot be created or written.
pub fn save_entropy_csv(reports: &[EntropyReport], path: &Path) -> SimResult<()> {
    let mut writer = create(path)?;
    write_entropy_csv(reports, &mut writer)
}

/// Save a trajectory in binary format (bincode).
///
/// # Errors
///
/// Returns `Io` or `Serialization` on failure.
pub fn save_binary(trajectory: &Trajectory, path: &Path) -> SimResult<()> {
    let mut writer = create(path)?;
    bincode::serialize_into(&mut writer, trajectory)
        .map_err(|e| SimError::serialization(format!("Binary serialization failed: {e}")))?;
    flush(&mut writer)
}

/// Load a trajectory saved with [`save_binary`].
///
/// # Errors
///
/// Returns `Io` or `Serialization` on failure.
pub fn load_binary(path: &Path) -> SimResult<Trajectory> {
    bincode::deserialize_from(open(path)?)
        .map_err(|e| SimError::serialization(format!("Binary deserialization failed: {e}")))
}

/// Ensure an output directory exists.
///
/// # Errors
///
/// Returns `Io` if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> SimResult<()> {
    std::fs::create_dir_all(path).map_err(|e: io::Error| {
        SimError::io(format!("Failed to create directory {}: {e}", path.display()))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::analysis::{DivergenceAnalyzer, EntropyAnalyzer};
    use crate::engine::state::PendulumState;
    use crate::scenarios::pendulum::PendulumParams;
    use tempfile::tempdir;

    fn sample_trajectory() -> Trajectory {
        let params = PendulumParams::default();
        Trajectory::from_samples(
            (0..5)
                .map(|i| {
                    let t = f64::from(i) * 0.25;
                    let state = PendulumState::new(std::f64::consts::PI - t, 0.1 * t, 1.57 + t, -t);
                    TrajectorySample::from_state(t, &state, &params)
                })
                .collect(),
        )
    }

    #[test]
    fn test_header() {
        assert_eq!(
            trajectory_header(),
            "t,x1,y1,x2,y2,theta1,theta2,omega1,omega2"
        );
        assert_eq!(
            entropy_file_name("original"),
            "original_entropy_scores_and_interpretations.csv"
        );
    }

    #[test]
    fn test_trajectory_csv_lossless() {
        let traj = sample_trajectory();
        let mut buf = Vec::new();
        write_trajectory_csv(&traj, &mut buf).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert_eq!(text.lines().count(), 6);
        assert!(text.starts_with("t,x1,y1,x2,y2,theta1,theta2,omega1,omega2\n0,"));

        let back = read_trajectory_csv(buf.as_slice()).unwrap();
        assert_eq!(back, traj);
        assert_eq!(back.fingerprint(), traj.fingerprint());
    }

    #[test]
    fn test_read_header_only() {
        let traj = read_trajectory_csv("t,x1,y1,x2,y2,theta1,theta2,omega1,omega2\n".as_bytes()).unwrap();
        assert!(traj.is_empty());
    }

    #[test]
    fn test_read_rejects_wrong_header() {
        let err = read_trajectory_csv("time,x1\n1,2\n".as_bytes()).unwrap_err();
        assert!(matches!(err, SimError::Parse { line: 1, .. }));
        let err = read_trajectory_csv("".as_bytes()).unwrap_err();
        assert!(matches!(err, SimError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_read_rejects_ragged_row() {
        let input = "t,x1,y1,x2,y2,theta1,theta2,omega1,omega2\n0,1,2,3,4,5,6,7,8\n0,1,2\n";
        let err = read_trajectory_csv(input.as_bytes()).unwrap_err();
        assert!(matches!(err, SimError::Parse { line: 3, .. }));

        let input = "t,x1,y1,x2,y2,theta1,theta2,omega1,omega2\n0,1,2,3,4,5,6,7,8,9\n";
        let err = read_trajectory_csv(input.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("found 10"));
    }

    #[test]
    fn test_read_rejects_bad_number() {
        let input = "t,x1,y1,x2,y2,theta1,theta2,omega1,omega2\n0,1,2,3,4,abc,6,7,8\n";
        let err = read_trajectory_csv(input.as_bytes()).unwrap_err();
        assert!(matches!(err, SimError::Parse { line: 2, .. }));
        assert!(err.to_string().contains("theta1"));
    }

    #[test]
    fn test_read_skips_blank_lines_and_crlf() {
        let input = "t,x1,y1,x2,y2,theta1,theta2,omega1,omega2\r\n0,1,2,3,4,5,6,7,8\r\n\r\n";
        let traj = read_trajectory_csv(input.as_bytes()).unwrap();
        assert_eq!(traj.len(), 1);
        assert!((traj.samples()[0].omega2 - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_divergence_csv_layout() {
        let traj = sample_trajectory();
        let reports = DivergenceAnalyzer::default().compare(&traj, &traj).unwrap();
        let mut buf = Vec::new();
        write_divergence_csv(&reports, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], DIVERGENCE_HEADER);
        assert_eq!(lines.len(), 10);
        assert_eq!(
            lines[1],
            "t,0,1,Distributions are similar (fail to reject null hypothesis)"
        );
    }

    #[test]
    fn test_entropy_csv_layout() {
        let reports = EntropyAnalyzer::default().analyze(&sample_trajectory()).unwrap();
        let mut buf = Vec::new();
        write_entropy_csv(&reports, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], ENTROPY_HEADER);
        assert_eq!(lines[1], "t,2.322,High entropy: Unpredictable");
        assert_eq!(lines.len(), 10);
    }

    #[test]
    fn test_files_roundtrip() {
        let dir = tempdir().unwrap();
        let traj = sample_trajectory();

        let csv = dir.path().join("double_pendulum_original.csv");
        save_trajectory_csv(&traj, &csv).unwrap();
        assert_eq!(load_trajectory_csv(&csv).unwrap(), traj);

        let bin = dir.path().join("original.bin");
        save_binary(&traj, &bin).unwrap();
        assert_eq!(load_binary(&bin).unwrap(), traj);
    }

    #[test]
    fn test_report_files_written() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("nested").join("data");
        ensure_dir(&out).unwrap();

        let traj = sample_trajectory();
        let ks = DivergenceAnalyzer::default().compare(&traj, &traj).unwrap();
        let ent = EntropyAnalyzer::default().analyze(&traj).unwrap();
        save_divergence_csv(&ks, &out.join("ks_test_results.csv")).unwrap();
        save_entropy_csv(&ent, &out.join(entropy_file_name("original"))).unwrap();

        let ks_text = std::fs::read_to_string(out.join("ks_test_results.csv")).unwrap();
        assert!(ks_text.starts_with(DIVERGENCE_HEADER));
        assert!(out.join("original_entropy_scores_and_interpretations.csv").exists());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = load_trajectory_csv(&dir.path().join("missing.csv")).unwrap_err();
        assert!(matches!(err, SimError::Io(_)));
        let err = load_binary(&dir.path().join("missing.bin")).unwrap_err();
        assert!(matches!(err, SimError::Io(_)));
    }

    #[test]
    fn test_corrupt_binary_is_serialization_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corrupt.bin");
        std::fs::write(&path, [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]).unwrap();
        let err = load_binary(&path).unwrap_err();
        assert!(matches!(err, SimError::Serialization(_)));
    }
}
