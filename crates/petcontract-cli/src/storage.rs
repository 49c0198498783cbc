//! Run report storage under the output directory
//!
//! Every `petcontract run` is saved regardless of `--output` mode.
//! Layout: `{output_dir}/report.json` (latest run) plus
//! `{output_dir}/runs/{host_port}_{timestamp}_{run_id}/`.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use petcontract_core::{Config, SuiteReport, Verdict};

/// Everything needed to persist one run.
pub struct ReportData<'a> {
    pub config: &'a Config,
    pub report: &'a SuiteReport,
    pub verdict: &'a Verdict,
}

/// Save a run into `output_dir`. Returns the per-run directory.
pub fn save_report(output_dir: &Path, data: &ReportData) -> Result<PathBuf, std::io::Error> {
    let run_dir = output_dir
        .join("runs")
        .join(build_dir_name(&data.config.base_url, &data.report.run_id));
    std::fs::create_dir_all(&run_dir)?;

    // config.toml: snapshot of the config used
    let config_toml =
        toml::to_string_pretty(data.config).map_err(|e| std::io::Error::other(e.to_string()))?;
    std::fs::write(run_dir.join("config.toml"), config_toml)?;

    let report_json = serde_json::to_string_pretty(data.report)
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    std::fs::write(run_dir.join("report.json"), &report_json)?;
    std::fs::write(output_dir.join("report.json"), &report_json)?;

    // summary.json: verdict + totals
    let summary = serde_json::json!({
        "verdict": {
            "status": data.verdict.status.to_string(),
            "exit_code": data.verdict.exit_code,
            "reason": data.verdict.reason,
        },
        "stats": {
            "total": data.report.total,
            "passed": data.report.passed,
            "failed": data.report.failed,
        },
        "meta": {
            "run_id": data.report.run_id,
            "timestamp": timestamp_iso(),
            "duration_secs": data.report.duration_secs,
            "base_url": data.report.base_url,
        },
    });
    std::fs::write(
        run_dir.join("summary.json"),
        serde_json::to_string_pretty(&summary).unwrap_or_default(),
    )?;

    Ok(run_dir)
}

/// `{host_port}_{timestamp}_{run_id}` e.g. `localhost_5000_20261019T093000_3fa2...`
fn build_dir_name(base_url: &str, run_id: &str) -> String {
    let host_port = extract_host_port(base_url);
    let ts = timestamp_compact();
    format!("{host_port}_{ts}_{run_id}")
}

/// `"http://localhost:5000/path"` → `"localhost_5000"`
fn extract_host_port(url: &str) -> String {
    url.split("://")
        .nth(1)
        .unwrap_or(url)
        .split('/')
        .next()
        .unwrap_or("unknown")
        .replace(':', "_")
}

fn timestamp_compact() -> String {
    let (y, mo, d, h, mi, s) = utc_now();
    format!("{y:04}{mo:02}{d:02}T{h:02}{mi:02}{s:02}")
}

fn timestamp_iso() -> String {
    let (y, mo, d, h, mi, s) = utc_now();
    format!("{y:04}-{mo:02}-{d:02}T{h:02}:{mi:02}:{s:02}Z")
}

/// Current UTC date-time from the epoch.
fn utc_now() -> (i32, u32, u32, u32, u32, u32) {
    let epoch_secs = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let days = i64::try_from(epoch_secs / 86_400).unwrap_or_default();
    let tod = u32::try_from(epoch_secs % 86_400).unwrap_or_default();
    let (y, m, d) = civil_from_days(days);
    (y, m, d, tod / 3600, (tod % 3600) / 60, tod % 60)
}

/// Epoch days → (year, month, day), after Howard Hinnant's `civil_from_days`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn civil_from_days(days: i64) -> (i32, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = (z - era * 146_097) as u32;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = i64::from(yoe) + era * 400 + i64::from(m <= 2);
    (y as i32, m, d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use petcontract_core::{CaseOutcome, VerdictPolicy};

    #[test]
    fn host_port_from_base_url() {
        assert_eq!(extract_host_port("http://localhost:5000"), "localhost_5000");
        assert_eq!(extract_host_port("https://petstore.test"), "petstore.test");
        assert_eq!(extract_host_port("http://10.0.0.1:3000/v1"), "10.0.0.1_3000");
    }

    #[test]
    fn civil_dates() {
        assert_eq!(civil_from_days(0), (1970, 1, 1));
        assert_eq!(civil_from_days(20_489), (2026, 2, 5));
        assert_eq!(civil_from_days(-1), (1969, 12, 31));
    }

    #[test]
    fn dir_name_ends_with_run_id() {
        let name = build_dir_name("http://localhost:5000", "00ff00ff00ff00ff");
        assert!(name.starts_with("localhost_5000_"));
        assert!(name.ends_with("_00ff00ff00ff00ff"));
    }

    #[test]
    fn save_writes_latest_and_per_run_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        let report = SuiteReport::new(
            "0123456789abcdef",
            &config.base_url,
            vec![CaseOutcome::new("pet_schema[1]", "pet_schema", vec![])],
            0.25,
        );
        let verdict = VerdictPolicy::default().verdict(&report.cases);

        let run_dir = save_report(
            dir.path(),
            &ReportData {
                config: &config,
                report: &report,
                verdict: &verdict,
            },
        )
        .unwrap();

        assert!(run_dir.starts_with(dir.path().join("runs")));
        for file in ["config.toml", "report.json", "summary.json"] {
            assert!(run_dir.join(file).exists(), "{file}");
        }

        let latest: SuiteReport =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("report.json")).unwrap())
                .unwrap();
        assert_eq!(latest.run_id, "0123456789abcdef");
        assert_eq!(latest.passed, 1);

        let summary: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(run_dir.join("summary.json")).unwrap())
                .unwrap();
        assert_eq!(summary["verdict"]["status"], "PASS");
    }
}
