use santa_core::config::{AppConfig, LoadOptions};
use serde::Serialize;

use super::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => build_report(Ok(&config)),
        Err(error) => build_report(Err(error.to_string())),
    };
    let exit_code = if report.overall_status == CheckStatus::Fail { 1 } else { 0 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report(config: Result<&AppConfig, String>) -> DoctorReport {
    let mut checks = Vec::new();

    match config {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_signalwire(config));
            checks.push(check_catalog(config));
            checks.push(check_web_dir(config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error,
            });
            for name in ["signalwire_readiness", "catalog_mode", "web_assets"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_signalwire(config: &AppConfig) -> DoctorCheck {
    if !config.signalwire.is_configured() {
        return DoctorCheck {
            name: "signalwire_readiness",
            status: CheckStatus::Skipped,
            details: "SignalWire credentials not configured; calls will not be routed".to_string(),
        };
    }

    match &config.server.public_url {
        Some(public_url) => DoctorCheck {
            name: "signalwire_readiness",
            status: CheckStatus::Pass,
            details: format!(
                "handler `{}` will route to {public_url}/santa on {}",
                config.signalwire.agent_name,
                config.signalwire.host().unwrap_or_default()
            ),
        },
        None => DoctorCheck {
            name: "signalwire_readiness",
            status: CheckStatus::Fail,
            details: "SWML_PROXY_URL_BASE or APP_URL must be set for handler registration"
                .to_string(),
        },
    }
}

fn check_catalog(config: &AppConfig) -> DoctorCheck {
    let details = if config.gifts.has_api_key() {
        format!(
            "live product search via {} (${} to ${})",
            config.gifts.rapidapi_host, config.gifts.min_price, config.gifts.max_price
        )
    } else {
        "RAPIDAPI_KEY not set; built-in gift suggestions will be used".to_string()
    };
    DoctorCheck { name: "catalog_mode", status: CheckStatus::Pass, details }
}

fn check_web_dir(config: &AppConfig) -> DoctorCheck {
    let web_dir = &config.server.web_dir;
    if web_dir.join("index.html").is_file() {
        DoctorCheck {
            name: "web_assets",
            status: CheckStatus::Pass,
            details: format!("serving static files from `{}`", web_dir.display()),
        }
    } else {
        DoctorCheck {
            name: "web_assets",
            status: CheckStatus::Skipped,
            details: format!("`{}` has no index.html; web client disabled", web_dir.display()),
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use santa_core::config::AppConfig;

    use super::{build_report, render_human, CheckStatus};

    fn status_of(report: &super::DoctorReport, name: &str) -> Option<CheckStatus> {
        report.checks.iter().find(|check| check.name == name).map(|check| check.status)
    }

    #[test]
    fn default_config_passes_with_skipped_integrations() {
        let report = build_report(Ok(&AppConfig::default()));

        assert_eq!(report.overall_status, CheckStatus::Pass);
        assert_eq!(status_of(&report, "signalwire_readiness"), Some(CheckStatus::Skipped));
        assert_eq!(status_of(&report, "catalog_mode"), Some(CheckStatus::Pass));
    }

    #[test]
    fn signalwire_without_public_url_fails() {
        let mut config = AppConfig::default();
        config.signalwire.space_name = "north-pole".to_string();
        config.signalwire.project_id = "project".to_string();
        config.signalwire.token = "token".to_string().into();

        let report = build_report(Ok(&config));

        assert_eq!(report.overall_status, CheckStatus::Fail);
        assert_eq!(status_of(&report, "signalwire_readiness"), Some(CheckStatus::Fail));
    }

    #[test]
    fn web_dir_with_index_passes() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("index.html"), "<h1>Santa</h1>").expect("write");
        let mut config = AppConfig::default();
        config.server.web_dir = dir.path().to_path_buf();

        let report = build_report(Ok(&config));

        assert_eq!(status_of(&report, "web_assets"), Some(CheckStatus::Pass));
    }

    #[test]
    fn config_failure_skips_remaining_checks() {
        let report = build_report(Err("server.port must be greater than zero".to_string()));
        let rendered = render_human(&report);

        assert_eq!(report.overall_status, CheckStatus::Fail);
        assert!(rendered.contains("- [fail] config_validation: server.port"));
        assert!(rendered.contains("- [skip] catalog_mode"));
    }
}
