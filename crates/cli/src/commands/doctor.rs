use std::path::{Path, PathBuf};

use schemadoc_core::catalog::{Catalog, Connector};
use schemadoc_core::config::{AppConfig, ConfigOverrides};
use schemadoc_db::PgConnector;
use serde::Serialize;

use crate::commands::load_config;

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

pub fn run(config_path: Option<PathBuf>, json_output: bool) -> String {
    let report = build_report(config_path);

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report(config_path: Option<PathBuf>) -> DoctorReport {
    let mut checks = Vec::new();

    match load_config(config_path, ConfigOverrides::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_registry(&config));
            checks.push(check_output_dir(&config));
            checks.push(check_database_connectivity(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["database_registry", "output_dir_writable", "database_connectivity"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_registry(config: &AppConfig) -> DoctorCheck {
    match config.registry() {
        Ok(registry) if registry.is_empty() => DoctorCheck {
            name: "database_registry",
            status: CheckStatus::Pass,
            details: "no named databases; database.url is used".to_string(),
        },
        Ok(registry) => {
            let names: Vec<&str> = registry.names().collect();
            DoctorCheck {
                name: "database_registry",
                status: CheckStatus::Pass,
                details: format!("{} named database(s): {}", names.len(), names.join(", ")),
            }
        }
        Err(error) => DoctorCheck {
            name: "database_registry",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_output_dir(config: &AppConfig) -> DoctorCheck {
    let dir = &config.extraction.output_dir;
    let Some(existing) = nearest_existing_dir(dir) else {
        return DoctorCheck {
            name: "output_dir_writable",
            status: CheckStatus::Fail,
            details: format!("no existing directory above `{}`", dir.display()),
        };
    };

    match tempfile::tempfile_in(&existing) {
        Ok(_) if existing == *dir => DoctorCheck {
            name: "output_dir_writable",
            status: CheckStatus::Pass,
            details: format!("`{}` is writable", dir.display()),
        },
        Ok(_) => DoctorCheck {
            name: "output_dir_writable",
            status: CheckStatus::Pass,
            details: format!(
                "`{}` does not exist yet; `{}` is writable",
                dir.display(),
                existing.display()
            ),
        },
        Err(error) => DoctorCheck {
            name: "output_dir_writable",
            status: CheckStatus::Fail,
            details: format!("cannot write to `{}`: {error}", existing.display()),
        },
    }
}

/// `dir` itself when present, otherwise its closest existing ancestor.
fn nearest_existing_dir(dir: &Path) -> Option<PathBuf> {
    dir.ancestors()
        .map(|ancestor| if ancestor.as_os_str().is_empty() { Path::new(".") } else { ancestor })
        .find(|ancestor| ancestor.is_dir())
        .map(Path::to_path_buf)
}

fn check_database_connectivity(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "database_connectivity",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let connector = PgConnector::new(config.database.url.clone())
        .with_timeout_secs(config.database.connect_timeout_secs);
    let result = runtime.block_on(async {
        let mut catalog = connector
            .connect()
            .await
            .map_err(|error| format!("failed to connect to database: {error}"))?;
        let database = catalog.current_database().await.map_err(|error| error.to_string());
        if let Err(error) = catalog.close().await {
            tracing::warn!(
                event_name = "doctor.disconnect.failed",
                error = %error,
                "error while releasing connection"
            );
        }
        database
    });

    match result {
        Ok(database) => DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Pass,
            details: format!("connected to `{database}` via `{}`", connector.target()),
        },
        Err(error) => {
            DoctorCheck { name: "database_connectivity", status: CheckStatus::Fail, details: error }
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
