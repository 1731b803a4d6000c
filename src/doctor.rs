//! Offline environment checks: the same filesystem liveness probing the
//! server does at startup, runnable without binding a port.

use crate::config::DashConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warning,
    Fail,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DoctorCheck {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DoctorReport {
    pub checks: Vec<DoctorCheck>,
    pub overall_health: CheckStatus,
}

pub struct DashDoctor;

impl DashDoctor {
    pub fn new() -> Self {
        Self
    }

    pub fn run(&self, config: &DashConfig) -> DoctorReport {
        let mut checks = Vec::new();

        checks.push(self.check_dir_writable("Data Directory", &config.data_dir));
        checks.push(self.check_data_file("Server Inventory", &config.servers_file()));
        checks.push(self.check_data_file("Command Catalog", &config.commands_file()));
        checks.push(self.check_stale_backup(&config.commands_file()));
        checks.push(self.check_dir_writable("Export Directory", &config.export_dir));

        let overall_health = if checks.iter().any(|c| matches!(c.status, CheckStatus::Fail)) {
            CheckStatus::Fail
        } else if checks
            .iter()
            .any(|c| matches!(c.status, CheckStatus::Warning))
        {
            CheckStatus::Warning
        } else {
            CheckStatus::Pass
        };

        DoctorReport {
            checks,
            overall_health,
        }
    }

    fn check_dir_writable(&self, name: &str, dir: &Path) -> DoctorCheck {
        if !dir.exists() {
            return DoctorCheck {
                name: name.to_string(),
                status: CheckStatus::Warning,
                message: format!("{} does not exist yet (created on startup)", dir.display()),
            };
        }

        let probe = dir.join(".middash-doctor");
        match std::fs::write(&probe, b"ok") {
            Ok(_) => {
                let _ = std::fs::remove_file(&probe);
                DoctorCheck {
                    name: name.to_string(),
                    status: CheckStatus::Pass,
                    message: format!("{} is writable", dir.display()),
                }
            }
            Err(e) => DoctorCheck {
                name: name.to_string(),
                status: CheckStatus::Fail,
                message: format!("cannot write to {}: {}", dir.display(), e),
            },
        }
    }

    fn check_data_file(&self, name: &str, path: &Path) -> DoctorCheck {
        if !path.exists() {
            return DoctorCheck {
                name: name.to_string(),
                status: CheckStatus::Warning,
                message: format!("{} not created yet", path.display()),
            };
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                return DoctorCheck {
                    name: name.to_string(),
                    status: CheckStatus::Fail,
                    message: format!("cannot read {}: {}", path.display(), e),
                }
            }
        };

        match serde_json::from_str::<Vec<serde_json::Value>>(&content) {
            Ok(items) => DoctorCheck {
                name: name.to_string(),
                status: CheckStatus::Pass,
                message: format!("{} records in {}", items.len(), path.display()),
            },
            Err(e) => DoctorCheck {
                name: name.to_string(),
                status: CheckStatus::Fail,
                message: format!("{} is not a valid JSON array: {}", path.display(), e),
            },
        }
    }

    /// A leftover `.backup` sibling means a commit was interrupted or its
    /// verification failed.
    fn check_stale_backup(&self, path: &Path) -> DoctorCheck {
        let mut name = path.as_os_str().to_owned();
        name.push(".backup");
        let backup = PathBuf::from(name);

        if backup.exists() {
            DoctorCheck {
                name: "Backup Leftovers".to_string(),
                status: CheckStatus::Warning,
                message: format!(
                    "{} exists; last write may not have completed cleanly",
                    backup.display()
                ),
            }
        } else {
            DoctorCheck {
                name: "Backup Leftovers".to_string(),
                status: CheckStatus::Pass,
                message: "no leftover backup file".to_string(),
            }
        }
    }
}
