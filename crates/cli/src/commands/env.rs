//! Environment Commands

use anyhow::Result;
use qakit_common::EnvironmentConfig;
use serde::Serialize;

use crate::output::{print_json, print_list, print_warning, OutputFormat, TableDisplay};

/// One resolved setting
#[derive(Serialize)]
pub struct SettingDisplay {
    pub setting: &'static str,
    pub value: String,
}

impl TableDisplay for SettingDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Setting", "Value"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.setting.to_string(), self.value.clone()]
    }
}

/// Settings in display order. Secrets are masked.
pub fn settings(config: &EnvironmentConfig) -> Vec<SettingDisplay> {
    let setting = |name, value: String| SettingDisplay { setting: name, value };
    vec![
        setting("environment", config.name.clone()),
        setting("base_url", config.base_url.clone()),
        setting("booking_api_url", config.booking_api_url.clone()),
        setting("objects_api_url", config.objects_api_url.clone()),
        setting(
            "objects_api_key",
            config.objects_api_key.as_ref().map_or("-".to_string(), |_| "****".to_string()),
        ),
        setting("graphql_url", config.graphql_url.clone()),
        setting("timeout_ms", config.timeout_ms.to_string()),
        setting("expect_timeout_ms", config.expect_timeout_ms.to_string()),
        setting("retries", config.retries.to_string()),
        setting("workers", config.workers.to_string()),
        setting("username", config.credentials.username.clone()),
        setting("password", config.credentials.masked_password()),
        setting("output_dir", config.reports.output_dir.display().to_string()),
        setting("html_report_dir", config.reports.html_report_dir.display().to_string()),
        setting("headless", config.headless.to_string()),
        setting("ci", config.is_ci.to_string()),
        setting("log_level", config.log_level.clone()),
    ]
}

pub fn execute(config: &EnvironmentConfig, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(config),
        _ => print_list(&settings(config), format),
    }

    for warning in config.validate() {
        print_warning(&warning.to_string());
    }
    Ok(())
}
