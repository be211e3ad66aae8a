//! Ping Command

use anyhow::Result;
use futures::future::join_all;
use qakit_client::{BookingService, GraphQLClient, ObjectsService, ServiceClient, TokenStore};
use qakit_common::EnvironmentConfig;
use serde::Serialize;
use std::time::Instant;

use crate::output::{print_error, print_list, OutputFormat, TableDisplay};

/// Health of one service
#[derive(Serialize)]
pub struct PingDisplay {
    pub service: &'static str,
    pub url: String,
    pub healthy: bool,
    pub status: Option<u16>,
    pub latency_ms: u64,
    pub error: Option<String>,
}

impl TableDisplay for PingDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Service", "URL", "Healthy", "Status", "Latency", "Error"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.service.to_string(),
            self.url.clone(),
            if self.healthy { "✅".to_string() } else { "❌".to_string() },
            self.status.map_or("-".to_string(), |s| s.to_string()),
            format!("{} ms", self.latency_ms),
            self.error.clone().unwrap_or_default(),
        ]
    }
}

/// Health-check one service
pub async fn ping(service: &dyn ServiceClient) -> PingDisplay {
    let start = Instant::now();
    let result = service.health().await;
    let latency_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(response) => PingDisplay {
            service: service.name(),
            url: service.base_url().to_string(),
            healthy: response.is_success(),
            status: Some(response.status_code()),
            latency_ms,
            error: None,
        },
        Err(e) => PingDisplay {
            service: service.name(),
            url: service.base_url().to_string(),
            healthy: false,
            status: None,
            latency_ms,
            error: Some(e.to_string()),
        },
    }
}

pub async fn execute(config: &EnvironmentConfig, format: OutputFormat) -> Result<()> {
    let services: Vec<Box<dyn ServiceClient>> = vec![
        Box::new(BookingService::from_env(config, TokenStore::new())?),
        Box::new(ObjectsService::from_env(config)?),
        Box::new(GraphQLClient::from_env(config)?),
    ];

    let results = join_all(services.iter().map(|service| ping(service.as_ref()))).await;
    print_list(&results, format);

    let down = results.iter().filter(|r| !r.healthy).count();
    if down > 0 {
        print_error(&format!("{} of {} service(s) unhealthy", down, results.len()));
        std::process::exit(1);
    }
    Ok(())
}
