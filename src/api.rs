//! Managed backend REST client (channel feed and broken stream reports)

use std::time::Duration;
use tracing::debug;

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::playback::{BrokenStreamReport, PendingReport, ReportError, ReportSink};

#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    api_key: String,
    user_agent: String,
    timeout: Duration,
}

impl BackendClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            user_agent: "LiveNewsPlayer/0.1".to_string(),
            timeout: Duration::from_secs(15),
        }
    }

    pub fn from_config(config: &AppConfig) -> Option<Self> {
        if !config.has_backend() {
            return None;
        }
        Some(
            Self::new(&config.backend_url, &config.backend_key)
                .with_user_agent(&config.user_agent)
                .with_timeout(Duration::from_secs(config.request_timeout_secs)),
        )
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn table_url(&self, table: &str, query: &str) -> String {
        if query.is_empty() {
            format!("{}/rest/v1/{}", self.base_url, table)
        } else {
            format!("{}/rest/v1/{}?{}", self.base_url, table, query)
        }
    }

    fn agent(&self) -> ureq::Agent {
        ureq::Agent::config_builder()
            .timeout_global(Some(self.timeout))
            .timeout_connect(Some(Duration::from_secs(10)))
            .http_status_as_error(false)
            .build()
            .new_agent()
    }

    /// Raw rows of the `live_channels` table, ordered by name
    pub fn fetch_channel_rows(&self) -> Result<Vec<serde_json::Value>> {
        let url = self.table_url("live_channels", "select=*&order=name");
        debug!("GET {}", url);

        let mut response = self
            .agent()
            .get(&url)
            .header("User-Agent", &self.user_agent)
            .header("apikey", &self.api_key)
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .header("Accept", "application/json")
            .call()?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(Error::Status(status));
        }

        let body = response.body_mut().read_to_string()?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Inserts one row into `reported_links`. No retry.
    pub fn report_broken_link(&self, report: &BrokenStreamReport) -> Result<()> {
        let url = self.table_url("reported_links", "");
        debug!("POST {} for {}", url, report.channel_id);

        let response = self
            .agent()
            .post(&url)
            .header("User-Agent", &self.user_agent)
            .header("apikey", &self.api_key)
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .header("Prefer", "return=minimal")
            .send_json(report)?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(Error::Status(status));
        }
        Ok(())
    }
}

/// Submits reports to the backend from a worker thread
pub struct HttpReporter {
    client: BackendClient,
}

impl HttpReporter {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

impl ReportSink for HttpReporter {
    fn submit(&self, report: BrokenStreamReport) -> PendingReport {
        let client = self.client.clone();
        PendingReport::spawn(move || {
            client.report_broken_link(&report).map_err(|e| match e {
                Error::Status(code) => ReportError::Rejected(format!("HTTP {}", code)),
                other => ReportError::Transport(other.to_string()),
            })
        })
    }
}

/// Used when no backend is configured: every report fails visibly
pub struct UnconfiguredReporter;

impl ReportSink for UnconfiguredReporter {
    fn submit(&self, _report: BrokenStreamReport) -> PendingReport {
        PendingReport::ready(Err(ReportError::Transport(
            "no backend configured".to_string(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_urls() {
        let client = BackendClient::new("https://project.example.co/", "key");
        assert_eq!(
            client.table_url("live_channels", "select=*&order=name"),
            "https://project.example.co/rest/v1/live_channels?select=*&order=name"
        );
        assert_eq!(
            client.table_url("reported_links", ""),
            "https://project.example.co/rest/v1/reported_links"
        );
    }

    #[test]
    fn test_from_config_requires_backend() {
        let mut config = AppConfig::default();
        assert!(BackendClient::from_config(&config).is_none());

        config.backend_url = "https://b".to_string();
        config.request_timeout_secs = 3;
        let client = BackendClient::from_config(&config).unwrap();
        assert_eq!(client.timeout, Duration::from_secs(3));
        assert_eq!(client.user_agent, config.user_agent);
    }

    #[test]
    fn test_unconfigured_reporter_fails() {
        let report = BrokenStreamReport {
            channel_id: "c1".into(),
            channel_name: "News One".into(),
            reported_at: chrono::Utc::now(),
        };
        let pending = UnconfiguredReporter.submit(report);
        assert!(matches!(pending.try_take(), Some(Err(ReportError::Transport(_)))));
    }
}
