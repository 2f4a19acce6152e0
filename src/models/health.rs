use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// State of one backend dependency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub working: bool,
    pub message: Option<String>,
}

/// Response of `GET <prefix>`: service name to status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Health(pub BTreeMap<String, Service>);

impl Health {
    /// True when every reported service works.
    pub fn all_good(&self) -> bool {
        self.0.values().all(|service| service.working)
    }

    pub fn services(&self) -> impl Iterator<Item = (&str, &Service)> {
        self.0.iter().map(|(name, service)| (name.as_str(), service))
    }

    /// Human-readable summary, one line per service.
    pub fn report(&self) -> String {
        let mut report = if self.all_good() {
            "Status: API is up!\n".to_string()
        } else {
            "Status: API issues detected!\n".to_string()
        };

        for (name, service) in self.services() {
            let detail = if service.working {
                "No issues detected"
            } else {
                service.message.as_deref().unwrap_or("Not working")
            };
            report.push_str(&format!("{}: {}\n", name, detail));
        }

        report
    }
}
