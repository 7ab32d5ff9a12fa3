//! Common-name suggestions for services deployed across environments.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Mapping from service identifiers to host prefixes under one base domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    pub base_domain: String,
    /// Environment whose hosts sit directly under `base_domain`.
    pub production_environment: String,
    pub service_prefixes: BTreeMap<String, String>,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            base_domain: "example.com".to_string(),
            production_environment: "PROD".to_string(),
            service_prefixes: BTreeMap::new(),
        }
    }
}

/// Suggests a common name for `service` in `environment`.
///
/// Unknown services use their lowercased name as the prefix. Production
/// hosts are `<prefix>.<base>`, everything else `<prefix>.<env>.<base>`.
pub fn suggest_domain_name(service: &str, environment: &str, config: &NamingConfig) -> String {
    let service = service.trim();
    let environment = environment.trim();
    let prefix = config
        .service_prefixes
        .get(service)
        .cloned()
        .unwrap_or_else(|| service.to_lowercase());

    if environment.eq_ignore_ascii_case(&config.production_environment) {
        format!("{prefix}.{}", config.base_domain)
    } else {
        format!("{prefix}.{}.{}", environment.to_lowercase(), config.base_domain)
    }
}
