//! Parsed header rules driving classification and enrichment.

use axum::http::{HeaderName, HeaderValue};

use crate::config::validation::ValidationError;
use crate::config::{ConfigError, HeaderConfig};
use crate::http::headers::HeaderList;

/// Header names and values, parsed once at startup.
#[derive(Debug, Clone)]
pub struct HeaderRules {
    pub source_header: HeaderName,
    pub connector_source: HeaderValue,
    pub correlation_header: HeaderName,
    /// Correlation header first, then any extra stripped headers.
    pub stripped: Vec<HeaderName>,
    pub marker_header: HeaderName,
    pub marker_value: HeaderValue,
}

impl HeaderRules {
    pub fn from_config(config: &HeaderConfig) -> Result<Self, ConfigError> {
        let mut errors = Vec::new();
        let mut name = |field: &str, raw: &str| match HeaderName::from_bytes(raw.as_bytes()) {
            Ok(name) => Some(name),
            Err(_) => {
                errors.push(ValidationError::new(field, format!("'{}' is not a valid header name", raw)));
                None
            }
        };

        let source_header = name("headers.source_header", &config.source_header);
        let correlation_header = name("headers.correlation_header", &config.correlation_header);
        let marker_header = name("headers.marker_header", &config.marker_header);
        let extra: Vec<_> = config
            .extra_stripped
            .iter()
            .filter_map(|raw| name("headers.extra_stripped", raw))
            .collect();

        let connector_source = HeaderValue::from_str(&config.connector_source).ok();
        if connector_source.is_none() {
            errors.push(ValidationError::new("headers.connector_source", "not a valid header value"));
        }
        let marker_value = HeaderValue::from_str(&config.marker_value).ok();
        if marker_value.is_none() {
            errors.push(ValidationError::new("headers.marker_value", "not a valid header value"));
        }

        match (source_header, connector_source, correlation_header, marker_header, marker_value) {
            (Some(source_header), Some(connector_source), Some(correlation_header), Some(marker_header), Some(marker_value))
                if errors.is_empty() =>
            {
                let mut stripped = vec![correlation_header.clone()];
                for name in extra {
                    if !stripped.contains(&name) {
                        stripped.push(name);
                    }
                }
                Ok(Self {
                    source_header,
                    connector_source,
                    correlation_header,
                    stripped,
                    marker_header,
                    marker_value,
                })
            }
            _ => Err(ConfigError::Validation(errors)),
        }
    }

    /// Whether the request is tagged as coming from the connector service.
    ///
    /// Classification only needs one discriminator value, so the last
    /// occurrence wins.
    pub fn is_connector(&self, headers: &HeaderList) -> bool {
        headers
            .get_all(&self.source_header)
            .last()
            .is_some_and(|value| *value == self.connector_source)
    }
}

impl Default for HeaderRules {
    fn default() -> Self {
        Self {
            source_header: HeaderName::from_static("x-source"),
            connector_source: HeaderValue::from_static("connector-service"),
            correlation_header: HeaderName::from_static("x-request-id"),
            stripped: vec![HeaderName::from_static("x-request-id")],
            marker_header: HeaderName::from_static("x-state"),
            marker_value: HeaderValue::from_static("response"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderList {
        pairs
            .iter()
            .map(|&(k, v)| (HeaderName::from_static(k), HeaderValue::from_static(v)))
            .collect()
    }

    #[test]
    fn defaults_match_config_defaults() {
        let rules = HeaderRules::from_config(&HeaderConfig::default()).unwrap();
        let defaults = HeaderRules::default();
        assert_eq!(rules.source_header, defaults.source_header);
        assert_eq!(rules.stripped, defaults.stripped);
        assert_eq!(rules.marker_value, defaults.marker_value);
    }

    #[test]
    fn classification_uses_last_value() {
        let rules = HeaderRules::default();
        assert!(rules.is_connector(&headers(&[("x-source", "connector-service")])));
        assert!(rules.is_connector(&headers(&[("x-source", "other"), ("x-source", "connector-service")])));
        assert!(!rules.is_connector(&headers(&[("x-source", "connector-service"), ("x-source", "other")])));
        assert!(!rules.is_connector(&headers(&[("x-source", "Connector-Service")])));
        assert!(!rules.is_connector(&HeaderList::new()));
    }

    #[test]
    fn extra_stripped_are_deduplicated() {
        let config = HeaderConfig {
            extra_stripped: vec!["x-trace-token".into(), "x-request-id".into()],
            ..HeaderConfig::default()
        };
        let rules = HeaderRules::from_config(&config).unwrap();
        let names: Vec<_> = rules.stripped.iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["x-request-id", "x-trace-token"]);
    }

    #[test]
    fn invalid_names_are_rejected() {
        let config = HeaderConfig {
            marker_header: "bad header".into(),
            ..HeaderConfig::default()
        };
        assert!(matches!(
            HeaderRules::from_config(&config),
            Err(ConfigError::Validation(errors)) if errors.len() == 1
        ));
    }
}
