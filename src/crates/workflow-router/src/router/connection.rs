use crate::{Result, RouterError};
use std::collections::HashMap;

/// Extract the project endpoint from a connection string.
///
/// Accepts a direct URL (`https://...`) or `key=value;` pairs carrying
/// `endpoint`/`Endpoint`, or `HostName` (which becomes `https://{HostName}`).
pub fn parse_connection_string(connection_string: &str) -> Result<String> {
    let trimmed = connection_string.trim();
    if trimmed.starts_with("http") {
        return Ok(trimmed.to_string());
    }

    let parts: HashMap<&str, &str> = trimmed
        .split(';')
        .filter_map(|part| part.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim()))
        .collect();

    let endpoint = parts
        .get("endpoint")
        .or_else(|| parts.get("Endpoint"))
        .filter(|e| !e.is_empty())
        .map(|e| e.to_string())
        .or_else(|| {
            parts
                .get("HostName")
                .filter(|h| !h.is_empty())
                .map(|host| format!("https://{}", host))
        });

    endpoint.ok_or_else(|| {
        RouterError::Configuration(
            "Invalid PROJECT_CONNECTION_STRING format - no endpoint found".to_string(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_url() {
        assert_eq!(
            parse_connection_string("https://acct.services.ai.azure.com/api/projects/p1").unwrap(),
            "https://acct.services.ai.azure.com/api/projects/p1"
        );
    }

    #[test]
    fn test_key_value_endpoint() {
        let endpoint =
            parse_connection_string("Endpoint = https://acct.example.test ; Project=p1;").unwrap();
        assert_eq!(endpoint, "https://acct.example.test");

        let lower = parse_connection_string("endpoint=https://a.test/x=y").unwrap();
        assert_eq!(lower, "https://a.test/x=y");
    }

    #[test]
    fn test_hostname_fallback() {
        let endpoint =
            parse_connection_string("HostName=eastus.api.azureml.ms;SubscriptionId=s;ProjectName=p")
                .unwrap();
        assert_eq!(endpoint, "https://eastus.api.azureml.ms");
    }

    #[test]
    fn test_missing_endpoint() {
        for bad in ["", "Project=p1;Region=eastus", "garbage"] {
            assert!(matches!(
                parse_connection_string(bad),
                Err(RouterError::Configuration(_))
            ));
        }
    }
}
