//! Form validation.
//!
//! Checks that every required field is filled in before anything touches the
//! network.

use std::path::PathBuf;

use crate::config::{ConnectionConfig, RemoteConfig};
use crate::db::DatabaseBackend;
use crate::error::{ChatError, Result};

/// Raw remote-connection fields as typed into the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteFields {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl RemoteFields {
    /// Required fields in the order they are checked.
    fn required(&self) -> [(&'static str, &str); 4] {
        [
            ("host", &self.host),
            ("user", &self.user),
            ("password", &self.password),
            ("database", &self.database),
        ]
    }
}

/// The full set of form inputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormInput {
    pub api_key: String,
    pub backend: DatabaseBackend,
    pub sqlite_path: PathBuf,
    pub remote: RemoteFields,
}

/// Validates the form and returns the connection configuration it describes.
///
/// Fails with `Validation` naming the first blank field: the API key, then
/// (for the remote backend) host, user, password and database.
pub fn validate_inputs(input: &FormInput) -> Result<ConnectionConfig> {
    if input.api_key.trim().is_empty() {
        return Err(ChatError::validation("Please enter your API key"));
    }

    match input.backend {
        DatabaseBackend::Sqlite => Ok(ConnectionConfig::embedded(input.sqlite_path.clone())),
        DatabaseBackend::MySql => {
            let remote = &input.remote;
            if let Some((field, _)) = remote
                .required()
                .into_iter()
                .find(|(_, value)| value.trim().is_empty())
            {
                return Err(ChatError::validation(format!("Please provide MySQL {field}")));
            }

            Ok(ConnectionConfig::Remote(RemoteConfig {
                host: remote.host.trim().to_string(),
                user: remote.user.trim().to_string(),
                password: remote.password.clone(),
                database: remote.database.trim().to_string(),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote_input() -> FormInput {
        FormInput {
            api_key: "gsk_test".to_string(),
            backend: DatabaseBackend::MySql,
            sqlite_path: PathBuf::from("student.db"),
            remote: RemoteFields {
                host: "localhost".to_string(),
                user: "root".to_string(),
                password: "secret".to_string(),
                database: "school".to_string(),
            },
        }
    }

    #[test]
    fn test_blank_api_key_is_checked_first() {
        let mut input = remote_input();
        input.api_key = "   ".to_string();
        input.remote.host.clear();

        let err = validate_inputs(&input).unwrap_err();
        assert_eq!(err.to_string(), "Please enter your API key");
    }

    #[test]
    fn test_each_missing_remote_field_is_named() {
        for field in ["host", "user", "password", "database"] {
            let mut input = remote_input();
            match field {
                "host" => input.remote.host.clear(),
                "user" => input.remote.user = " ".to_string(),
                "password" => input.remote.password.clear(),
                _ => input.remote.database.clear(),
            }

            let err = validate_inputs(&input).unwrap_err();
            assert!(matches!(err, ChatError::Validation(_)));
            assert_eq!(err.to_string(), format!("Please provide MySQL {field}"));
        }
    }

    #[test]
    fn test_first_missing_field_wins() {
        let mut input = remote_input();
        input.remote.password.clear();
        input.remote.user.clear();

        let err = validate_inputs(&input).unwrap_err();
        assert_eq!(err.to_string(), "Please provide MySQL user");
    }

    #[test]
    fn test_complete_remote_input_succeeds() {
        let config = validate_inputs(&remote_input()).unwrap();
        assert_eq!(config.backend(), DatabaseBackend::MySql);
        assert_eq!(config.display_string(), "mysql: root@localhost/school");
    }

    #[test]
    fn test_sqlite_ignores_remote_fields() {
        let input = FormInput {
            api_key: "gsk_test".to_string(),
            ..Default::default()
        };
        let config = validate_inputs(&input).unwrap();
        assert_eq!(config, ConnectionConfig::embedded(PathBuf::new()));
    }
}
