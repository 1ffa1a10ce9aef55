// SPDX-License-Identifier: MIT

//! Secret providers, grounded in
//! `original_source/.../config.py`'s `EnvSecretProvider`/`FileSecretProvider`.
//! A Vault-backed provider is an explicit extension point, not implemented
//! here (see `DESIGN.md`).

use crate::error::ConfigError;
use std::path::PathBuf;

/// A pluggable source of secret values, looked up by an opaque path
/// (conventionally `aeon/<group>/<name>/<key>`).
pub trait SecretProvider: Send + Sync {
    fn get_secret(&self, path: &str) -> Result<String, ConfigError>;
    fn set_secret(&self, path: &str, value: &str) -> Result<(), ConfigError>;
}

/// Reads/writes secrets via process environment variables.
#[derive(Debug, Default, Clone)]
pub struct EnvSecretProvider;

impl SecretProvider for EnvSecretProvider {
    fn get_secret(&self, path: &str) -> Result<String, ConfigError> {
        std::env::var(path).map_err(|_| ConfigError::SecretNotFound { path: path.to_string() })
    }

    fn set_secret(&self, path: &str, value: &str) -> Result<(), ConfigError> {
        std::env::set_var(path, value);
        Ok(())
    }
}

/// Reads/writes secrets as files under a directory, one file per secret
/// path (slashes replaced with underscores), written with owner-only
/// permissions.
#[derive(Debug, Clone)]
pub struct FileSecretProvider {
    secrets_dir: PathBuf,
}

impl FileSecretProvider {
    pub fn new(secrets_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let secrets_dir = secrets_dir.into();
        std::fs::create_dir_all(&secrets_dir)
            .map_err(|source| ConfigError::SecretIo { path: secrets_dir.display().to_string(), source })?;
        Ok(Self { secrets_dir })
    }

    fn file_for(&self, path: &str) -> PathBuf {
        self.secrets_dir.join(path.replace('/', "_"))
    }
}

impl SecretProvider for FileSecretProvider {
    fn get_secret(&self, path: &str) -> Result<String, ConfigError> {
        let file = self.file_for(path);
        if !file.exists() {
            return Err(ConfigError::SecretNotFound { path: path.to_string() });
        }
        std::fs::read_to_string(&file)
            .map(|s| s.trim().to_string())
            .map_err(|source| ConfigError::SecretIo { path: file.display().to_string(), source })
    }

    fn set_secret(&self, path: &str, value: &str) -> Result<(), ConfigError> {
        let file = self.file_for(path);
        std::fs::write(&file, value)
            .map_err(|source| ConfigError::SecretIo { path: file.display().to_string(), source })?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&file, perms)
                .map_err(|source| ConfigError::SecretIo { path: file.display().to_string(), source })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_provider_round_trips() {
        let provider = EnvSecretProvider;
        provider.set_secret("AEON_TEST_SECRET_VALUE_XYZ", "topsecret").unwrap();
        assert_eq!(provider.get_secret("AEON_TEST_SECRET_VALUE_XYZ").unwrap(), "topsecret");
    }

    #[test]
    fn env_provider_missing_errors() {
        let provider = EnvSecretProvider;
        assert!(matches!(
            provider.get_secret("AEON_TEST_SECRET_DOES_NOT_EXIST"),
            Err(ConfigError::SecretNotFound { .. })
        ));
    }

    #[test]
    fn file_provider_round_trips_and_is_owner_only() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileSecretProvider::new(dir.path()).unwrap();
        provider.set_secret("svc/api-key", "s3cr3t").unwrap();
        assert_eq!(provider.get_secret("svc/api-key").unwrap(), "s3cr3t");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let meta = std::fs::metadata(dir.path().join("svc_api-key")).unwrap();
            assert_eq!(meta.permissions().mode() & 0o777, 0o600);
        }
    }

    #[test]
    fn file_provider_missing_secret_errors() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileSecretProvider::new(dir.path()).unwrap();
        assert!(matches!(provider.get_secret("missing"), Err(ConfigError::SecretNotFound { .. })));
    }
}
