//! Server options.

/// The options for the server.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// The maximum size of a request body, in bytes.
    ///
    /// Requests with a larger body are rejected with a `400 Bad Request` before reaching the
    /// handler.
    ///
    /// If `ETAGOLOGY_MAX_REQUEST_BODY_SIZE` is set in the environment, it will be read and used
    /// when calling `ServerOptions::from_env`.
    pub max_request_body_size: usize,

    /// The number of response chunks that can be waiting to be sent to a client.
    ///
    /// A handler writing faster than its client reads blocks once that many chunks are pending.
    ///
    /// If `ETAGOLOGY_STREAM_CAPACITY` is set in the environment, it will be read and used when
    /// calling `ServerOptions::from_env`.
    pub stream_capacity: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            max_request_body_size: Self::DEFAULT_MAX_REQUEST_BODY_SIZE,
            stream_capacity: Self::DEFAULT_STREAM_CAPACITY,
        }
    }
}

/// An error that can occur when trying to get the server options from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ServerOptionsFromEnvError {
    /// An environment variable was not unicode.
    #[error("environment variable {name} was not unicode")]
    NotUnicode {
        /// The name of the environment variable.
        name: &'static str,
    },

    /// An environment variable did not hold a valid size.
    #[error("failed to parse a size from environment variable {name} (was `{value}`): {err}")]
    Size {
        /// The name of the environment variable.
        name: &'static str,

        /// The value that was attempted to be parsed.
        value: String,

        /// The error that occurred.
        #[source]
        err: std::num::ParseIntError,
    },

    /// The stream capacity was zero.
    #[error("environment variable {name} must not be zero")]
    ZeroStreamCapacity {
        /// The name of the environment variable.
        name: &'static str,
    },
}

impl ServerOptions {
    /// The default maximum request body size.
    pub const DEFAULT_MAX_REQUEST_BODY_SIZE: usize = 2 * 1024 * 1024; // 2 MiB

    /// The default stream capacity.
    pub const DEFAULT_STREAM_CAPACITY: usize = 16;

    /// The environment variable name for the maximum request body size.
    pub const ETAGOLOGY_MAX_REQUEST_BODY_SIZE: &'static str = "ETAGOLOGY_MAX_REQUEST_BODY_SIZE";

    /// The environment variable name for the stream capacity.
    pub const ETAGOLOGY_STREAM_CAPACITY: &'static str = "ETAGOLOGY_STREAM_CAPACITY";

    fn env_var(name: &'static str) -> Result<Option<String>, ServerOptionsFromEnvError> {
        match std::env::var(name) {
            Ok(value) => Ok(if value.is_empty() { None } else { Some(value) }),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(std::env::VarError::NotUnicode(_)) => {
                Err(ServerOptionsFromEnvError::NotUnicode { name })
            }
        }
    }

    fn parse_size(
        name: &'static str,
        value: Option<String>,
    ) -> Result<Option<usize>, ServerOptionsFromEnvError> {
        value
            .map(|value| {
                value
                    .trim()
                    .parse()
                    .map_err(|err| ServerOptionsFromEnvError::Size {
                        name,
                        value: value.clone(),
                        err,
                    })
            })
            .transpose()
    }

    /// Get the server options from the environment.
    ///
    /// Unset or empty variables keep their default value.
    pub fn from_env() -> Result<Self, ServerOptionsFromEnvError> {
        tracing::info!("Reading etagology server options from the environment...");

        Self::from_vars(
            Self::env_var(Self::ETAGOLOGY_MAX_REQUEST_BODY_SIZE)?,
            Self::env_var(Self::ETAGOLOGY_STREAM_CAPACITY)?,
        )
    }

    fn from_vars(
        max_request_body_size: Option<String>,
        stream_capacity: Option<String>,
    ) -> Result<Self, ServerOptionsFromEnvError> {
        let mut options = Self::default();

        match Self::parse_size(Self::ETAGOLOGY_MAX_REQUEST_BODY_SIZE, max_request_body_size)? {
            Some(max_request_body_size) => {
                tracing::info!(
                    "{} was set: accepting request bodies of up to {max_request_body_size} byte(s).",
                    Self::ETAGOLOGY_MAX_REQUEST_BODY_SIZE
                );

                options.max_request_body_size = max_request_body_size;
            }
            None => {
                tracing::info!(
                    "{} was not set: accepting request bodies of up to {} byte(s).",
                    Self::ETAGOLOGY_MAX_REQUEST_BODY_SIZE,
                    options.max_request_body_size
                );
            }
        }

        if let Some(stream_capacity) =
            Self::parse_size(Self::ETAGOLOGY_STREAM_CAPACITY, stream_capacity)?
        {
            if stream_capacity == 0 {
                return Err(ServerOptionsFromEnvError::ZeroStreamCapacity {
                    name: Self::ETAGOLOGY_STREAM_CAPACITY,
                });
            }

            options.stream_capacity = stream_capacity;
        }

        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let options = ServerOptions::from_vars(None, None).unwrap();

        assert_eq!(
            options.max_request_body_size,
            ServerOptions::DEFAULT_MAX_REQUEST_BODY_SIZE
        );
        assert_eq!(
            options.stream_capacity,
            ServerOptions::DEFAULT_STREAM_CAPACITY
        );
    }

    #[test]
    fn test_values_are_parsed() {
        let options =
            ServerOptions::from_vars(Some("1024".to_string()), Some(" 4 ".to_string())).unwrap();

        assert_eq!(options.max_request_body_size, 1024);
        assert_eq!(options.stream_capacity, 4);
    }

    #[test]
    fn test_invalid_size_is_rejected() {
        let err = ServerOptions::from_vars(Some("lots".to_string()), None).unwrap_err();

        assert!(matches!(
            err,
            ServerOptionsFromEnvError::Size {
                name: ServerOptions::ETAGOLOGY_MAX_REQUEST_BODY_SIZE,
                ..
            }
        ));
    }

    #[test]
    fn test_zero_stream_capacity_is_rejected() {
        let err = ServerOptions::from_vars(None, Some("0".to_string())).unwrap_err();

        assert!(matches!(
            err,
            ServerOptionsFromEnvError::ZeroStreamCapacity { .. }
        ));
    }
}
