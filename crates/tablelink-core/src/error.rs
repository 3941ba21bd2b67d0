use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Scan errors
    #[error("Payload is required")]
    EmptyPayload,

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration load error: {0}")]
    ConfigLoad(#[from] Box<figment::Error>),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(Error::EmptyPayload.to_string(), "Payload is required");
        assert_eq!(
            Error::Config("serial.baud_rate must be positive".into()).to_string(),
            "Configuration error: serial.baud_rate must be positive"
        );
    }

    #[test]
    fn test_figment_error_is_boxed_into_config_load() {
        let err = Error::from(figment::Error::from("missing field".to_string()));
        assert!(matches!(err, Error::ConfigLoad(_)));
    }
}
