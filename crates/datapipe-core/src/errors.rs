use thiserror::Error;

/// Result type alias using PipelineError
pub type Result<T> = std::result::Result<T, PipelineError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable code that callers can match on without parsing
/// messages. Codes are part of the public contract: never renumber or rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Record shape
    InvalidPropertyName,

    // Data point validation
    NoRepository,
    InvalidRepository,
    NoEntity,
    InvalidEntity,
    NoAction,
    NoKeyNames,
    NoData,
    DataMissingKeys,
    /// A source line or message that does not decode into a data point
    MalformedRecord,

    // Plugin registry
    DuplicateFactory,
    FactoryNotFound,

    // Plugin configuration
    InvalidInput,

    // Integration/IO
    Io,
    Serialization,
    Persistence,
    ExternalService,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidPropertyName => "ERR_INVALID_PROPERTY_NAME",
            ExErrorKind::NoRepository => "ERR_NO_REPOSITORY",
            ExErrorKind::InvalidRepository => "ERR_INVALID_REPOSITORY",
            ExErrorKind::NoEntity => "ERR_NO_ENTITY",
            ExErrorKind::InvalidEntity => "ERR_INVALID_ENTITY",
            ExErrorKind::NoAction => "ERR_NO_ACTION",
            ExErrorKind::NoKeyNames => "ERR_NO_KEY_NAMES",
            ExErrorKind::NoData => "ERR_NO_DATA",
            ExErrorKind::DataMissingKeys => "ERR_DATA_MISSING_KEYS",
            ExErrorKind::MalformedRecord => "ERR_MALFORMED_RECORD",
            ExErrorKind::DuplicateFactory => "ERR_DUPLICATE_FACTORY",
            ExErrorKind::FactoryNotFound => "ERR_FACTORY_NOT_FOUND",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::ExternalService => "ERR_EXTERNAL_SERVICE",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// True for kinds that reject one specific record permanently.
    ///
    /// Retrying such a record can never succeed; the ingest loop quarantines
    /// it and moves on instead of aborting the stream.
    pub fn is_record_rejection(&self) -> bool {
        matches!(
            self,
            ExErrorKind::InvalidPropertyName
                | ExErrorKind::NoRepository
                | ExErrorKind::InvalidRepository
                | ExErrorKind::NoEntity
                | ExErrorKind::InvalidEntity
                | ExErrorKind::NoAction
                | ExErrorKind::NoKeyNames
                | ExErrorKind::NoData
                | ExErrorKind::DataMissingKeys
                | ExErrorKind::MalformedRecord
        )
    }
}

/// Canonical structured error type
///
/// Store, engine and CLI layers propagate this type. Domain errors raised by
/// the core convert into it through `From<PipelineError>`.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity: Option<String>,
    property: Option<String>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity: None,
            property: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add the entity (record category) the error concerns
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Add the offending property name
    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    /// Add a human-readable message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    pub fn property(&self) -> Option<&str> {
        self.property.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity) = &self.entity {
            write!(f, " (entity: {})", entity)?;
        }
        if let Some(property) = &self.property {
            write!(f, " (property: {})", property)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Domain errors raised by the core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    // ===== Shape Errors =====
    /// A field name contains a reserved delimiter (`:` or `,`)
    #[error("Invalid character found in property '{property}'.")]
    InvalidPropertyName { property: String },

    // ===== Data Point Validation =====
    #[error("no repository was defined")]
    NoRepository,

    #[error("repository '{repository}' does not meet naming requirements")]
    InvalidRepository { repository: String },

    #[error("no entity was defined")]
    NoEntity,

    #[error("entity '{entity}' does not meet naming requirements")]
    InvalidEntity { entity: String },

    #[error("no action was defined")]
    NoAction,

    #[error("keyNames was either not provided or is empty")]
    NoKeyNames,

    #[error("data was either not provided or is empty")]
    NoData,

    #[error("key names not provided in the data: {missing:?}")]
    DataMissingKeys { missing: Vec<String> },

    // ===== Registry Errors =====
    /// A factory name was registered twice
    #[error("{registry} factory already registered with name {name}")]
    DuplicateFactory { registry: String, name: String },

    /// No factory under the requested name
    #[error("could not find {registry} factory with name {name}")]
    FactoryNotFound { registry: String, name: String },

    // ===== Generic Errors =====
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<PipelineError> for ExError {
    fn from(err: PipelineError) -> Self {
        let message = err.to_string();
        match err {
            PipelineError::InvalidPropertyName { property } => {
                ExError::new(ExErrorKind::InvalidPropertyName)
                    .with_op("get_shape")
                    .with_property(property)
                    .with_message(message)
            }
            PipelineError::NoRepository => {
                ExError::new(ExErrorKind::NoRepository).with_message(message)
            }
            PipelineError::InvalidRepository { .. } => {
                ExError::new(ExErrorKind::InvalidRepository).with_message(message)
            }
            PipelineError::NoEntity => ExError::new(ExErrorKind::NoEntity).with_message(message),
            PipelineError::InvalidEntity { entity } => ExError::new(ExErrorKind::InvalidEntity)
                .with_entity(entity)
                .with_message(message),
            PipelineError::NoAction => ExError::new(ExErrorKind::NoAction).with_message(message),
            PipelineError::NoKeyNames => {
                ExError::new(ExErrorKind::NoKeyNames).with_message(message)
            }
            PipelineError::NoData => ExError::new(ExErrorKind::NoData).with_message(message),
            PipelineError::DataMissingKeys { .. } => {
                ExError::new(ExErrorKind::DataMissingKeys).with_message(message)
            }
            PipelineError::DuplicateFactory { .. } => ExError::new(ExErrorKind::DuplicateFactory)
                .with_op("register_factory")
                .with_message(message),
            PipelineError::FactoryNotFound { .. } => ExError::new(ExErrorKind::FactoryNotFound)
                .with_op("get_factory")
                .with_message(message),
            PipelineError::Serialization { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
            PipelineError::Internal { .. } => {
                ExError::new(ExErrorKind::Internal).with_message(message)
            }
        }
    }
}

/// Conversion from serde_json::Error to PipelineError
impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_rejection_kinds() {
        assert!(ExErrorKind::InvalidPropertyName.is_record_rejection());
        assert!(ExErrorKind::DataMissingKeys.is_record_rejection());
        assert!(ExErrorKind::MalformedRecord.is_record_rejection());
        assert!(!ExErrorKind::Io.is_record_rejection());
        assert!(!ExErrorKind::Persistence.is_record_rejection());
        assert!(!ExErrorKind::DuplicateFactory.is_record_rejection());
    }

    #[test]
    fn test_display_includes_code_op_and_property() {
        let err: ExError = PipelineError::InvalidPropertyName {
            property: "a:b".to_string(),
        }
        .into();
        let rendered = err.to_string();
        assert!(rendered.starts_with("[ERR_INVALID_PROPERTY_NAME]"));
        assert!(rendered.contains("get_shape"));
        assert!(rendered.contains("(property: a:b)"));
    }

    #[test]
    fn test_serde_json_error_converts() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let pipeline_err: PipelineError = err.into();
        assert!(matches!(pipeline_err, PipelineError::Serialization { .. }));
    }
}
