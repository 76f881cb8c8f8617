/// Failures raised synchronously, strictly before any store mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Action requires a signed-in user.
    Unauthenticated,
    /// Requested target residences exceed the user's grant.
    UnauthorizedResidences,
    /// Required-field or cross-field validation failure.
    InvalidData(Vec<FieldError>),
    /// Referenced record does not exist.
    NotFound,
    /// Operation not valid for the record's current status.
    InvalidState,
}

impl StoreError {
    /// Message rendered by the notification banner.
    pub fn user_message(&self) -> String {
        match self {
            StoreError::Unauthenticated => {
                "Vous devez être connecté pour effectuer cette action.".to_string()
            }
            StoreError::UnauthorizedResidences => {
                "Vous n'êtes pas autorisé à publier dans certaines résidences sélectionnées."
                    .to_string()
            }
            StoreError::InvalidData(errors) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                format!("Certains champs sont invalides : {}", fields.join(", "))
            }
            StoreError::NotFound => "Publication introuvable.".to_string(),
            StoreError::InvalidState => {
                "Cette action n'est pas disponible pour le statut actuel.".to_string()
            }
        }
    }
}

/// One inline validation error, keyed by form field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Background sync failure. Never surfaced to the user: logged, and the
/// record stays local-pending until a later reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    Network(String),
    Status(u16),
}
