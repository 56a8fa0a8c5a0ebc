//! Types d'erreurs pour pmosignage

/// Erreurs de la couche d'administration du catalogue
///
/// La résolution des playlists n'en produit jamais ; ces erreurs
/// concernent uniquement les écritures et la persistance.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Material not found: {0}")]
    MaterialNotFound(String),

    #[error("Group not found: {0}")]
    GroupNotFound(String),

    #[error("Assignment not found: {0}")]
    AssignmentNotFound(String),

    #[error("Unknown section: {0}")]
    UnknownSection(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("SignageManager not initialized")]
    ManagerNotInitialized,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::PersistenceError(e.to_string())
    }
}

/// Type Result spécialisé pour pmosignage
pub type Result<T> = std::result::Result<T, Error>;
