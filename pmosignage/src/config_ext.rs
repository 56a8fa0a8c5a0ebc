//! Extension de pmoconfig pour l'affichage dynamique

use std::path::PathBuf;

/// Trait d'extension pour pmoconfig::Config
pub trait SignageConfigExt {
    /// Retourne le répertoire de données de l'affichage (créé si besoin)
    fn signage_dir(&self) -> anyhow::Result<PathBuf>;

    /// Retourne le chemin de la base SQLite du catalogue
    fn signage_db_path(&self) -> anyhow::Result<PathBuf>;
}

impl SignageConfigExt for pmoconfig::Config {
    fn signage_dir(&self) -> anyhow::Result<PathBuf> {
        let dir = self.get_managed_dir(&["signage", "directory"], "signage")?;
        Ok(PathBuf::from(dir))
    }

    fn signage_db_path(&self) -> anyhow::Result<PathBuf> {
        Ok(self.signage_dir()?.join("signage.db"))
    }
}
