//! Repositorio de catálogos.
//!
//! Un catálogo por carrera (indexado por posición) y un catálogo de oferta
//! con las secciones del periodo actual, usado para los horarios.
//!
//! `FileCatalogRepository` lee un directorio con `catalogs.json`:
//!
//! ```json
//! { "majors": [ {"code": "COSC", "name": "Computer Science", "file": "cosc.json"} ],
//!   "offering": "offering.json" }
//! ```
//!
//! Cada archivo es el mapeo `código -> curso` de `Catalog::from_json`. Los
//! catálogos ya parseados se guardan en una caché propia del repositorio.
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PlannerError, Result};
use crate::models::Catalog;

pub const MANIFEST_FILE: &str = "catalogs.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MajorInfo {
    pub code: String,
    pub name: String,
}

pub trait CatalogRepository: Send + Sync {
    fn majors(&self) -> Result<Vec<MajorInfo>>;

    /// Catálogo de la carrera `index`; `UnknownMajor` si no existe.
    fn major_catalog(&self, index: usize) -> Result<Arc<Catalog>>;

    /// Catálogo de oferta del periodo (secciones y laboratorios).
    fn offering(&self) -> Result<Arc<Catalog>>;
}

/// Catálogos inyectados directamente.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogRepository {
    majors: Vec<(MajorInfo, Arc<Catalog>)>,
    offering: Arc<Catalog>,
}

impl InMemoryCatalogRepository {
    pub fn new() -> Self {
        InMemoryCatalogRepository::default()
    }

    pub fn with_major(mut self, code: impl Into<String>, name: impl Into<String>, catalog: Catalog) -> Self {
        let info = MajorInfo { code: code.into(), name: name.into() };
        self.majors.push((info, Arc::new(catalog)));
        self
    }

    pub fn with_offering(mut self, catalog: Catalog) -> Self {
        self.offering = Arc::new(catalog);
        self
    }
}

impl CatalogRepository for InMemoryCatalogRepository {
    fn majors(&self) -> Result<Vec<MajorInfo>> {
        Ok(self.majors.iter().map(|(m, _)| m.clone()).collect())
    }

    fn major_catalog(&self, index: usize) -> Result<Arc<Catalog>> {
        self.majors
            .get(index)
            .map(|(_, c)| Arc::clone(c))
            .ok_or(PlannerError::UnknownMajor { index, available: self.majors.len() })
    }

    fn offering(&self) -> Result<Arc<Catalog>> {
        Ok(Arc::clone(&self.offering))
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ManifestMajor {
    code: String,
    name: String,
    file: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
struct Manifest {
    majors: Vec<ManifestMajor>,
    #[serde(default)]
    offering: Option<PathBuf>,
}

pub struct FileCatalogRepository {
    dir: PathBuf,
    manifest: Manifest,
    cache: Mutex<HashMap<PathBuf, Arc<Catalog>>>,
}

impl FileCatalogRepository {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let path = dir.join(MANIFEST_FILE);
        let raw = fs::read_to_string(&path).map_err(|e| PlannerError::storage(&path, e))?;
        let manifest: Manifest = serde_json::from_str(&raw)?;
        info!("catálogos: {} carreras en {}", manifest.majors.len(), dir.display());
        Ok(FileCatalogRepository { dir, manifest, cache: Mutex::new(HashMap::new()) })
    }

    fn load(&self, file: &Path) -> Result<Arc<Catalog>> {
        let path = self.dir.join(file);
        {
            let guard = self.cache.lock().map_err(|_| PlannerError::Config("catalog cache poisoned".to_string()))?;
            if let Some(existing) = guard.get(&path) {
                return Ok(Arc::clone(existing));
            }
        }

        debug!("leyendo catálogo {}", path.display());
        let raw = fs::read_to_string(&path).map_err(|e| PlannerError::storage(&path, e))?;
        let catalog = Arc::new(Catalog::from_json(&raw)?);

        let mut guard = self.cache.lock().map_err(|_| PlannerError::Config("catalog cache poisoned".to_string()))?;
        guard.insert(path, Arc::clone(&catalog));
        Ok(catalog)
    }
}

impl CatalogRepository for FileCatalogRepository {
    fn majors(&self) -> Result<Vec<MajorInfo>> {
        Ok(self
            .manifest
            .majors
            .iter()
            .map(|m| MajorInfo { code: m.code.clone(), name: m.name.clone() })
            .collect())
    }

    fn major_catalog(&self, index: usize) -> Result<Arc<Catalog>> {
        let major = self.manifest.majors.get(index).ok_or(PlannerError::UnknownMajor {
            index,
            available: self.manifest.majors.len(),
        })?;
        self.load(&major.file)
    }

    fn offering(&self) -> Result<Arc<Catalog>> {
        match &self.manifest.offering {
            Some(file) => self.load(file),
            None => Ok(Arc::new(Catalog::default())),
        }
    }
}
