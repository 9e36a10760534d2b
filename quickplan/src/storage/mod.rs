//! Estado persistido entre peticiones: overrides fijos y último plan.
//!
//! `JsonFileStore` serializa cada actualización con un mutex y publica el
//! archivo con reemplazo atómico (archivo temporal + rename), así dos
//! peticiones concurrentes no pierden escrituras ni dejan JSON a medias.
//! Un archivo ausente o corrupto se lee como vacío.
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{PlannerError, Result};
use crate::models::{FixedOverride, PlanRecord};

pub trait OverrideStore: Send + Sync {
    fn load(&self) -> Result<Vec<FixedOverride>>;

    /// Agrega si no existe ya el mismo par. Devuelve `true` si se agregó.
    fn add(&self, o: FixedOverride) -> Result<bool>;

    /// Elimina todos los overrides del curso. Devuelve cuántos se quitaron.
    fn remove(&self, code: &str) -> Result<usize>;

    fn clear(&self) -> Result<()>;
}

pub trait PlanStore: Send + Sync {
    fn save_last(&self, record: &PlanRecord) -> Result<()>;
    fn load_last(&self) -> Result<Option<PlanRecord>>;
}

/// Ambos stores en memoria.
#[derive(Debug, Default)]
pub struct MemoryStore {
    overrides: Mutex<Vec<FixedOverride>>,
    last: Mutex<Option<PlanRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

fn poisoned() -> PlannerError {
    PlannerError::Config("store lock poisoned".to_string())
}

impl OverrideStore for MemoryStore {
    fn load(&self) -> Result<Vec<FixedOverride>> {
        Ok(self.overrides.lock().map_err(|_| poisoned())?.clone())
    }

    fn add(&self, o: FixedOverride) -> Result<bool> {
        let mut guard = self.overrides.lock().map_err(|_| poisoned())?;
        if guard.contains(&o) {
            return Ok(false);
        }
        guard.push(o);
        Ok(true)
    }

    fn remove(&self, code: &str) -> Result<usize> {
        let mut guard = self.overrides.lock().map_err(|_| poisoned())?;
        let before = guard.len();
        guard.retain(|o| o.code != code);
        Ok(before - guard.len())
    }

    fn clear(&self) -> Result<()> {
        self.overrides.lock().map_err(|_| poisoned())?.clear();
        Ok(())
    }
}

impl PlanStore for MemoryStore {
    fn save_last(&self, record: &PlanRecord) -> Result<()> {
        *self.last.lock().map_err(|_| poisoned())? = Some(record.clone());
        Ok(())
    }

    fn load_last(&self) -> Result<Option<PlanRecord>> {
        Ok(self.last.lock().map_err(|_| poisoned())?.clone())
    }
}

/// Overrides como lista JSON de pares `[code, semester]` y último plan como objeto JSON.
#[derive(Debug)]
pub struct JsonFileStore {
    overrides_path: PathBuf,
    last_plan_path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(overrides_path: impl Into<PathBuf>, last_plan_path: impl Into<PathBuf>) -> Self {
        JsonFileStore {
            overrides_path: overrides_path.into(),
            last_plan_path: last_plan_path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn overrides_path(&self) -> &Path {
        &self.overrides_path
    }

    fn read_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
            Err(e) => return Err(PlannerError::storage(path, e)),
        };
        match serde_json::from_str(&raw) {
            Ok(v) => Ok(v),
            Err(e) => {
                warn!("{} corrupto ({}), se lee como vacío", path.display(), e);
                Ok(T::default())
            }
        }
    }

    /// Escribe en un temporal del mismo directorio y lo renombra sobre el destino.
    fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| PlannerError::storage(&dir, e))?;

        let json = serde_json::to_vec_pretty(value)?;
        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| PlannerError::storage(&dir, e))?;
        tmp.write_all(&json).map_err(|e| PlannerError::storage(path, e))?;
        tmp.as_file().sync_all().map_err(|e| PlannerError::storage(path, e))?;
        tmp.persist(path).map_err(|e| PlannerError::storage(path, e.error))?;
        debug!("{} actualizado", path.display());
        Ok(())
    }

    fn update_overrides<R>(&self, f: impl FnOnce(&mut Vec<FixedOverride>) -> R) -> Result<R> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        let mut list: Vec<FixedOverride> = Self::read_or_default(&self.overrides_path)?;
        let out = f(&mut list);
        Self::write_atomic(&self.overrides_path, &list)?;
        Ok(out)
    }
}

impl OverrideStore for JsonFileStore {
    fn load(&self) -> Result<Vec<FixedOverride>> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        Self::read_or_default(&self.overrides_path)
    }

    fn add(&self, o: FixedOverride) -> Result<bool> {
        self.update_overrides(|list| {
            if list.contains(&o) {
                false
            } else {
                list.push(o);
                true
            }
        })
    }

    fn remove(&self, code: &str) -> Result<usize> {
        self.update_overrides(|list| {
            let before = list.len();
            list.retain(|o| o.code != code);
            before - list.len()
        })
    }

    fn clear(&self) -> Result<()> {
        self.update_overrides(|list| list.clear())
    }
}

impl PlanStore for JsonFileStore {
    fn save_last(&self, record: &PlanRecord) -> Result<()> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        Self::write_atomic(&self.last_plan_path, record)
    }

    fn load_last(&self) -> Result<Option<PlanRecord>> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        Self::read_or_default(&self.last_plan_path)
    }
}
