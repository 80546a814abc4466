//! File-backed storage: every object in memory, one JSON snapshot on disk
//!
//! The snapshot is a single JSON object mapping `"Kind.id"` to the entity's
//! record. All state sits behind one mutex, held for the whole of each
//! operation, including the snapshot write in `save`.
//!
//! Records that cannot be read back as an entity (an unknown kind, a bad
//! field, a key that does not match the record) are kept as raw JSON and
//! written back unchanged on every save. They are invisible to queries.
//!
//! This backend does not check foreign keys. Callers must make sure parents
//! exist before staging children.

use async_trait::async_trait;
use hbnb_core::{model, resolver};
use hbnb_core::{storage_key, Amenity, City, Entity, Kind, Place, Result, Review, Storage};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub struct FileStorage {
    path: PathBuf,
    state: Mutex<FileState>,
}

#[derive(Default)]
struct FileState {
    objects: HashMap<String, Entity>,
    /// Snapshot records we could not restore, by their snapshot key
    unreadable: Map<String, Value>,
    /// Staged changes not yet written
    dirty: bool,
}

#[derive(Default)]
struct Snapshot {
    objects: HashMap<String, Entity>,
    unreadable: Map<String, Value>,
}

impl FileStorage {
    /// Create an empty store bound to `path`. Call `reload` to read it.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(FileState::default()),
        }
    }
}

/// Read a snapshot. A missing file is an empty store.
async fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No snapshot at {}, starting empty", path.display());
            return Ok(Snapshot::default());
        }
        Err(e) => return Err(e.into()),
    };

    let records: Map<String, Value> = serde_json::from_str(&content)?;
    let mut snapshot = Snapshot::default();
    for (key, record) in records {
        match model::split_key(&key).and_then(|_| model::restore(record.clone())) {
            Ok(entity) if entity.key() == key => {
                snapshot.objects.insert(key, entity);
            }
            Ok(entity) => {
                warn!(
                    "Snapshot key {} does not match record {}, keeping it as stored",
                    key,
                    entity.key()
                );
                snapshot.unreadable.insert(key, record);
            }
            Err(e) => {
                warn!("Keeping unreadable record {} as stored: {}", key, e);
                snapshot.unreadable.insert(key, record);
            }
        }
    }
    Ok(snapshot)
}

/// Write a snapshot. The previous file is only replaced once the new one
/// is fully written.
async fn write_snapshot(path: &Path, state: &FileState) -> Result<()> {
    let mut records = state.unreadable.clone();
    for (key, entity) in &state.objects {
        records.insert(key.clone(), entity.to_record()?);
    }
    let content = serde_json::to_string_pretty(&records)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, content).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

#[async_trait]
impl Storage for FileStorage {
    async fn get_all(&self, kind: Option<Kind>) -> Result<HashMap<String, Entity>> {
        let state = self.state.lock().await;
        Ok(state
            .objects
            .iter()
            .filter(|(_, e)| kind.map_or(true, |k| e.kind() == k))
            .map(|(key, e)| (key.clone(), e.clone()))
            .collect())
    }

    async fn get(&self, kind: Kind, id: &str) -> Result<Option<Entity>> {
        if id.is_empty() {
            return Ok(None);
        }
        let state = self.state.lock().await;
        Ok(state.objects.get(&storage_key(kind, id)).cloned())
    }

    async fn count(&self, kind: Option<Kind>) -> Result<usize> {
        let state = self.state.lock().await;
        Ok(match kind {
            Some(k) => state.objects.values().filter(|e| e.kind() == k).count(),
            None => state.objects.len(),
        })
    }

    async fn new(&self, entity: Entity) -> Result<()> {
        let mut state = self.state.lock().await;
        debug!("Staging {}", entity.key());
        state.objects.insert(entity.key(), entity);
        state.dirty = true;
        Ok(())
    }

    async fn save(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.dirty {
            debug!("Nothing staged, skipping snapshot write");
            return Ok(());
        }
        write_snapshot(&self.path, &state).await?;
        state.dirty = false;
        debug!(
            "Wrote {} objects to {}",
            state.objects.len(),
            self.path.display()
        );
        Ok(())
    }

    async fn delete(&self, entity: &Entity) -> Result<()> {
        let mut state = self.state.lock().await;

        let removed = resolver::cascade(&state.objects, entity);
        for key in &removed {
            state.objects.remove(key);
        }

        let mut unlinked = 0;
        if entity.kind() == Kind::Amenity {
            let places = state.objects.values_mut().filter_map(|e| match e {
                Entity::Place(p) => Some(p),
                _ => None,
            });
            unlinked = resolver::unlink_everywhere(places, entity.id());
        }

        if !removed.is_empty() || unlinked > 0 {
            debug!(
                "Staged removal of {} ({} objects, {} links)",
                entity.key(),
                removed.len(),
                unlinked
            );
            state.dirty = true;
        }
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        let snapshot = load_snapshot(&self.path).await?;
        let mut state = self.state.lock().await;
        info!(
            "Loaded {} objects from {}",
            snapshot.objects.len(),
            self.path.display()
        );
        if !snapshot.unreadable.is_empty() {
            warn!(
                "{} unreadable records will be carried through unchanged",
                snapshot.unreadable.len()
            );
        }
        state.objects = snapshot.objects;
        state.unreadable = snapshot.unreadable;
        state.dirty = false;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let dirty = self.state.lock().await.dirty;
        if dirty {
            warn!("Discarding unsaved changes on close");
            self.reload().await?;
        }
        Ok(())
    }

    async fn cities_of(&self, state_id: &str) -> Result<Vec<City>> {
        let state = self.state.lock().await;
        let found = resolver::children(state.objects.values(), Kind::City, Kind::State, state_id);
        Ok(resolver::of_kind(found))
    }

    async fn places_of(&self, city_id: &str) -> Result<Vec<Place>> {
        let state = self.state.lock().await;
        let found = resolver::children(state.objects.values(), Kind::Place, Kind::City, city_id);
        Ok(resolver::of_kind(found))
    }

    async fn reviews_of(&self, place_id: &str) -> Result<Vec<Review>> {
        let state = self.state.lock().await;
        let found =
            resolver::children(state.objects.values(), Kind::Review, Kind::Place, place_id);
        Ok(resolver::of_kind(found))
    }

    async fn amenities_of(&self, place_id: &str) -> Result<Vec<Amenity>> {
        let state = self.state.lock().await;
        let Some(Entity::Place(place)) = state.objects.get(&storage_key(Kind::Place, place_id))
        else {
            return Ok(Vec::new());
        };
        Ok(place
            .amenity_ids
            .iter()
            .filter_map(|id| state.objects.get(&storage_key(Kind::Amenity, id)))
            .cloned()
            .filter_map(|e| Amenity::try_from(e).ok())
            .collect())
    }

    async fn link_amenity(&self, place_id: &str, amenity_id: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        let Some(Entity::Place(place)) =
            state.objects.get_mut(&storage_key(Kind::Place, place_id))
        else {
            return Ok(false);
        };
        if place.amenity_ids.iter().any(|id| id == amenity_id) {
            return Ok(false);
        }
        place.amenity_ids.push(amenity_id.to_string());
        place.base.touch();
        state.dirty = true;
        Ok(true)
    }

    async fn unlink_amenity(&self, place_id: &str, amenity_id: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        let Some(Entity::Place(place)) =
            state.objects.get_mut(&storage_key(Kind::Place, place_id))
        else {
            return Ok(false);
        };
        let before = place.amenity_ids.len();
        place.amenity_ids.retain(|id| id != amenity_id);
        if place.amenity_ids.len() == before {
            return Ok(false);
        }
        place.base.touch();
        state.dirty = true;
        Ok(true)
    }
}
