use crate::core::commit;
use crate::domain::model::{Course, ItemId, OwnerId, OwnerRecord};
use crate::domain::ports::RankingStore;
use crate::utils::error::{RankError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;

const OWNERS_DIR: &str = "owners";
const COURSES_DIR: &str = "courses";

/// One JSON document per owner and per course under `base_path`.
///
/// Writes go to a temporary file that is renamed over the target, so a reader
/// sees either the old or the new document. All operations are serialized
/// through one lock; a save is therefore a true compare-and-swap.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    base_path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl JsonFileStore {
    pub async fn open<P: AsRef<Path>>(base_path: P) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(base_path.join(OWNERS_DIR)).await?;
        fs::create_dir_all(base_path.join(COURSES_DIR)).await?;
        tracing::debug!("Opened JSON file store at {}", base_path.display());
        Ok(Self {
            base_path,
            lock: Arc::new(Mutex::new(())),
        })
    }

    fn owner_path(&self, owner_id: OwnerId) -> PathBuf {
        self.base_path.join(OWNERS_DIR).join(format!("{}.json", owner_id))
    }

    fn course_path(&self, item_id: ItemId) -> PathBuf {
        self.base_path.join(COURSES_DIR).join(format!("{}.json", item_id))
    }

    async fn read_owner(&self, owner_id: OwnerId) -> Result<OwnerRecord> {
        let data = match fs::read(self.owner_path(owner_id)).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(RankError::OwnerNotFound {
                    owner_id: owner_id.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&data).map_err(|e| RankError::CorruptRanking {
            owner_id: owner_id.to_string(),
            reason: e.to_string(),
        })
    }

    async fn read_course(&self, item_id: ItemId) -> Result<Course> {
        match fs::read(self.course_path(item_id)).await {
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(RankError::ItemNotFound {
                item_id: item_id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_all<T: DeserializeOwned>(&self, dir: &str) -> Result<Vec<T>> {
        let mut docs = Vec::new();
        let mut entries = fs::read_dir(self.base_path.join(dir)).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let data = fs::read(&path).await?;
            docs.push(serde_json::from_slice(&data)?);
        }
        Ok(docs)
    }
}

async fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let data = serde_json::to_vec_pretty(value)?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, &data).await?;
    fs::rename(&tmp_path, path).await?;
    Ok(())
}

#[async_trait]
impl RankingStore for JsonFileStore {
    async fn insert_owner(&self, owner: OwnerRecord) -> Result<OwnerRecord> {
        let _guard = self.lock.lock().await;
        let existing: Vec<OwnerRecord> = self.read_all(OWNERS_DIR).await?;
        if existing
            .iter()
            .any(|o| o.email.eq_ignore_ascii_case(&owner.email))
        {
            return Err(RankError::DuplicateEmail { email: owner.email });
        }
        write_atomic(&self.owner_path(owner.id), &owner).await?;
        Ok(owner)
    }

    async fn load_owner(&self, owner_id: OwnerId) -> Result<OwnerRecord> {
        let _guard = self.lock.lock().await;
        self.read_owner(owner_id).await
    }

    async fn save_owner(
        &self,
        mut owner: OwnerRecord,
        expected_version: u64,
    ) -> Result<OwnerRecord> {
        let _guard = self.lock.lock().await;
        let current = self.read_owner(owner.id).await?;
        if current.version != expected_version {
            return Err(RankError::Conflict {
                expected: expected_version,
                actual: current.version,
            });
        }

        // 新加入的課程必須在同一把鎖內仍然存在
        for item_id in owner.rankings.item_ids() {
            if current.rankings.contains(item_id) {
                continue;
            }
            if !fs::try_exists(self.course_path(item_id)).await? {
                return Err(RankError::ItemNotFound {
                    item_id: item_id.to_string(),
                });
            }
        }

        owner.version = expected_version + 1;
        write_atomic(&self.owner_path(owner.id), &owner).await?;
        Ok(owner)
    }

    async fn insert_course(&self, course: Course) -> Result<Course> {
        let _guard = self.lock.lock().await;
        let existing: Vec<Course> = self.read_all(COURSES_DIR).await?;
        if existing
            .iter()
            .any(|c| c.code.eq_ignore_ascii_case(&course.code))
        {
            return Err(RankError::DuplicateCourseCode { code: course.code });
        }
        write_atomic(&self.course_path(course.id), &course).await?;
        Ok(course)
    }

    async fn get_course(&self, item_id: ItemId) -> Result<Course> {
        let _guard = self.lock.lock().await;
        self.read_course(item_id).await
    }

    async fn list_courses(&self) -> Result<Vec<Course>> {
        let _guard = self.lock.lock().await;
        let mut courses: Vec<Course> = self.read_all(COURSES_DIR).await?;
        courses.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(courses)
    }

    async fn delete_course(&self, item_id: ItemId) -> Result<Course> {
        let _guard = self.lock.lock().await;
        let course = self.read_course(item_id).await?;

        // 先更新排名再刪除課程，中途失敗也不會留下懸空的排名
        let owners: Vec<OwnerRecord> = self.read_all(OWNERS_DIR).await?;
        for mut owner in owners {
            if let Some(updated) = commit::remove(&owner.rankings, item_id) {
                owner.rankings = updated;
                owner.version += 1;
                write_atomic(&self.owner_path(owner.id), &owner).await?;
            }
        }

        fs::remove_file(self.course_path(item_id)).await?;
        Ok(course)
    }
}
