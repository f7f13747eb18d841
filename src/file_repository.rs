use crate::{
    models::{Plan, PlanDraft},
    repository::{Repository, StoreError},
};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::{
    ffi::OsString,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use uuid::Uuid;

/// FileRepository
///
/// The flat-record adapter: the whole catalog is one JSON array on disk. Every call reads
/// the full collection, changes it in memory and writes it back.
///
/// There is no locking. Two concurrent writers both read the old collection and the one
/// that writes last wins; the other change is lost.
pub struct FileRepository {
    path: PathBuf,
}

/// One element of the stored array. Entries that cannot be read as a plan at all are
/// kept verbatim and written back unchanged.
#[derive(Serialize)]
#[serde(untagged)]
enum Record {
    Plan(Plan),
    Opaque(Value),
}

impl Record {
    fn decode(entry: Value) -> Self {
        if let Ok(plan) = serde_json::from_value::<Plan>(entry.clone()) {
            return Record::Plan(plan);
        }
        match Plan::from_stored(&entry) {
            Some(plan) => {
                tracing::debug!(plan_id = %plan.id, "decoded non-canonical plan record");
                Record::Plan(plan)
            }
            None => {
                tracing::warn!("keeping unreadable plan record as-is");
                Record::Opaque(entry)
            }
        }
    }

    fn plan(&self) -> Option<&Plan> {
        match self {
            Record::Plan(plan) => Some(plan),
            Record::Opaque(_) => None,
        }
    }

    fn plan_mut(&mut self, id: &str) -> Option<&mut Plan> {
        match self {
            Record::Plan(plan) if plan.id == id => Some(plan),
            _ => None,
        }
    }

    fn into_plan(self) -> Option<Plan> {
        match self {
            Record::Plan(plan) => Some(plan),
            Record::Opaque(_) => None,
        }
    }
}

impl FileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the collection. A missing file, invalid JSON or a non-array document all
    /// read as an empty catalog.
    async fn read_records(&self) -> Result<Vec<Record>, StoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(entries)) => Ok(entries.into_iter().map(Record::decode).collect()),
            Ok(_) => {
                tracing::warn!(path = %self.path.display(), "data file is not a JSON array");
                Ok(vec![])
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "data file is not valid JSON");
                Ok(vec![])
            }
        }
    }

    async fn read_plans(&self) -> Result<Vec<Plan>, StoreError> {
        Ok(self
            .read_records()
            .await?
            .into_iter()
            .filter_map(Record::into_plan)
            .collect())
    }

    /// Writes the collection to a sibling temp file unique to this write, then renames it
    /// over the target.
    async fn write_records(&self, records: &[Record]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let body = serde_json::to_string_pretty(records)?;
        let mut tmp_name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("planes.json"));
        tmp_name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
        let tmp = self.path.with_file_name(tmp_name);

        tokio::fs::write(&tmp, body).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for FileRepository {
    async fn list_plans(&self) -> Result<Vec<Plan>, StoreError> {
        self.read_plans().await
    }

    async fn list_active_plans(&self) -> Result<Vec<Plan>, StoreError> {
        let mut plans = self.read_plans().await?;
        plans.retain(|p| p.activo);
        Ok(plans)
    }

    async fn get_plan(&self, id: &str, active_only: bool) -> Result<Option<Plan>, StoreError> {
        Ok(self
            .read_plans()
            .await?
            .into_iter()
            .find(|p| p.id == id && (!active_only || p.activo)))
    }

    /// insert_plan
    ///
    /// New plans go to the front so the file stays ordered newest first.
    async fn insert_plan(&self, id: &str, draft: &PlanDraft) -> Result<Plan, StoreError> {
        let mut records = self.read_records().await?;

        let now = Utc::now();
        let mut plan = Plan::from_draft(id.to_string(), draft.clone());
        plan.created_at = Some(now);
        plan.updated_at = Some(now);

        records.insert(0, Record::Plan(plan.clone()));
        self.write_records(&records).await?;
        Ok(plan)
    }

    async fn update_plan(
        &self,
        id: &str,
        draft: &PlanDraft,
    ) -> Result<Option<Plan>, StoreError> {
        let mut records = self.read_records().await?;
        let Some(plan) = records.iter_mut().find_map(|r| r.plan_mut(id)) else {
            return Ok(None);
        };

        plan.apply(draft.clone());
        plan.updated_at = Some(Utc::now());
        let updated = plan.clone();

        self.write_records(&records).await?;
        Ok(Some(updated))
    }

    async fn delete_plan(&self, id: &str) -> Result<Option<Plan>, StoreError> {
        let mut records = self.read_records().await?;
        let Some(idx) = records
            .iter()
            .position(|r| r.plan().is_some_and(|p| p.id == id))
        else {
            return Ok(None);
        };

        let removed = records.remove(idx).into_plan();
        self.write_records(&records).await?;
        Ok(removed)
    }
}
