use anyhow::{bail, Context, Result};
use atomic_write_file::AtomicWriteFile;
use chrono::{DateTime, Utc};
use fs4::fs_std::FileExt;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::types::{EvaluationRecord, NewEvaluation, ScoreRow, StoreData, STORE_VERSION};
use super::Store;
use crate::evaluations::Evaluation;
use crate::scoring::ScoreSet;
use crate::teams::{same_name, NewTeam, Team};

/// Get the default data file path (~/.config/judge-tally/tally.json)
pub fn get_data_path() -> PathBuf {
    crate::config::get_config_dir().join("tally.json")
}

/// Load store data from a JSON file
///
/// Returns None if the file doesn't exist.
/// If the file exists but has an unsupported version, returns an error.
pub fn load_store_data(path: &Path) -> Result<Option<StoreData>> {
    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(path)
        .with_context(|| format!("Failed to open data file at {}", path.display()))?;

    let data: StoreData = serde_json::from_reader(file)
        .with_context(|| format!("Failed to load data file at {}", path.display()))?;

    if data.version != STORE_VERSION {
        bail!("Unsupported data file version: {}", data.version);
    }

    Ok(Some(data))
}

/// Save store data to a JSON file atomically
///
/// Uses atomic-write-file so the file is never left half-written.
/// Creates the parent directory if it doesn't exist.
pub fn save_store_data(path: &Path, data: &StoreData) -> Result<()> {
    ensure_parent_dir(path)?;

    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;

    serde_json::to_writer_pretty(&mut file, data).context("Failed to serialize data file")?;

    file.commit().context("Failed to save data file")?;

    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create data directory at {}", dir.display()))?;
        }
    }
    Ok(())
}

/// Sidecar lock file next to the data file. The data file itself is replaced
/// by rename on every commit, so it cannot carry the lock.
fn lock_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

/// Block until this process holds the exclusive lock for `path`. The lock is
/// released when the returned file is dropped.
fn lock_data_file(path: &Path) -> Result<File> {
    ensure_parent_dir(path)?;
    let lock_path = lock_path(path);
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .with_context(|| format!("Failed to open lock file at {}", lock_path.display()))?;
    FileExt::lock_exclusive(&file)
        .with_context(|| format!("Failed to lock {}", lock_path.display()))?;
    Ok(file)
}

/// Read the data file, or start empty when it is missing. A file scored
/// under another model is refused.
fn read_data(path: &Path, score_model: &str) -> Result<StoreData> {
    match load_store_data(path)? {
        Some(data) => {
            if data.score_model != score_model {
                bail!(
                    "Data file {} holds evaluations scored with model '{}', \
                     but the configuration selects '{}'",
                    path.display(),
                    data.score_model,
                    score_model
                );
            }
            debug!(
                teams = data.teams.len(),
                evaluations = data.evaluations.len(),
                "Loaded data file {}",
                path.display()
            );
            Ok(data)
        }
        None => {
            debug!("No data file at {}, starting empty", path.display());
            Ok(StoreData::new(score_model))
        }
    }
}

/// Store backed by one JSON document, rewritten atomically after every
/// mutation. Without a path it lives purely in memory.
///
/// Each mutation takes an exclusive lock on the data file, re-reads it, applies
/// the change with the relational checks against that fresh copy and commits
/// before unlocking. Several processes can therefore share one data file;
/// reads serve the copy from the last open or mutation.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: Option<PathBuf>,
    data: StoreData,
}

impl JsonStore {
    pub fn in_memory(score_model: &str) -> Self {
        Self {
            path: None,
            data: StoreData::new(score_model),
        }
    }

    /// Open the data file at `path`, creating an empty store if it is missing.
    ///
    /// The data file records which score model its evaluations were scored
    /// under; opening it with a different model is refused rather than
    /// reinterpreting old scores.
    pub fn open(path: &Path, score_model: &str) -> Result<Self> {
        Ok(Self {
            path: Some(path.to_path_buf()),
            data: read_data(path, score_model)?,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn data(&self) -> &StoreData {
        &self.data
    }

    fn persist(&self) -> Result<()> {
        match self.path {
            Some(ref path) => save_store_data(path, &self.data),
            None => Ok(()),
        }
    }

    /// Lock, reload, apply `change` and persist. On any failure the in-memory
    /// state is rolled back so it keeps matching the file.
    fn transact<T>(&mut self, change: impl FnOnce(&mut StoreData) -> Result<T>) -> Result<T> {
        let _lock = match self.path {
            Some(ref path) => {
                let lock = lock_data_file(path)?;
                self.data = read_data(path, &self.data.score_model)?;
                Some(lock)
            }
            None => None,
        };

        let before = self.data.clone();
        let out = match change(&mut self.data) {
            Ok(out) => out,
            Err(e) => {
                self.data = before;
                return Err(e);
            }
        };
        if let Err(e) = self.persist() {
            self.data = before;
            return Err(e);
        }
        Ok(out)
    }
}

fn check_unique(teams: &[Team], candidate: &Team) -> Result<()> {
    for other in teams.iter().filter(|t| t.id != candidate.id) {
        if candidate.number.is_some() && other.number == candidate.number {
            bail!(
                "unique constraint failed: teams.number = {}",
                candidate.number.unwrap_or_default()
            );
        }
        if let (Some(a), Some(b)) = (&candidate.name, &other.name) {
            if same_name(a, b) {
                bail!("unique constraint failed: teams.name = {}", a);
            }
        }
    }
    Ok(())
}

impl Store for JsonStore {
    fn teams(&self) -> Result<Vec<Team>> {
        Ok(self.data.teams.clone())
    }

    fn team(&self, id: u64) -> Result<Option<Team>> {
        Ok(self.data.teams.iter().find(|t| t.id == id).cloned())
    }

    fn insert_team(&mut self, team: NewTeam, created_at: DateTime<Utc>) -> Result<Team> {
        self.transact(|data| {
            let team = Team {
                id: data.next_team_id,
                number: team.number,
                name: team.name,
                location: team.location,
                active: team.active,
                created_at,
            };
            check_unique(&data.teams, &team)?;
            data.next_team_id += 1;
            data.teams.push(team.clone());
            Ok(team)
        })
    }

    fn update_team(&mut self, team: &Team) -> Result<()> {
        self.transact(|data| {
            check_unique(&data.teams, team)?;
            let slot = data
                .teams
                .iter_mut()
                .find(|t| t.id == team.id)
                .with_context(|| format!("no team with id {}", team.id))?;
            *slot = team.clone();
            Ok(())
        })
    }

    fn delete_team(&mut self, id: u64) -> Result<bool> {
        self.transact(|data| {
            if data.evaluations.iter().any(|e| e.team_id == id) {
                bail!("foreign key constraint failed: evaluations reference team {}", id);
            }
            let before = data.teams.len();
            data.teams.retain(|t| t.id != id);
            Ok(data.teams.len() != before)
        })
    }

    fn evaluations(&self) -> Result<Vec<Evaluation>> {
        let mut scores: HashMap<u64, ScoreSet> = HashMap::new();
        for row in &self.data.evaluation_scores {
            scores
                .entry(row.evaluation_id)
                .or_default()
                .insert(row.field.clone(), row.value);
        }

        Ok(self
            .data
            .evaluations
            .iter()
            .map(|record| Evaluation {
                id: record.id,
                participant_name: record.participant_name.clone(),
                team_id: record.team_id,
                scores: scores.remove(&record.id).unwrap_or_default(),
                comments: record.comments.clone(),
                created_at: record.created_at,
                updated_at: record.updated_at,
            })
            .collect())
    }

    fn count_evaluations_for_team(&self, team_id: u64) -> Result<usize> {
        Ok(self
            .data
            .evaluations
            .iter()
            .filter(|e| e.team_id == team_id)
            .count())
    }

    fn insert_evaluation(&mut self, header: NewEvaluation) -> Result<u64> {
        self.transact(|data| {
            if !data.teams.iter().any(|t| t.id == header.team_id) {
                bail!(
                    "foreign key constraint failed: no team with id {}",
                    header.team_id
                );
            }
            let id = data.next_evaluation_id;
            data.next_evaluation_id += 1;
            data.evaluations.push(EvaluationRecord {
                id,
                participant_name: header.participant_name,
                team_id: header.team_id,
                comments: header.comments,
                created_at: header.created_at,
                updated_at: header.created_at,
            });
            Ok(id)
        })
    }

    fn insert_scores(&mut self, evaluation_id: u64, scores: &ScoreSet) -> Result<()> {
        self.transact(|data| {
            if !data.evaluations.iter().any(|e| e.id == evaluation_id) {
                bail!(
                    "foreign key constraint failed: no evaluation with id {}",
                    evaluation_id
                );
            }
            if data
                .evaluation_scores
                .iter()
                .any(|r| r.evaluation_id == evaluation_id)
            {
                bail!("evaluation {} already has scores", evaluation_id);
            }
            data.evaluation_scores
                .extend(scores.iter().map(|(field, value)| ScoreRow {
                    evaluation_id,
                    field: field.clone(),
                    value: *value,
                }));
            Ok(())
        })
    }

    fn replace_scores(
        &mut self,
        evaluation_id: u64,
        scores: &ScoreSet,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        self.transact(|data| {
            let record = data
                .evaluations
                .iter_mut()
                .find(|e| e.id == evaluation_id)
                .with_context(|| format!("no evaluation with id {}", evaluation_id))?;
            record.updated_at = updated_at;
            data.evaluation_scores
                .retain(|r| r.evaluation_id != evaluation_id);
            data.evaluation_scores
                .extend(scores.iter().map(|(field, value)| ScoreRow {
                    evaluation_id,
                    field: field.clone(),
                    value: *value,
                }));
            Ok(())
        })
    }

    fn delete_evaluation(&mut self, id: u64) -> Result<bool> {
        self.transact(|data| {
            let before = data.evaluations.len();
            data.evaluations.retain(|e| e.id != id);
            data.evaluation_scores.retain(|r| r.evaluation_id != id);
            Ok(data.evaluations.len() != before)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn new_team(number: Option<u32>, name: Option<&str>) -> NewTeam {
        NewTeam {
            number,
            name: name.map(str::to_string),
            location: None,
            active: true,
        }
    }

    fn header(team_id: u64) -> NewEvaluation {
        NewEvaluation {
            participant_name: "Judge Judy".to_string(),
            team_id,
            comments: None,
            created_at: Utc::now(),
        }
    }

    fn scores(pairs: &[(&str, i64)]) -> ScoreSet {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_load_missing_file_returns_none() {
        let temp_path = env::temp_dir().join("judge_tally_test_missing.json");
        let _ = fs::remove_file(&temp_path);

        assert!(load_store_data(&temp_path).unwrap().is_none());
    }

    #[test]
    fn test_open_missing_file_starts_empty() {
        let temp_path = env::temp_dir().join("judge_tally_test_open_missing.json");
        let _ = fs::remove_file(&temp_path);

        let store = JsonStore::open(&temp_path, "likert5").unwrap();
        assert!(store.teams().unwrap().is_empty());
        assert!(!temp_path.exists());
    }

    #[test]
    fn test_save_and_reopen_roundtrip() {
        let temp_path = env::temp_dir().join("judge_tally_test_roundtrip.json");
        let _ = fs::remove_file(&temp_path);

        let mut store = JsonStore::open(&temp_path, "likert5").unwrap();
        let team = store.insert_team(new_team(Some(1), Some("Alpha")), Utc::now()).unwrap();
        let id = store.insert_evaluation(header(team.id)).unwrap();
        store.insert_scores(id, &scores(&[("a", 3), ("b", 1)])).unwrap();

        let reopened = JsonStore::open(&temp_path, "likert5").unwrap();
        assert_eq!(reopened.teams().unwrap(), vec![team]);
        let evaluations = reopened.evaluations().unwrap();
        assert_eq!(evaluations.len(), 1);
        assert_eq!(evaluations[0].scores, scores(&[("a", 3), ("b", 1)]));

        let _ = fs::remove_file(&temp_path);
    }

    #[test]
    fn test_open_with_other_model_refused() {
        let temp_path = env::temp_dir().join("judge_tally_test_model_mismatch.json");
        let _ = fs::remove_file(&temp_path);

        let mut store = JsonStore::open(&temp_path, "likert5").unwrap();
        store.insert_team(new_team(Some(1), None), Utc::now()).unwrap();

        let err = JsonStore::open(&temp_path, "ai_tools").unwrap_err();
        assert!(err.to_string().contains("'likert5'"));

        let _ = fs::remove_file(&temp_path);
    }

    #[test]
    fn test_unsupported_version_refused() {
        let temp_path = env::temp_dir().join("judge_tally_test_version.json");
        let mut data = StoreData::new("likert5");
        data.version = 99;
        save_store_data(&temp_path, &data).unwrap();

        let err = load_store_data(&temp_path).unwrap_err();
        assert!(err.to_string().contains("99"));

        let _ = fs::remove_file(&temp_path);
    }

    #[test]
    fn test_ids_are_sequential_and_never_reused() {
        let mut store = JsonStore::in_memory("likert5");
        let a = store.insert_team(new_team(Some(1), None), Utc::now()).unwrap();
        let b = store.insert_team(new_team(Some(2), None), Utc::now()).unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert!(store.delete_team(b.id).unwrap());
        let c = store.insert_team(new_team(Some(3), None), Utc::now()).unwrap();
        assert_eq!(c.id, 3);
    }

    #[test]
    fn test_unique_constraints_enforced() {
        let mut store = JsonStore::in_memory("likert5");
        store.insert_team(new_team(Some(1), Some("Alpha")), Utc::now()).unwrap();
        assert!(store.insert_team(new_team(Some(1), None), Utc::now()).is_err());
        assert!(store.insert_team(new_team(None, Some("ALPHA")), Utc::now()).is_err());
        assert_eq!(store.teams().unwrap().len(), 1);

        store.insert_team(new_team(None, Some("équipe")), Utc::now()).unwrap();
        assert!(store.insert_team(new_team(None, Some("ÉQUIPE")), Utc::now()).is_err());
        assert_eq!(store.teams().unwrap().len(), 2);
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let mut store = JsonStore::in_memory("likert5");
        assert!(store.insert_evaluation(header(42)).is_err());
        assert!(store.insert_scores(42, &scores(&[("a", 1)])).is_err());

        let team = store.insert_team(new_team(Some(1), None), Utc::now()).unwrap();
        store.insert_evaluation(header(team.id)).unwrap();
        assert!(store.delete_team(team.id).is_err());
        assert_eq!(store.teams().unwrap().len(), 1);
    }

    #[test]
    fn test_delete_evaluation_removes_score_rows() {
        let mut store = JsonStore::in_memory("likert5");
        let team = store.insert_team(new_team(Some(1), None), Utc::now()).unwrap();
        let id = store.insert_evaluation(header(team.id)).unwrap();
        store.insert_scores(id, &scores(&[("a", 1)])).unwrap();

        assert!(store.delete_evaluation(id).unwrap());
        assert!(store.data().evaluation_scores.is_empty());
        assert!(!store.delete_evaluation(id).unwrap());
        assert!(store.delete_team(team.id).unwrap());
    }

    #[test]
    fn test_replace_scores_bumps_updated_at() {
        let mut store = JsonStore::in_memory("likert5");
        let team = store.insert_team(new_team(Some(1), None), Utc::now()).unwrap();
        let id = store.insert_evaluation(header(team.id)).unwrap();
        store.insert_scores(id, &scores(&[("a", 1)])).unwrap();
        let created = store.evaluation(id).unwrap().unwrap().created_at;

        let later = created + chrono::Duration::minutes(5);
        store.replace_scores(id, &scores(&[("a", 4)]), later).unwrap();

        let evaluation = store.evaluation(id).unwrap().unwrap();
        assert_eq!(evaluation.scores, scores(&[("a", 4)]));
        assert_eq!(evaluation.created_at, created);
        assert_eq!(evaluation.updated_at, later);
    }

    #[test]
    fn test_two_handles_on_one_file_keep_both_writes() {
        let temp_path = env::temp_dir().join("judge_tally_test_two_handles.json");
        let _ = fs::remove_file(&temp_path);

        let mut a = JsonStore::open(&temp_path, "likert5").unwrap();
        let mut b = JsonStore::open(&temp_path, "likert5").unwrap();
        let first = a.insert_team(new_team(Some(1), None), Utc::now()).unwrap();
        let second = b.insert_team(new_team(Some(2), None), Utc::now()).unwrap();
        assert_eq!((first.id, second.id), (1, 2));

        // Stale handle still sees team 1 and refuses to duplicate it.
        assert!(a.insert_team(new_team(Some(2), None), Utc::now()).is_err());

        let on_disk = load_store_data(&temp_path).unwrap().unwrap();
        let numbers: Vec<_> = on_disk.teams.iter().map(|t| (t.id, t.number)).collect();
        assert_eq!(numbers, vec![(1, Some(1)), (2, Some(2))]);

        let _ = fs::remove_file(&temp_path);
        let _ = fs::remove_file(lock_path(&temp_path));
    }

    #[test]
    fn test_stale_handle_cannot_orphan_evaluation() {
        let temp_path = env::temp_dir().join("judge_tally_test_stale_fk.json");
        let _ = fs::remove_file(&temp_path);

        let mut admin = JsonStore::open(&temp_path, "likert5").unwrap();
        let team = admin.insert_team(new_team(Some(1), None), Utc::now()).unwrap();
        let mut judge = JsonStore::open(&temp_path, "likert5").unwrap();

        assert!(admin.delete_team(team.id).unwrap());
        assert!(judge.insert_evaluation(header(team.id)).is_err());

        let on_disk = load_store_data(&temp_path).unwrap().unwrap();
        assert!(on_disk.teams.is_empty());
        assert!(on_disk.evaluations.is_empty());

        let _ = fs::remove_file(&temp_path);
        let _ = fs::remove_file(lock_path(&temp_path));
    }

    #[test]
    fn test_concurrent_writers_get_distinct_ids() {
        let temp_path = env::temp_dir().join("judge_tally_test_concurrent.json");
        let _ = fs::remove_file(&temp_path);

        let writers: Vec<_> = [0u32, 100]
            .into_iter()
            .map(|base| {
                let path = temp_path.clone();
                std::thread::spawn(move || {
                    let mut store = JsonStore::open(&path, "likert5").unwrap();
                    for n in 1..=10 {
                        store.insert_team(new_team(Some(base + n), None), Utc::now()).unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let on_disk = load_store_data(&temp_path).unwrap().unwrap();
        let mut ids: Vec<_> = on_disk.teams.iter().map(|t| t.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=20).collect::<Vec<u64>>());
        assert_eq!(on_disk.next_team_id, 21);

        let _ = fs::remove_file(&temp_path);
        let _ = fs::remove_file(lock_path(&temp_path));
    }

    #[test]
    fn test_failed_write_rolls_back_memory() {
        let blocker = env::temp_dir().join("judge_tally_test_blocker");
        let _ = fs::remove_dir_all(&blocker);
        fs::write(&blocker, b"not a directory").unwrap();

        // Parent "directory" is a file, so every save fails.
        let mut store = JsonStore::open(&blocker.join("tally.json"), "likert5").unwrap();
        assert!(store.insert_team(new_team(Some(1), None), Utc::now()).is_err());
        assert!(store.teams().unwrap().is_empty());
        assert_eq!(store.data().next_team_id, 1);

        let _ = fs::remove_file(&blocker);
    }
}
