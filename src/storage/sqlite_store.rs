// src/storage/sqlite_store.rs
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::core::{
    Correction, Essay, HumanFeedback, Provenance, TrainingCandidate, NUM_COMPETENCIES,
};
use crate::error::CorrectionError;
use crate::storage::CorrectionStore;

/// SQLite-backed store. Numeric score columns are duplicated out of the
/// JSON payload so training-set queries never have to parse JSON.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CorrectionError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, CorrectionError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, CorrectionError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS essays (
                id         TEXT PRIMARY KEY,
                title      TEXT,
                text       TEXT NOT NULL,
                prompt_id  INTEGER,
                author_id  TEXT,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS corrections (
                id                 TEXT PRIMARY KEY,
                essay_id           TEXT NOT NULL REFERENCES essays(id),
                c1 REAL NOT NULL, c2 REAL NOT NULL, c3 REAL NOT NULL,
                c4 REAL NOT NULL, c5 REAL NOT NULL,
                aggregate          REAL NOT NULL,
                confidence         REAL NOT NULL,
                confidence_tier    TEXT NOT NULL,
                retrain_eligible   INTEGER NOT NULL,
                needs_human_review INTEGER NOT NULL,
                model_version      TEXT NOT NULL,
                created_at         TEXT NOT NULL,
                payload            TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS human_feedback (
                id            TEXT PRIMARY KEY,
                correction_id TEXT NOT NULL REFERENCES corrections(id),
                reviewer_id   TEXT NOT NULL,
                c1 REAL NOT NULL, c2 REAL NOT NULL, c3 REAL NOT NULL,
                c4 REAL NOT NULL, c5 REAL NOT NULL,
                aggregate     REAL NOT NULL,
                comment       TEXT,
                created_at    TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_corrections_retrain
                ON corrections (retrain_eligible, confidence, created_at);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        // A poisoned lock means another thread panicked mid-statement;
        // the connection itself is still usable.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, CorrectionError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CorrectionError::Config(format!("bad stored timestamp {raw:?}: {e}")))
}

impl CorrectionStore for SqliteStore {
    fn put_essay(&self, essay: &Essay) -> Result<(), CorrectionError> {
        let conn = self.lock();
        conn.execute(
            "INSERT OR IGNORE INTO essays (id, title, text, prompt_id, author_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                essay.id,
                essay.title,
                essay.text,
                essay.prompt_id,
                essay.author_id,
                essay.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn essay(&self, id: &str) -> Result<Option<Essay>, CorrectionError> {
        let conn = self.lock();
        let row = conn
            .query_row(
                "SELECT id, title, text, prompt_id, author_id, created_at
                 FROM essays WHERE id = ?1",
                [id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<i64>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((id, title, text, prompt_id, author_id, created_at)) => Ok(Some(Essay {
                id,
                title,
                text,
                prompt_id,
                author_id,
                created_at: parse_timestamp(&created_at)?,
            })),
        }
    }

    fn put_correction(&self, correction: &Correction) -> Result<(), CorrectionError> {
        let payload = serde_json::to_string(correction)
            .map_err(|e| CorrectionError::Config(format!("correction serialization: {e}")))?;
        let c = &correction.competencies;
        let conn = self.lock();
        conn.execute(
            "INSERT INTO corrections
                (id, essay_id, c1, c2, c3, c4, c5, aggregate, confidence,
                 confidence_tier, retrain_eligible, needs_human_review,
                 model_version, created_at, payload)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                correction.id,
                correction.essay_id,
                c[0].value,
                c[1].value,
                c[2].value,
                c[3].value,
                c[4].value,
                correction.aggregate,
                correction.confidence,
                correction.confidence_tier.as_str(),
                correction.retrain_eligible,
                correction.needs_human_review,
                correction.model_version,
                correction.created_at.to_rfc3339(),
                payload,
            ],
        )?;
        debug!(correction_id = %correction.id, "correction persisted");
        Ok(())
    }

    fn correction(&self, id: &str) -> Result<Option<Correction>, CorrectionError> {
        let conn = self.lock();
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM corrections WHERE id = ?1",
                [id],
                |row| row.get(0),
            )
            .optional()?;
        match payload {
            None => Ok(None),
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| CorrectionError::Config(format!("correction payload: {e}"))),
        }
    }

    fn put_human_feedback(&self, feedback: &HumanFeedback) -> Result<(), CorrectionError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO human_feedback
                (id, correction_id, reviewer_id, c1, c2, c3, c4, c5,
                 aggregate, comment, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                feedback.id,
                feedback.correction_id,
                feedback.reviewer_id,
                feedback.competencies[0],
                feedback.competencies[1],
                feedback.competencies[2],
                feedback.competencies[3],
                feedback.competencies[4],
                feedback.aggregate,
                feedback.comment,
                feedback.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn high_confidence_candidates(
        &self,
        min_confidence: f32,
        limit: usize,
    ) -> Result<Vec<TrainingCandidate>, CorrectionError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT e.text, c.c1, c.c2, c.c3, c.c4, c.c5, c.aggregate
             FROM corrections c JOIN essays e ON e.id = c.essay_id
             WHERE c.retrain_eligible = 1 AND c.confidence >= ?1
             ORDER BY c.created_at DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![min_confidence as f64, limit as i64], |row| {
            let mut competencies = [0.0f32; NUM_COMPETENCIES];
            for (i, slot) in competencies.iter_mut().enumerate() {
                *slot = row.get(1 + i)?;
            }
            Ok(TrainingCandidate {
                essay_text: row.get(0)?,
                competencies,
                aggregate: row.get(6)?,
                provenance: Provenance::HighConfidenceInference,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn human_feedback_candidates(
        &self,
        limit: usize,
    ) -> Result<Vec<TrainingCandidate>, CorrectionError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT e.text, h.c1, h.c2, h.c3, h.c4, h.c5, h.aggregate
             FROM human_feedback h
             JOIN corrections c ON c.id = h.correction_id
             JOIN essays e ON e.id = c.essay_id
             ORDER BY h.created_at DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            let mut competencies = [0.0f32; NUM_COMPETENCIES];
            for (i, slot) in competencies.iter_mut().enumerate() {
                *slot = row.get(1 + i)?;
            }
            Ok(TrainingCandidate {
                essay_text: row.get(0)?,
                competencies,
                aggregate: row.get(6)?,
                provenance: Provenance::HumanFeedback,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        CompetencyScore, ConfidenceTier, StructuralProfile, UncertaintyEstimate,
    };

    fn correction_for(essay: &Essay, confidence: f32, retrain: bool) -> Correction {
        Correction {
            id: uuid::Uuid::new_v4().to_string(),
            essay_id: essay.id.clone(),
            aggregate: 820.0,
            competencies: (1..=5)
                .map(|i| CompetencyScore {
                    index: i,
                    value: 160.0,
                    feedback: String::new(),
                    strengths: Vec::new(),
                    improvements: Vec::new(),
                    highlights: Vec::new(),
                })
                .collect(),
            uncertainty: UncertaintyEstimate {
                competency_std: [4.0; NUM_COMPETENCIES],
                aggregate_std: 12.0,
            },
            confidence,
            confidence_tier: ConfidenceTier::High,
            findings: Vec::new(),
            orthography_errors: 0,
            grammar_errors: 0,
            structure: StructuralProfile {
                has_intro: true,
                has_development: true,
                has_conclusion: true,
                paragraph_count: 4,
                connective_usage: crate::core::ConnectiveUsage::Adequate,
                cohesion: 0.8,
                coherence: 0.7,
            },
            overall_feedback: String::new(),
            summary: String::new(),
            explanation: None,
            analysis_degraded: false,
            model_version: "v1.0.0".to_string(),
            latency_ms: 42,
            created_at: Utc::now(),
            retrain_eligible: retrain,
            needs_human_review: false,
        }
    }

    #[test]
    fn correction_round_trips_through_payload() {
        let store = SqliteStore::open_in_memory().unwrap();
        let essay = Essay::new("A educação transforma a sociedade.");
        store.put_essay(&essay).unwrap();

        let correction = correction_for(&essay, 0.91, true);
        store.put_correction(&correction).unwrap();

        let loaded = store.correction(&correction.id).unwrap().unwrap();
        assert_eq!(loaded.essay_id, essay.id);
        assert_eq!(loaded.aggregate, 820.0);
        assert_eq!(loaded.confidence_tier, ConfidenceTier::High);
    }

    #[test]
    fn high_confidence_query_filters_and_limits() {
        let store = SqliteStore::open_in_memory().unwrap();
        for i in 0..5 {
            let essay = Essay::new(format!("Redação número {i}."));
            store.put_essay(&essay).unwrap();
            let confident = i % 2 == 0;
            let correction =
                correction_for(&essay, if confident { 0.9 } else { 0.5 }, confident);
            store.put_correction(&correction).unwrap();
        }

        let candidates = store.high_confidence_candidates(0.85, 10).unwrap();
        assert_eq!(candidates.len(), 3);
        assert!(candidates
            .iter()
            .all(|c| c.provenance == Provenance::HighConfidenceInference));

        let capped = store.high_confidence_candidates(0.85, 2).unwrap();
        assert_eq!(capped.len(), 2);
    }

    #[test]
    fn corrupt_stored_timestamp_surfaces_as_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        {
            let conn = store.lock();
            conn.execute(
                "INSERT INTO essays (id, text, created_at) VALUES ('e1', 'texto', 'not-a-date')",
                [],
            )
            .unwrap();
        }

        let err = store.essay("e1").unwrap_err();
        assert!(matches!(err, CorrectionError::Config(_)));
    }

    #[test]
    fn human_feedback_joins_back_to_essay_text() {
        let store = SqliteStore::open_in_memory().unwrap();
        let essay = Essay::new("Texto corrigido por um professor.");
        store.put_essay(&essay).unwrap();
        let correction = correction_for(&essay, 0.6, false);
        store.put_correction(&correction).unwrap();

        let feedback =
            HumanFeedback::new(&correction.id, "prof-1", [120.0, 140.0, 160.0, 100.0, 180.0], 700.0);
        store.put_human_feedback(&feedback).unwrap();

        let candidates = store.human_feedback_candidates(10).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].essay_text, essay.text);
        assert_eq!(candidates[0].aggregate, 700.0);
        assert_eq!(candidates[0].provenance, Provenance::HumanFeedback);
    }
}
