//! Match scoring workflows.
//!
//! A (resume, job) pair is scored once. Asking again for a single pair is a
//! Conflict naming the existing row; the batch variant reuses existing rows.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use super::queries;
use crate::errors::AppError;
use crate::intelligence::{job_text, DocumentIntelligence, MatchAssessment};
use crate::jobs::queries::find_job;
use crate::models::job::JobRow;
use crate::models::matching::MatchRow;
use crate::models::resume::ResumeRow;
use crate::resumes::queries::find_resume;

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub resume_id: i64,
    pub job_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct BatchMatchRequest {
    pub job_id: i64,
    pub resume_ids: Vec<i64>,
}

fn job_description(job: &JobRow) -> String {
    job_text(
        Some(&job.position_name),
        Some(&job.responsibilities),
        Some(&job.requirements),
    )
}

async fn score(provider: &dyn DocumentIntelligence, resume: &ResumeRow, job_description: &str) -> MatchAssessment {
    provider
        .match_resume_to_job(resume.searchable_text(), job_description)
        .await
}

async fn require_job(db: &SqlitePool, job_id: i64) -> Result<JobRow, AppError> {
    find_job(db, job_id)
        .await?
        .ok_or_else(|| AppError::not_found("Job", job_id))
}

fn duplicate(existing: &MatchRow) -> AppError {
    AppError::conflict(
        format!(
            "Resume {} is already matched to job {}",
            existing.resume_id, existing.job_id
        ),
        Some(existing.id),
    )
}

pub async fn compute_match(
    db: &SqlitePool,
    provider: &dyn DocumentIntelligence,
    req: MatchRequest,
) -> Result<MatchRow, AppError> {
    let resume = find_resume(db, req.resume_id)
        .await?
        .ok_or_else(|| AppError::not_found("Resume", req.resume_id))?;
    let job = require_job(db, req.job_id).await?;

    if let Some(existing) = queries::find_pair(db, resume.id, job.id).await? {
        return Err(duplicate(&existing));
    }

    let assessment = score(provider, &resume, &job_description(&job)).await;

    match queries::insert_match(db, resume.id, job.id, &assessment).await? {
        Some(row) => {
            info!(
                "Matched resume {} to job {}: {:.1}",
                row.resume_id, row.job_id, row.match_score
            );
            Ok(row)
        }
        // Another request stored the pair while this one was scoring.
        None => match queries::find_pair(db, resume.id, job.id).await? {
            Some(existing) => Err(duplicate(&existing)),
            None => Err(AppError::Internal(anyhow::anyhow!(
                "Match for resume {} and job {} vanished after insert conflict",
                resume.id,
                job.id
            ))),
        },
    }
}

/// Scores every listed resume against one job, in request order.
/// Unknown resume ids are skipped; already-matched pairs are returned as stored.
pub async fn compute_batch(
    db: &SqlitePool,
    provider: &dyn DocumentIntelligence,
    req: BatchMatchRequest,
) -> Result<Vec<MatchRow>, AppError> {
    let job = require_job(db, req.job_id).await?;
    let description = job_description(&job);

    let mut seen = HashSet::new();
    let resume_ids: Vec<i64> = req.resume_ids.into_iter().filter(|id| seen.insert(*id)).collect();

    let mut ready: HashMap<i64, MatchRow> = HashMap::new();
    let mut scored: Vec<(i64, MatchAssessment)> = Vec::new();
    for &resume_id in &resume_ids {
        let Some(resume) = find_resume(db, resume_id).await? else {
            warn!("Batch match for job {}: resume {resume_id} not found, skipping", job.id);
            continue;
        };
        if let Some(existing) = queries::find_pair(db, resume_id, job.id).await? {
            ready.insert(resume_id, existing);
            continue;
        }
        scored.push((resume_id, score(provider, &resume, &description).await));
    }

    let mut tx = db.begin().await?;
    for (resume_id, assessment) in &scored {
        let row = match queries::insert_match(&mut *tx, *resume_id, job.id, assessment).await? {
            Some(row) => row,
            None => queries::find_pair(&mut *tx, *resume_id, job.id)
                .await?
                .ok_or(sqlx::Error::RowNotFound)?,
        };
        ready.insert(*resume_id, row);
    }
    tx.commit().await?;

    info!(
        "Batch match for job {}: {} new, {} returned",
        job.id,
        scored.len(),
        ready.len()
    );
    Ok(resume_ids.iter().filter_map(|id| ready.remove(id)).collect())
}

pub async fn delete_match(db: &SqlitePool, id: i64) -> Result<(), AppError> {
    if !queries::delete_match(db, id).await? {
        return Err(AppError::not_found("Match", id));
    }
    info!("Deleted match {id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::intelligence::{OfflineIntelligence, TagLimits};
    use crate::jobs::ingest::{self as jobs, CreateJobRequest};
    use crate::resumes::ingest::{self as resumes, CreateResumeRequest};

    fn offline() -> OfflineIntelligence {
        OfflineIntelligence::new(TagLimits::default())
    }

    async fn seed_job(db: &SqlitePool, requirements: &str) -> JobRow {
        jobs::create_job(
            db,
            &offline(),
            CreateJobRequest {
                position_name: "Backend Engineer".to_string(),
                department: None,
                responsibilities: "Own the API layer".to_string(),
                requirements: requirements.to_string(),
                salary_range: None,
                location: None,
            },
        )
        .await
        .unwrap()
    }

    async fn seed_resume(db: &SqlitePool, name: &str, text: &str) -> i64 {
        resumes::create_resume(
            db,
            CreateResumeRequest {
                candidate_name: name.to_string(),
                file_url: format!("/uploads/resumes/{name}.txt"),
                file_type: "text/plain".to_string(),
                ocr_content: Some(text.to_string()),
                parsed_content: None,
                talent_portrait: None,
                tags: Vec::new(),
            },
        )
        .await
        .unwrap()
        .resume
        .id
    }

    #[tokio::test]
    async fn test_python_resume_scores_above_zero() {
        let db = test_pool().await;
        let job = seed_job(&db, "Python").await;
        let resume_id = seed_resume(&db, "ada", "Python, FastAPI").await;

        let row = compute_match(&db, &offline(), MatchRequest { resume_id, job_id: job.id })
            .await
            .unwrap();
        assert!(row.match_score > 0.0);
        assert!(row.match_explanation.is_some());
    }

    #[tokio::test]
    async fn test_second_match_is_conflict_with_existing_id() {
        let db = test_pool().await;
        let job = seed_job(&db, "Python, SQL").await;
        let resume_id = seed_resume(&db, "ada", "Python, FastAPI").await;

        let first = compute_match(&db, &offline(), MatchRequest { resume_id, job_id: job.id })
            .await
            .unwrap();
        let err = compute_match(&db, &offline(), MatchRequest { resume_id, job_id: job.id })
            .await
            .unwrap_err();
        match err {
            AppError::Conflict { existing_id, .. } => assert_eq!(existing_id, Some(first.id)),
            other => panic!("expected conflict, got {other:?}"),
        }

        let stored = queries::find_match(&db, first.id).await.unwrap().unwrap();
        assert_eq!(stored, first);
        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM matches")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_missing_resume_or_job_is_not_found() {
        let db = test_pool().await;
        let job = seed_job(&db, "Python").await;
        let resume_id = seed_resume(&db, "ada", "Python").await;

        let missing_resume =
            compute_match(&db, &offline(), MatchRequest { resume_id: 999, job_id: job.id }).await;
        assert!(matches!(missing_resume, Err(AppError::NotFound(_))));
        let missing_job = compute_match(&db, &offline(), MatchRequest { resume_id, job_id: 999 }).await;
        assert!(matches!(missing_job, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_batch_skips_missing_and_reuses_existing() {
        let db = test_pool().await;
        let job = seed_job(&db, "Python, SQL").await;
        let first = seed_resume(&db, "ada", "Python and SQL").await;
        let second = seed_resume(&db, "grace", "COBOL").await;

        let existing = compute_match(&db, &offline(), MatchRequest { resume_id: second, job_id: job.id })
            .await
            .unwrap();

        let rows = compute_batch(
            &db,
            &offline(),
            BatchMatchRequest {
                job_id: job.id,
                resume_ids: vec![first, second, 999, first],
            },
        )
        .await
        .unwrap();

        let ids: Vec<i64> = rows.iter().map(|m| m.resume_id).collect();
        assert_eq!(ids, vec![first, second]);
        assert_eq!(rows[0].match_score, 100.0);
        assert_eq!(rows[1], existing);
    }

    #[tokio::test]
    async fn test_batch_for_missing_job_is_not_found() {
        let db = test_pool().await;
        let resume_id = seed_resume(&db, "ada", "Python").await;
        let result = compute_batch(
            &db,
            &offline(),
            BatchMatchRequest {
                job_id: 42,
                resume_ids: vec![resume_id],
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_matched_job_and_resume_cannot_be_deleted() {
        let db = test_pool().await;
        let job = seed_job(&db, "Python").await;
        let resume_id = seed_resume(&db, "ada", "Python").await;
        let row = compute_match(&db, &offline(), MatchRequest { resume_id, job_id: job.id })
            .await
            .unwrap();

        assert!(matches!(
            jobs::delete_job(&db, job.id).await,
            Err(AppError::Conflict { .. })
        ));
        assert!(matches!(
            resumes::delete_resume(&db, resume_id).await,
            Err(AppError::Conflict { .. })
        ));

        delete_match(&db, row.id).await.unwrap();
        assert!(matches!(delete_match(&db, row.id).await, Err(AppError::NotFound(_))));
        resumes::delete_resume(&db, resume_id).await.unwrap();
        jobs::delete_job(&db, job.id).await.unwrap();
    }
}
