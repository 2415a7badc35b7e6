//! Resume workflows.
//!
//! Upload: store file -> read back -> extract text -> parse -> portrait -> tags
//! -> one transaction for the resume row and all tag links. If anything after
//! the file store fails, the stored file is removed again.

use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use super::queries::{self, NewResume, ResumeChanges};
use super::tags::attach_tags;
use crate::errors::AppError;
use crate::intelligence::DocumentIntelligence;
use crate::models::next_timestamp;
use crate::models::resume::ResumeDetail;
use crate::routes::params::non_blank;
use crate::storage::extract::extract_text;
use crate::storage::{FileStore, StoredFile, Upload};

pub const RESUME_FOLDER: &str = "resumes";
pub const UNKNOWN_CANDIDATE: &str = "Unknown candidate";

#[derive(Debug, Deserialize)]
pub struct CreateResumeRequest {
    pub candidate_name: String,
    pub file_url: String,
    pub file_type: String,
    pub ocr_content: Option<String>,
    pub parsed_content: Option<String>,
    pub talent_portrait: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update: only supplied fields change. `tags`, when supplied, replaces all links.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateResumeRequest {
    pub candidate_name: Option<String>,
    pub ocr_content: Option<String>,
    pub parsed_content: Option<String>,
    pub talent_portrait: Option<String>,
    pub tags: Option<Vec<String>>,
}

pub async fn load_detail(db: &SqlitePool, id: i64) -> Result<ResumeDetail, AppError> {
    let resume = queries::find_resume(db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Resume", id))?;
    let tags = queries::tags_for_resume(db, id).await?;
    Ok(ResumeDetail { resume, tags })
}

async fn persist(db: &SqlitePool, new: &NewResume, tag_names: &[String]) -> Result<ResumeDetail, AppError> {
    let mut tx = db.begin().await?;
    let resume = queries::insert_resume(&mut tx, new).await?;
    let tags = attach_tags(&mut tx, resume.id, tag_names).await?;
    tx.commit().await?;
    Ok(ResumeDetail { resume, tags })
}

/// Stores a resume from caller-supplied fields. No provider calls.
pub async fn create_resume(db: &SqlitePool, req: CreateResumeRequest) -> Result<ResumeDetail, AppError> {
    let candidate_name = non_blank(Some(&req.candidate_name))
        .ok_or_else(|| AppError::Validation("candidate_name must not be empty".to_string()))?;
    let file_url = non_blank(Some(&req.file_url))
        .ok_or_else(|| AppError::Validation("file_url must not be empty".to_string()))?;
    let file_type = non_blank(Some(&req.file_type))
        .ok_or_else(|| AppError::Validation("file_type must not be empty".to_string()))?;

    let new = NewResume {
        candidate_name: candidate_name.to_string(),
        file_url: file_url.to_string(),
        file_type: file_type.to_string(),
        ocr_content: req.ocr_content,
        parsed_content: req.parsed_content,
        talent_portrait: req.talent_portrait,
    };
    let detail = persist(db, &new, &req.tags).await?;
    info!("Created resume {} with {} tag(s)", detail.resume.id, detail.tags.len());
    Ok(detail)
}

/// Full upload workflow. `candidate_name` wins over the parsed name.
pub async fn ingest_resume_upload(
    db: &SqlitePool,
    provider: &dyn DocumentIntelligence,
    files: &dyn FileStore,
    upload: Upload,
    candidate_name: Option<String>,
) -> Result<ResumeDetail, AppError> {
    let stored = files.store(&upload, RESUME_FOLDER).await?;
    info!("Stored resume upload {} at {}", upload.file_name, stored.url);

    match enrich_and_persist(db, provider, files, &upload, &stored, candidate_name).await {
        Ok(detail) => Ok(detail),
        Err(e) => {
            warn!("Resume ingest failed after storing {}, removing it: {e}", stored.url);
            if !files.delete(&stored.url).await {
                warn!("Stored file {} could not be removed", stored.url);
            }
            Err(e)
        }
    }
}

async fn enrich_and_persist(
    db: &SqlitePool,
    provider: &dyn DocumentIntelligence,
    files: &dyn FileStore,
    upload: &Upload,
    stored: &StoredFile,
    candidate_name: Option<String>,
) -> Result<ResumeDetail, AppError> {
    let bytes = files.read(&stored.url).await?;
    let text = extract_text(bytes, &stored.file_type, &upload.file_name).await;
    if text.is_empty() {
        warn!("No text extracted from {}", upload.file_name);
    }

    let parsed = provider.parse_resume(&text).await;
    let portrait = provider.generate_talent_portrait(&parsed).await;
    let tag_names = provider.generate_resume_tags(&text).await;

    let name = non_blank(candidate_name.as_deref())
        .map(str::to_string)
        .or_else(|| parsed.name.clone())
        .unwrap_or_else(|| UNKNOWN_CANDIDATE.to_string());
    let parsed_content = serde_json::to_string(&parsed)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode parsed resume: {e}")))?;

    let new = NewResume {
        candidate_name: name,
        file_url: stored.url.clone(),
        file_type: stored.file_type.clone(),
        ocr_content: Some(text),
        parsed_content: Some(parsed_content),
        talent_portrait: Some(portrait).filter(|p| !p.is_empty()),
    };
    let detail = persist(db, &new, &tag_names).await?;
    info!(
        "Ingested resume {} ({}) with {} tag(s)",
        detail.resume.id,
        detail.resume.candidate_name,
        detail.tags.len()
    );
    Ok(detail)
}

pub async fn update_resume(db: &SqlitePool, id: i64, req: UpdateResumeRequest) -> Result<ResumeDetail, AppError> {
    let candidate_name = match &req.candidate_name {
        Some(name) => Some(
            non_blank(Some(name))
                .ok_or_else(|| AppError::Validation("candidate_name must not be empty".to_string()))?
                .to_string(),
        ),
        None => None,
    };
    let changes = ResumeChanges {
        candidate_name,
        ocr_content: req.ocr_content,
        parsed_content: req.parsed_content,
        talent_portrait: req.talent_portrait,
    };

    // The first statement must write: a transaction that reads first cannot
    // take the write lock while another connection holds it.
    let mut tx = db.begin().await?;
    let resume = queries::apply_resume_changes(&mut *tx, id, &changes)
        .await?
        .ok_or_else(|| AppError::not_found("Resume", id))?;
    let resume = queries::set_resume_updated_at(&mut *tx, id, next_timestamp(resume.updated_at)).await?;
    if let Some(names) = &req.tags {
        queries::unlink_tags(&mut *tx, id).await?;
        attach_tags(&mut tx, id, names).await?;
    }
    let tags = queries::tags_for_resume(&mut *tx, id).await?;
    tx.commit().await?;

    info!("Updated resume {id}");
    Ok(ResumeDetail { resume, tags })
}

/// Refused with Conflict while matches reference the resume. The stored file is kept.
pub async fn delete_resume(db: &SqlitePool, id: i64) -> Result<(), AppError> {
    if queries::delete_unmatched_resume(db, id).await? {
        info!("Deleted resume {id}");
        return Ok(());
    }

    if queries::find_resume(db, id).await?.is_none() {
        return Err(AppError::not_found("Resume", id));
    }
    let matches = queries::count_matches(db, id).await?;
    Err(AppError::conflict(
        format!("Resume {id} is referenced by {matches} match(es)"),
        None,
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use bytes::Bytes;

    use super::*;
    use crate::db::{file_pool, test_pool};
    use crate::intelligence::{OfflineIntelligence, TagLimits};
    use crate::routes::params::Page;
    use crate::storage::{LocalFileStore, StorageError};

    const RESUME_TEXT: &str =
        "Name: Ada Lovelace\nEducation: Master\nSkills: Python, FastAPI, SQL\nExperience: 5 years";

    fn text_upload(content: &'static str) -> Upload {
        Upload {
            file_name: "ada.txt".to_string(),
            content_type: Some("text/plain".to_string()),
            bytes: Bytes::from_static(content.as_bytes()),
        }
    }

    fn offline() -> OfflineIntelligence {
        OfflineIntelligence::new(TagLimits::default())
    }

    fn direct(candidate_name: &str) -> CreateResumeRequest {
        CreateResumeRequest {
            candidate_name: candidate_name.to_string(),
            file_url: "/uploads/resumes/direct.pdf".to_string(),
            file_type: "application/pdf".to_string(),
            ocr_content: None,
            parsed_content: None,
            talent_portrait: None,
            tags: Vec::new(),
        }
    }

    async fn count(db: &SqlitePool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_workflow_persists_resume_and_tags() {
        let db = test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        let files = LocalFileStore::new(dir.path()).await.unwrap();

        let detail = ingest_resume_upload(&db, &offline(), &files, text_upload(RESUME_TEXT), None)
            .await
            .unwrap();

        assert_eq!(detail.resume.candidate_name, "Ada Lovelace");
        assert_eq!(detail.resume.ocr_content.as_deref(), Some(RESUME_TEXT));
        assert!(detail.resume.file_url.starts_with("/uploads/resumes/"));
        assert!(detail.resume.talent_portrait.as_deref().unwrap().starts_with("Ada Lovelace"));
        let names: Vec<&str> = detail.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Python", "SQL", "FastAPI"]);

        let reloaded = load_detail(&db, detail.resume.id).await.unwrap();
        assert_eq!(reloaded.tags, detail.tags);
        let parsed: serde_json::Value =
            serde_json::from_str(reloaded.resume.parsed_content.as_deref().unwrap()).unwrap();
        assert_eq!(parsed["name"], "Ada Lovelace");
    }

    #[tokio::test]
    async fn test_supplied_name_wins_and_unknown_fallback() {
        let db = test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        let files = LocalFileStore::new(dir.path()).await.unwrap();

        let named = ingest_resume_upload(
            &db,
            &offline(),
            &files,
            text_upload(RESUME_TEXT),
            Some("A. Lovelace".to_string()),
        )
        .await
        .unwrap();
        assert_eq!(named.resume.candidate_name, "A. Lovelace");

        let anonymous =
            ingest_resume_upload(&db, &offline(), &files, text_upload("Rust and Kafka"), None)
                .await
                .unwrap();
        assert_eq!(anonymous.resume.candidate_name, UNKNOWN_CANDIDATE);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_ingests_share_one_tag_row() {
        let dir = tempfile::tempdir().unwrap();
        let db = file_pool(dir.path()).await;
        let files = Arc::new(LocalFileStore::new(dir.path().join("uploads")).await.unwrap());
        let provider = Arc::new(offline());

        let texts = ["Skills: Kubernetes", "Kubernetes operator"];
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let (db, files, provider) = (db.clone(), files.clone(), provider.clone());
                let upload = text_upload(texts[i % 2]);
                tokio::spawn(async move {
                    ingest_resume_upload(&db, provider.as_ref(), files.as_ref(), upload, None).await
                })
            })
            .collect();

        let mut tag_ids = Vec::new();
        for handle in handles {
            let detail = handle.await.unwrap().unwrap();
            let kubernetes = detail.tags.iter().find(|t| t.name == "Kubernetes").unwrap();
            tag_ids.push(kubernetes.id);
        }
        assert!(tag_ids.iter().all(|id| *id == tag_ids[0]));

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags WHERE name = 'Kubernetes'")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(rows, 1);
        assert_eq!(count(&db, "resumes").await, 8);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_and_deletes_on_distinct_rows() {
        let dir = tempfile::tempdir().unwrap();
        let db = file_pool(dir.path()).await;
        let mut ids = Vec::new();
        for i in 0..16 {
            ids.push(create_resume(&db, direct(&format!("Candidate {i}"))).await.unwrap().resume.id);
        }

        let handles: Vec<_> = ids
            .iter()
            .copied()
            .enumerate()
            .map(|(i, id)| {
                let db = db.clone();
                tokio::spawn(async move {
                    if i % 2 == 0 {
                        let req = UpdateResumeRequest {
                            talent_portrait: Some(format!("Portrait {i}")),
                            tags: Some(vec!["Go".to_string(), format!("Skill {i}")]),
                            ..Default::default()
                        };
                        update_resume(&db, id, req).await.map(|_| ())
                    } else {
                        delete_resume(&db, id).await
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(count(&db, "resumes").await, 8);
        let go_links: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM resume_tags rt JOIN tags t ON t.id = rt.tag_id WHERE t.name = 'Go'",
        )
        .fetch_one(&db)
        .await
        .unwrap();
        assert_eq!(go_links, 8);
        let portrait = load_detail(&db, ids[4]).await.unwrap().resume.talent_portrait;
        assert_eq!(portrait.as_deref(), Some("Portrait 4"));
    }

    /// Local store whose reads always fail.
    struct UnreadableStore(LocalFileStore);

    #[async_trait]
    impl FileStore for UnreadableStore {
        async fn store(&self, upload: &Upload, folder: &str) -> Result<StoredFile, StorageError> {
            self.0.store(upload, folder).await
        }

        async fn read(&self, url: &str) -> Result<Bytes, StorageError> {
            Err(StorageError::NotFound(url.to_string()))
        }

        async fn delete(&self, url: &str) -> bool {
            self.0.delete(url).await
        }
    }

    #[tokio::test]
    async fn test_failed_ingest_removes_stored_file_and_writes_nothing() {
        let db = test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        let files = Arc::new(UnreadableStore(LocalFileStore::new(dir.path()).await.unwrap()));

        let result =
            ingest_resume_upload(&db, &offline(), files.as_ref(), text_upload(RESUME_TEXT), None)
                .await;
        assert!(matches!(result, Err(AppError::Storage(_))));
        assert_eq!(count(&db, "resumes").await, 0);

        let leftovers = std::fs::read_dir(dir.path().join(RESUME_FOLDER)).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_direct_create_and_partial_update() {
        let db = test_pool().await;
        let created = create_resume(
            &db,
            CreateResumeRequest {
                candidate_name: "Grace Hopper".to_string(),
                file_url: "/uploads/resumes/grace.pdf".to_string(),
                file_type: "application/pdf".to_string(),
                ocr_content: Some("COBOL, SQL".to_string()),
                parsed_content: None,
                talent_portrait: None,
                tags: vec!["SQL".to_string(), "COBOL".to_string(), "SQL".to_string()],
            },
        )
        .await
        .unwrap();
        assert_eq!(created.tags.len(), 2);

        let updated = update_resume(
            &db,
            created.resume.id,
            UpdateResumeRequest {
                talent_portrait: Some("Compiler pioneer".to_string()),
                tags: Some(vec!["Compilers".to_string()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.resume.candidate_name, "Grace Hopper");
        assert_eq!(updated.resume.ocr_content.as_deref(), Some("COBOL, SQL"));
        assert_eq!(updated.resume.talent_portrait.as_deref(), Some("Compiler pioneer"));
        assert!(updated.resume.updated_at >= created.resume.updated_at);
        let names: Vec<&str> = updated.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Compilers"]);
        // Unlinked tags stay.
        assert_eq!(count(&db, "tags").await, 3);
    }

    #[tokio::test]
    async fn test_delete_removes_links_keeps_tags() {
        let db = test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        let files = LocalFileStore::new(dir.path()).await.unwrap();
        let detail = ingest_resume_upload(&db, &offline(), &files, text_upload(RESUME_TEXT), None)
            .await
            .unwrap();

        delete_resume(&db, detail.resume.id).await.unwrap();
        assert_eq!(count(&db, "resumes").await, 0);
        assert_eq!(count(&db, "resume_tags").await, 0);
        assert_eq!(count(&db, "tags").await, 3);
        assert!(matches!(
            load_detail(&db, detail.resume.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_or_matched_resume() {
        let db = test_pool().await;
        assert!(matches!(
            update_resume(&db, 99, UpdateResumeRequest::default()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(delete_resume(&db, 99).await, Err(AppError::NotFound(_))));

        let resume = create_resume(&db, direct("Ada")).await.unwrap().resume;
        let blank = UpdateResumeRequest {
            candidate_name: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(matches!(update_resume(&db, resume.id, blank).await, Err(AppError::Validation(_))));

        let job_id: i64 = sqlx::query_scalar(
            "INSERT INTO job_requirements (position_name, responsibilities, requirements, created_at, updated_at)
             VALUES ('Analyst', 'Reports', 'SQL', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')
             RETURNING id",
        )
        .fetch_one(&db)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO matches (resume_id, job_id, match_score, created_at)
             VALUES (?, ?, 50.0, '2024-01-01T00:00:00Z')",
        )
        .bind(resume.id)
        .bind(job_id)
        .execute(&db)
        .await
        .unwrap();
        assert!(matches!(delete_resume(&db, resume.id).await, Err(AppError::Conflict { .. })));
        assert_eq!(count(&db, "resumes").await, 1);
    }

    #[tokio::test]
    async fn test_name_filter_treats_wildcards_literally() {
        let db = test_pool().await;
        for name in ["Ada_Lovelace", "AdaXLovelace", "100% Grace"] {
            create_resume(&db, direct(name)).await.unwrap();
        }
        let names = |fragment: &str| {
            let filter = queries::ResumeFilter {
                candidate_name: Some(fragment.to_string()),
                tag: None,
            };
            let db = db.clone();
            async move {
                queries::list_resumes(&db, &filter, Page::default())
                    .await
                    .unwrap()
                    .into_iter()
                    .map(|r| r.candidate_name)
                    .collect::<Vec<_>>()
            }
        };
        assert_eq!(names("a_l").await, vec!["Ada_Lovelace"]);
        assert_eq!(names("%").await, vec!["100% Grace"]);
        assert_eq!(names("lovelace").await.len(), 2);
    }
}
