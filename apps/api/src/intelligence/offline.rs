//! Deterministic document intelligence. No network, no clock, no randomness:
//! the same input always produces the same output.

use async_trait::async_trait;
use tracing::debug;

use super::{
    split_list, truncate_chars, CandidateRecommendation, CandidateSummary, DocumentIntelligence,
    JobFields, MatchAssessment, ParsedResume, ProviderKind, RecruitmentPlanDraft, TagLimits,
    MAX_PORTRAIT_CHARS, MAX_RECOMMENDATIONS,
};

/// Skill terms recognised in resumes and job descriptions, in output order.
pub const SKILL_VOCABULARY: &[&str] = &[
    "Python",
    "Java",
    "JavaScript",
    "TypeScript",
    "Rust",
    "C++",
    "SQL",
    "MySQL",
    "PostgreSQL",
    "Redis",
    "MongoDB",
    "FastAPI",
    "Django",
    "Flask",
    "Spring Boot",
    "Vue.js",
    "React",
    "Node.js",
    "Docker",
    "Kubernetes",
    "AWS",
    "Linux",
    "Git",
    "Kafka",
    "Machine Learning",
];

/// Score used when the job names no recognised skill.
const NEUTRAL_SCORE: f64 = 50.0;

const PLAN_STRATEGY: &str = "Use a multi-channel strategy: internal referrals, \
    professional social networks and job boards, prioritising the shortlisted candidates.";
const PLAN_INTERVIEWS: &str = "Run two interview rounds: a technical interview first, \
    then a team and culture fit interview.";

pub struct OfflineIntelligence {
    limits: TagLimits,
}

impl OfflineIntelligence {
    pub fn new(limits: TagLimits) -> Self {
        Self { limits }
    }
}

#[async_trait]
impl DocumentIntelligence for OfflineIntelligence {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Offline
    }

    async fn parse_resume(&self, raw_text: &str) -> ParsedResume {
        parse_resume_text(raw_text)
    }

    async fn generate_talent_portrait(&self, resume: &ParsedResume) -> String {
        portrait(resume)
    }

    async fn generate_resume_tags(&self, raw_text: &str) -> Vec<String> {
        vocabulary_terms(raw_text, self.limits.resume)
    }

    async fn extract_job_tags(&self, description: &str) -> Vec<String> {
        vocabulary_terms(description, self.limits.job)
    }

    async fn match_resume_to_job(&self, resume_text: &str, job_text: &str) -> MatchAssessment {
        keyword_coverage(resume_text, job_text)
    }

    async fn generate_recruitment_plan(
        &self,
        job: &JobFields,
        candidates: &[CandidateSummary],
    ) -> RecruitmentPlanDraft {
        draft_plan(job, candidates)
    }

    async fn parse_job_requirement(&self, raw_text: &str) -> JobFields {
        parse_job_text(raw_text)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Term matching
// ────────────────────────────────────────────────────────────────────────────

/// Case-insensitive search for `term` with no ASCII letter or digit directly
/// on either side, so "Java" does not match inside "JavaScript".
pub fn contains_term(text: &str, term: &str) -> bool {
    let haystack = text.to_lowercase();
    let needle = term.to_lowercase();
    if needle.is_empty() {
        return false;
    }
    let is_word = |c: char| c.is_ascii_alphanumeric();
    let mut from = 0;
    while let Some(pos) = haystack[from..].find(&needle) {
        let start = from + pos;
        let end = start + needle.len();
        let before_ok = !haystack[..start].chars().next_back().is_some_and(is_word);
        let after_ok = !haystack[end..].chars().next().is_some_and(is_word);
        if before_ok && after_ok {
            return true;
        }
        from = start + haystack[start..].chars().next().map_or(1, char::len_utf8);
    }
    false
}

fn vocabulary_terms(text: &str, cap: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    SKILL_VOCABULARY
        .iter()
        .filter(|term| contains_term(text, term))
        .take(cap)
        .map(|term| term.to_string())
        .collect()
}

fn keyword_coverage(resume_text: &str, job_text: &str) -> MatchAssessment {
    if resume_text.trim().is_empty() || job_text.trim().is_empty() {
        return MatchAssessment::insufficient();
    }

    let required: Vec<&str> = SKILL_VOCABULARY
        .iter()
        .copied()
        .filter(|term| contains_term(job_text, term))
        .collect();

    if required.is_empty() {
        return MatchAssessment {
            score: NEUTRAL_SCORE,
            explanation: "The job description names no recognised skills; neutral score assigned."
                .to_string(),
        };
    }

    let (covered, missing): (Vec<&str>, Vec<&str>) = required
        .iter()
        .partition(|term| contains_term(resume_text, term));

    let score = (covered.len() as f64 * 100.0 / required.len() as f64).round();
    debug!(
        "Keyword coverage: {}/{} -> {score}",
        covered.len(),
        required.len()
    );

    let band = if score >= 80.0 {
        "Strong match"
    } else if score >= 60.0 {
        "Moderate match"
    } else {
        "Low match"
    };

    let mut explanation = format!(
        "{band}: the candidate covers {} of {} required skills",
        covered.len(),
        required.len()
    );
    if !covered.is_empty() {
        explanation.push_str(&format!(" ({})", covered.join(", ")));
    }
    explanation.push('.');
    if !missing.is_empty() {
        let shown: Vec<&str> = missing.iter().copied().take(3).collect();
        explanation.push_str(&format!(" Missing: {}.", shown.join(", ")));
    }

    MatchAssessment { score, explanation }
}

// ────────────────────────────────────────────────────────────────────────────
// Label: value parsing
// ────────────────────────────────────────────────────────────────────────────

/// Splits "Label: value" on the first ASCII or full-width colon.
fn split_label(line: &str) -> Option<(String, &str)> {
    let idx = line.find([':', '：'])?;
    let label = line[..idx].trim().to_lowercase();
    let sep_len = line[idx..].chars().next().map_or(1, char::len_utf8);
    Some((label, line[idx + sep_len..].trim()))
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_resume_text(raw_text: &str) -> ParsedResume {
    let mut parsed = ParsedResume::default();
    let mut contacts: Vec<String> = Vec::new();

    for line in raw_text.lines() {
        let Some((label, value)) = split_label(line.trim()) else {
            continue;
        };
        match label.as_str() {
            "name" | "姓名" => parsed.name = non_empty(value),
            "education" | "学历" => parsed.education = non_empty(value),
            "skills" | "技能" => parsed.skills = split_list(value),
            "experience" | "工作经验" => parsed.experience = non_empty(value),
            "contact" | "phone" | "email" | "联系电话" | "联系方式" | "邮箱" => {
                contacts.extend(non_empty(value))
            }
            _ => {}
        }
    }

    if !contacts.is_empty() {
        parsed.contact = Some(contacts.join(", "));
    }
    parsed
}

#[derive(Clone, Copy)]
enum JobSection {
    Position,
    Department,
    Responsibilities,
    Requirements,
    Salary,
    Location,
}

fn job_section(label: &str) -> Option<JobSection> {
    match label {
        "position" | "position name" | "title" | "job title" | "职位" | "职位名称" => {
            Some(JobSection::Position)
        }
        "department" | "部门" => Some(JobSection::Department),
        "responsibilities" | "duties" | "岗位职责" | "职责" => {
            Some(JobSection::Responsibilities)
        }
        "requirements" | "qualifications" | "任职要求" | "要求" => Some(JobSection::Requirements),
        "salary" | "salary range" | "薪资" | "薪资范围" => Some(JobSection::Salary),
        "location" | "工作地点" | "地点" => Some(JobSection::Location),
        _ => None,
    }
}

fn parse_job_text(raw_text: &str) -> JobFields {
    let mut fields = JobFields::default();
    let mut open: Option<JobSection> = None;

    for line in raw_text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let labelled = split_label(line).and_then(|(label, value)| {
            job_section(&label).map(|section| (section, value))
        });

        match labelled {
            Some((section, value)) => {
                open = Some(section);
                *slot(&mut fields, section) = non_empty(value);
            }
            None => {
                // Continuation line for the open section.
                if let Some(section) = open {
                    let target = slot(&mut fields, section);
                    *target = Some(match target.take() {
                        Some(existing) => format!("{existing}\n{line}"),
                        None => line.to_string(),
                    });
                }
            }
        }
    }

    fields
}

fn slot(fields: &mut JobFields, section: JobSection) -> &mut Option<String> {
    match section {
        JobSection::Position => &mut fields.position_name,
        JobSection::Department => &mut fields.department,
        JobSection::Responsibilities => &mut fields.responsibilities,
        JobSection::Requirements => &mut fields.requirements,
        JobSection::Salary => &mut fields.salary_range,
        JobSection::Location => &mut fields.location,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Narrative output
// ────────────────────────────────────────────────────────────────────────────

fn portrait(resume: &ParsedResume) -> String {
    if resume.is_empty() {
        return String::new();
    }

    let name = resume.name.as_deref().unwrap_or("The candidate");
    let mut text = format!("{name} is a professional");
    if let Some(experience) = &resume.experience {
        text.push_str(&format!(" with {experience} of experience"));
    }
    if let Some(education) = &resume.education {
        text.push_str(&format!(", educated to {education} level"));
    }
    if !resume.skills.is_empty() {
        text.push_str(&format!(", skilled in {}", resume.skills.join(", ")));
    }
    text.push('.');

    truncate_chars(&text, MAX_PORTRAIT_CHARS)
}

fn draft_plan(job: &JobFields, candidates: &[CandidateSummary]) -> RecruitmentPlanDraft {
    if job.is_empty() || candidates.is_empty() {
        return RecruitmentPlanDraft::default();
    }

    let position = job.position_name.as_deref().unwrap_or("the position");
    let candidate_recommendations = candidates
        .iter()
        .take(MAX_RECOMMENDATIONS)
        .map(|c| {
            let mut reason = format!("{} scored {:.1}.", c.candidate_name, c.match_score);
            if let Some(explanation) = c.match_explanation.as_deref().filter(|e| !e.is_empty()) {
                reason.push(' ');
                reason.push_str(explanation);
            }
            CandidateRecommendation {
                candidate_id: c.resume_id,
                reason,
            }
        })
        .collect();

    RecruitmentPlanDraft {
        description: format!(
            "Recruitment plan for {position} with {} qualifying candidate(s).",
            candidates.len()
        ),
        strategy: PLAN_STRATEGY.to_string(),
        candidate_recommendations,
        interview_suggestions: PLAN_INTERVIEWS.to_string(),
    }
}
