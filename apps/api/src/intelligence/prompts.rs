// All LLM prompt constants for document intelligence.
// System prompts are combined with `llm_client::prompts::JSON_ONLY_INSTRUCTION`
// at call time when structured output is expected.

pub const RESUME_PARSE_SYSTEM: &str =
    "You are a professional recruiting assistant who extracts structured data from resumes.";

/// Replace `{resume_text}` before sending.
pub const RESUME_PARSE_PROMPT_TEMPLATE: &str = r#"Parse the resume below and return a JSON object with this EXACT schema:
{
  "name": "full name of the candidate",
  "education": "highest degree and institution",
  "skills": ["skill", "skill"],
  "experience": "summary of work experience",
  "contact": "phone and/or email"
}

Resume:
{resume_text}"#;

pub const PORTRAIT_SYSTEM: &str =
    "You are a professional recruiting assistant who writes concise candidate profiles.";

/// Replace `{candidate_json}` before sending.
pub const PORTRAIT_PROMPT_TEMPLATE: &str = r#"Write a professional talent portrait of the candidate below in plain prose.
Keep it under 200 characters. Return only the portrait text.

Candidate:
{candidate_json}"#;

pub const RESUME_TAGS_SYSTEM: &str =
    "You are a professional recruiting assistant who extracts key skill tags from resumes.";

/// Replace `{limit}` and `{resume_text}` before sending.
pub const RESUME_TAGS_PROMPT_TEMPLATE: &str = r#"Extract the key tags from the resume below: technical skills, industry experience and education keywords.
Return a JSON object {"tags": ["tag", "tag"]} with at most {limit} short tags.

Resume:
{resume_text}"#;

pub const JOB_TAGS_SYSTEM: &str =
    "You are a professional recruiting assistant who extracts key skill tags from job descriptions.";

/// Replace `{limit}` and `{job_text}` before sending.
pub const JOB_TAGS_PROMPT_TEMPLATE: &str = r#"Extract the key tags from the job description below: technical requirements, industry experience and education keywords.
Return a JSON object {"tags": ["tag", "tag"]} with at most {limit} short tags.

Job description:
{job_text}"#;

pub const MATCH_SYSTEM: &str =
    "You are a professional recruiting assistant who assesses how well candidates fit job requirements.";

/// Replace `{job_text}` and `{resume_text}` before sending.
pub const MATCH_PROMPT_TEMPLATE: &str = r#"Assess how well the candidate fits the job.
Return a JSON object {"score": 85, "explanation": "reason"} where score is a number from 0 to 100
and explanation is at most two sentences.

Job requirements:
{job_text}

Candidate resume:
{resume_text}"#;

pub const PLAN_SYSTEM: &str =
    "You are a professional recruiting assistant who designs recruitment plans.";

/// Replace `{job_json}` and `{candidates_json}` before sending.
pub const PLAN_PROMPT_TEMPLATE: &str = r#"Design a recruitment plan for the job below using the ranked candidates.
Return a JSON object with this EXACT schema:
{
  "description": "one paragraph overview of the plan",
  "strategy": "sourcing and hiring strategy",
  "candidate_recommendations": [
    {"candidate_id": 12, "reason": "why this candidate is recommended"}
  ],
  "interview_suggestions": "suggested interview process"
}

Rules:
- Recommend at most 3 candidates.
- candidate_id MUST be a resume_id from the candidate list.

Job:
{job_json}

Candidates (highest match first):
{candidates_json}"#;

pub const JOB_PARSE_SYSTEM: &str =
    "You are a professional recruiting assistant who extracts structured data from job postings.";

/// Replace `{job_text}` before sending.
pub const JOB_PARSE_PROMPT_TEMPLATE: &str = r#"Parse the job posting below and return a JSON object with this EXACT schema:
{
  "position_name": "job title",
  "department": "department or team",
  "responsibilities": "what the role does",
  "requirements": "what the candidate needs",
  "salary_range": "salary range if stated",
  "location": "work location"
}

Job posting:
{job_text}"#;
