// Cross-cutting prompt fragments shared by every LLM-backed operation.
// Operation-specific prompts live next to the code that sends them.

/// Appended to every system prompt that expects structured output.
pub const JSON_ONLY_INSTRUCTION: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Keeps the model from inventing candidate or job facts.
pub const FACTUAL_INSTRUCTION: &str = "Use ONLY facts present in the provided text. \
    If a field cannot be determined from the text, leave it null or empty. \
    Never guess names, contact details, dates or employers.";
