use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// The six-key result the summarization call is asked to produce. The five
/// field keys carry only what is new for this session; `psy_record` carries
/// the full note text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicalNote {
    #[serde(default)]
    pub objectives: String,
    #[serde(default)]
    pub clinical_demand: String,
    #[serde(default)]
    pub clinical_procedures: String,
    #[serde(default)]
    pub clinical_analysis: String,
    #[serde(default)]
    pub clinical_conclusion: String,
    #[serde(default)]
    pub psy_record: String,
}

/// Prior values of the five patient clinical fields, serialized into the
/// summarization request so the model can avoid repeating them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicalFields {
    pub objectives: String,
    pub clinical_demand: String,
    pub clinical_procedures: String,
    pub clinical_analysis: String,
    pub clinical_conclusion: String,
}

/// Extract the clinical note from the model's raw response text.
///
/// The first syntactically complete top-level JSON object wins, wherever it
/// sits in surrounding prose or code fences. When no object can be found
/// (or it cannot be read as a note), the entire raw text is preserved under
/// `psy_record` so the practitioner always sees output.
pub fn extract_clinical_note(raw: &str) -> ClinicalNote {
    let cleaned = strip_code_fences(raw);

    if let Some(value) = first_json_object(cleaned) {
        match serde_json::from_value::<ClinicalNote>(value) {
            Ok(note) => return note,
            Err(e) => debug!("Response object does not match the note shape: {}", e),
        }
    }

    debug!("No usable JSON object in response, preserving raw text");
    ClinicalNote {
        psy_record: raw.trim().to_string(),
        ..Default::default()
    }
}

/// Find the first syntactically complete top-level JSON object in the text.
/// Each `{` position is tried with an incremental parse, so a complete
/// object followed by unrelated braces or prose is returned exactly, not a
/// greedy span to the last `}`.
fn first_json_object(text: &str) -> Option<Value> {
    for (pos, _) in text.char_indices().filter(|(_, c)| *c == '{') {
        let mut stream = serde_json::Deserializer::from_str(&text[pos..]).into_iter::<Value>();
        if let Some(Ok(value)) = stream.next() {
            if value.is_object() {
                return Some(value);
            }
        }
    }

    None
}

/// Remove a surrounding markdown code fence, if present
fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();

    for fence in ["```json", "```"] {
        if let Some(inner) = text.strip_prefix(fence) {
            if let Some(inner) = inner.strip_suffix("```") {
                return inner.trim();
            }
        }
    }

    text
}
