use chrono::NaiveDate;

use crate::ai::{ClinicalFields, ClinicalNote};

/// Append one field's new text to its stored value under a dated marker.
/// The stored text is carried over byte for byte; an empty delta leaves the
/// field exactly as it was.
pub fn append_field(prior: &str, delta: &str, date: NaiveDate) -> String {
    let delta = delta.trim();
    if delta.is_empty() {
        return prior.to_string();
    }

    if prior.trim().is_empty() {
        format!("[{}] {}", date.format("%d/%m/%Y"), delta)
    } else {
        format!("{}\n\n[{}] {}", prior, date.format("%d/%m/%Y"), delta)
    }
}

/// Combine the model's per-field deltas with the patient's stored fields.
/// The additive policy lives here, in code, rather than being delegated to
/// the model's goodwill.
pub fn merge_fields(prior: &ClinicalFields, note: &ClinicalNote, date: NaiveDate) -> ClinicalFields {
    ClinicalFields {
        objectives: append_field(&prior.objectives, &note.objectives, date),
        clinical_demand: append_field(&prior.clinical_demand, &note.clinical_demand, date),
        clinical_procedures: append_field(&prior.clinical_procedures, &note.clinical_procedures, date),
        clinical_analysis: append_field(&prior.clinical_analysis, &note.clinical_analysis, date),
        clinical_conclusion: append_field(&prior.clinical_conclusion, &note.clinical_conclusion, date),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 5).unwrap()
    }

    #[test]
    fn test_prior_text_always_survives() {
        let prior = ClinicalFields {
            objectives: "MARCADOR-A manter rotina de sono".to_string(),
            clinical_demand: "MARCADOR-B crises de ansiedade".to_string(),
            clinical_procedures: String::new(),
            clinical_analysis: "MARCADOR-C evitação".to_string(),
            clinical_conclusion: String::new(),
        };
        let note = ClinicalNote {
            objectives: "incluir exercício físico".to_string(),
            clinical_analysis: "padrão de esquiva em contexto social".to_string(),
            ..Default::default()
        };

        let merged = merge_fields(&prior, &note, date());

        assert!(merged.objectives.contains("MARCADOR-A manter rotina de sono"));
        assert!(merged.objectives.contains("incluir exercício físico"));
        assert!(merged.clinical_demand.contains("MARCADOR-B"));
        assert!(merged.clinical_analysis.contains("MARCADOR-C"));
        assert!(merged.clinical_analysis.contains("esquiva"));
    }

    #[test]
    fn test_empty_delta_leaves_field_unchanged() {
        assert_eq!(append_field("texto existente", "", date()), "texto existente");
        assert_eq!(append_field("texto existente", "   ", date()), "texto existente");
    }

    #[test]
    fn test_empty_prior_gets_dated_entry_without_separator() {
        let merged = append_field("", "primeira observação", date());
        assert_eq!(merged, "[05/08/2026] primeira observação");
    }

    #[test]
    fn test_appended_entry_carries_session_date() {
        let merged = append_field("anterior", "novo", date());
        assert_eq!(merged, "anterior\n\n[05/08/2026] novo");
    }
}
