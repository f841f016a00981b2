//! Clasificación de preguntas por tema mediante palabras clave.

/// Temas en orden de prioridad: gana el primero con alguna coincidencia.
const TOPIC_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "medications",
        &[
            "medication", "drug", "pill", "injection", "hormone", "progesterone", "estrogen",
            "gonadotropin", "lupron", "follistim", "gonal", "menopur",
        ],
    ),
    (
        "procedures",
        &[
            "transfer", "retrieval", "extraction", "implantation", "surgery", "procedure",
            "ivf cycle", "egg collection",
        ],
    ),
    (
        "lifestyle",
        &[
            "diet", "exercise", "stress", "sleep", "alcohol", "caffeine", "smoking", "weight",
            "activity", "lifestyle",
        ],
    ),
    (
        "symptoms",
        &[
            "symptom", "pain", "bloating", "cramping", "bleeding", "spotting", "side effect",
            "discomfort", "nausea",
        ],
    ),
    (
        "timeline",
        &["when", "how long", "duration", "schedule", "timeline", "days", "weeks", "waiting period"],
    ),
    (
        "success_rates",
        &["success", "rate", "chance", "probability", "likelihood", "statistics", "outcome"],
    ),
    (
        "emotional",
        &[
            "anxiety", "stress", "worried", "scared", "emotional", "mental health", "support",
            "feeling", "overwhelmed",
        ],
    ),
    (
        "costs",
        &["cost", "price", "insurance", "coverage", "payment", "afford", "expensive", "financial"],
    ),
    (
        "fertility_basics",
        &[
            "ovulation", "sperm", "egg", "embryo", "fertilization", "conception", "fertility",
            "infertility",
        ],
    ),
];

pub const GENERAL_TOPIC: &str = "general";

/// Preguntas sugeridas para usuarios nuevos.
pub const SUGGESTED_QUESTIONS: &[&str] = &[
    "What should I expect during an IVF cycle?",
    "Are there foods I should avoid during treatment?",
    "What are common side effects of IVF medications?",
    "How can I manage stress during IVF?",
    "What happens during egg retrieval?",
    "When can I take a pregnancy test after transfer?",
];

/// Devuelve el tema de la pregunta (subcadena, sin distinguir mayúsculas).
pub fn classify_topic(question: &str) -> &'static str {
    let lower = question.to_lowercase();
    TOPIC_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| lower.contains(kw)))
        .map(|(topic, _)| *topic)
        .unwrap_or(GENERAL_TOPIC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_first_matching_topic() {
        assert_eq!(classify_topic("Side effects of Menopur?"), "medications");
        assert_eq!(classify_topic("What happens at embryo TRANSFER?"), "procedures");
        assert_eq!(classify_topic("Can I drink caffeine?"), "lifestyle");
        assert_eq!(classify_topic("How much does it cost?"), "costs");
    }

    #[test]
    fn stress_counts_as_lifestyle_before_emotional() {
        assert_eq!(classify_topic("I feel stress"), "lifestyle");
        assert_eq!(classify_topic("I am so worried"), "emotional");
    }

    #[test]
    fn unmatched_questions_are_general() {
        assert_eq!(classify_topic("Hello there"), GENERAL_TOPIC);
        assert_eq!(classify_topic(""), GENERAL_TOPIC);
    }
}
