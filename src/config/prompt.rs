use crate::i18n::Language;
use crate::predictor::CaseDetails;
use serde_json::{ json, Value as JsonValue };

const ASSISTANT_PREAMBLE: &str =
    "You are an expert Indian legal assistant with comprehensive knowledge of Indian law, constitution, and jurisprudence. Answer the following legal question with accurate information about Indian law, citing relevant constitutional articles, acts, and landmark cases where appropriate.";

pub const ANSWER_RUBRIC: &str =
    "Please provide a detailed answer covering:
1. Direct answer to the question
2. Relevant constitutional provisions or legal acts
3. Key case laws if applicable
4. Practical implications
5. Recent developments if any

Format your response in a clear, structured manner.";

const PREDICTOR_PREAMBLE: &str =
    "You are an expert legal AI analyst for Indian courts. Based on the following case details, provide a comprehensive case outcome prediction with statistical analysis:";

const PREDICTOR_RUBRIC: &str =
    "Please provide a detailed analysis including:
1. Win Probability (0-100%)
2. Key Success Factors
3. Potential Challenges
4. Similar Case Precedents
5. Recommended Strategy
6. Timeline Estimation
7. Cost Analysis Range
8. Risk Assessment

Format your response as a structured JSON with these fields:
{
  \"winProbability\": number,
  \"successFactors\": array,
  \"challenges\": array,
  \"precedents\": array,
  \"strategy\": array,
  \"timelineMonths\": number,
  \"costRange\": string,
  \"riskLevel\": \"Low|Medium|High\",
  \"summary\": string
}";

const NOT_SPECIFIED: &str = "Not specified";

pub fn language_instruction(language: Language) -> String {
    if language == Language::En {
        String::new()
    } else {
        format!("Please respond in {} language. ", language.native_name())
    }
}

/// The question is embedded verbatim.
pub fn build_assistant_prompt(question: &str, language: Language) -> String {
    format!(
        "{}{}\n\nUser question: {}\n\n{}",
        language_instruction(language),
        ASSISTANT_PREAMBLE,
        question,
        ANSWER_RUBRIC
    )
}

pub fn build_prediction_prompt(details: &CaseDetails) -> String {
    fn or_unspecified(value: &Option<String>) -> &str {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(NOT_SPECIFIED)
    }

    format!(
        "{}\n\nCase Type: {}\nDescription: {}\nCourt: {}\nOpponent: {}\nEvidence: {}\nLegal Basis: {}\n\n{}",
        PREDICTOR_PREAMBLE,
        details.case_type,
        details.description,
        or_unspecified(&details.court),
        or_unspecified(&details.opponent),
        or_unspecified(&details.evidence),
        or_unspecified(&details.legal_basis),
        PREDICTOR_RUBRIC
    )
}

pub fn prediction_schema() -> JsonValue {
    let string_list = json!({ "type": "array", "items": { "type": "string" } });
    json!({
        "type": "object",
        "properties": {
            "winProbability": { "type": "number" },
            "successFactors": string_list,
            "challenges": string_list,
            "precedents": string_list,
            "strategy": string_list,
            "timelineMonths": { "type": "number" },
            "costRange": { "type": "string" },
            "riskLevel": { "type": "string" },
            "summary": { "type": "string" }
        }
    })
}
