//! Case outcome prediction: validates the case form, requests a structured
//! object from the gateway and normalises it before it reaches a client.

use crate::config::prompt::{ build_prediction_prompt, prediction_schema };
use crate::llm::chat::{ ChatClient, InvokeRequest, InvokeResult, LlmError };
use log::{ error, info };
use serde::{ Deserialize, Serialize };
use serde_json::Value as JsonValue;
use std::sync::Arc;

pub const CASE_TYPES: [&str; 10] = [
    "Civil Dispute",
    "Criminal Case",
    "Corporate Law",
    "Family Law",
    "Property Dispute",
    "Contract Breach",
    "Employment Law",
    "Intellectual Property",
    "Tax Law",
    "Constitutional Law",
];

pub const COURTS: [&str; 9] = [
    "Supreme Court of India",
    "Delhi High Court",
    "Bombay High Court",
    "Madras High Court",
    "Calcutta High Court",
    "Karnataka High Court",
    "District Court",
    "Family Court",
    "Consumer Court",
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleCase {
    pub title: &'static str,
    #[serde(rename = "type")]
    pub case_type: &'static str,
    pub win_rate: u8,
    pub avg_duration: &'static str,
    pub description: &'static str,
}

pub const SAMPLE_CASES: [SampleCase; 3] = [
    SampleCase {
        title: "Property Dispute Resolution",
        case_type: "Property Dispute",
        win_rate: 78,
        avg_duration: "18 months",
        description: "Boundary dispute between neighbors resolved in favor of plaintiff",
    },
    SampleCase {
        title: "Contract Breach Case",
        case_type: "Contract Breach",
        win_rate: 65,
        avg_duration: "12 months",
        description: "Service agreement breach with substantial damages awarded",
    },
    SampleCase {
        title: "Employment Termination",
        case_type: "Employment Law",
        win_rate: 82,
        avg_duration: "8 months",
        description: "Wrongful termination case settled with compensation",
    },
];

#[derive(Debug, thiserror::Error)]
pub enum PredictorError {
    #[error("Please fill in at least case type and description (missing: {0})")]
    MissingField(&'static str),
    #[error("Error analyzing case. Please try again.")]
    Gateway(#[source] LlmError),
    #[error("Error analyzing case: unexpected response shape ({0})")]
    Shape(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseDetails {
    #[serde(default)]
    pub case_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub court: Option<String>,
    #[serde(default)]
    pub opponent: Option<String>,
    #[serde(default)]
    pub evidence: Option<String>,
    #[serde(default)]
    pub legal_basis: Option<String>,
}

impl CaseDetails {
    pub fn validate(&self) -> Result<(), PredictorError> {
        if self.case_type.trim().is_empty() {
            return Err(PredictorError::MissingField("caseType"));
        }
        if self.description.trim().is_empty() {
            return Err(PredictorError::MissingField("description"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    #[default]
    Unknown,
}

impl RiskLevel {
    fn parse_lenient(raw: &str) -> Self {
        let lowered = raw.trim().to_lowercase();
        match lowered.trim_end_matches(" risk") {
            "low" => RiskLevel::Low,
            "medium" | "moderate" => RiskLevel::Medium,
            "high" => RiskLevel::High,
            _ => RiskLevel::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbabilityBand {
    Favourable,
    Uncertain,
    Unfavourable,
}

pub fn probability_band(win_probability: f64) -> ProbabilityBand {
    if win_probability >= 70.0 {
        ProbabilityBand::Favourable
    } else if win_probability >= 50.0 {
        ProbabilityBand::Uncertain
    } else {
        ProbabilityBand::Unfavourable
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub win_probability: f64,
    pub probability_band: ProbabilityBand,
    pub success_factors: Vec<String>,
    pub challenges: Vec<String>,
    pub precedents: Vec<String>,
    pub strategy: Vec<String>,
    pub timeline_months: f64,
    pub cost_range: String,
    pub risk_level: RiskLevel,
    pub summary: String,
}

// Models sometimes answer "75%" or "12 months" instead of a bare number.
fn lenient_number(value: Option<&JsonValue>) -> f64 {
    let parsed = match value {
        Some(JsonValue::Number(n)) => n.as_f64(),
        Some(JsonValue::String(s)) => {
            let digits: String = s
                .trim()
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            digits.parse::<f64>().ok()
        }
        _ => None,
    };
    parsed.filter(|n| n.is_finite()).unwrap_or(0.0)
}

fn lenient_text(value: Option<&JsonValue>) -> String {
    match value {
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

// A lone string counts as a one-item list.
fn string_list(value: Option<&JsonValue>) -> Vec<String> {
    let items: Vec<&JsonValue> = match value {
        Some(JsonValue::Array(values)) => values.iter().collect(),
        Some(JsonValue::Null) | None => Vec::new(),
        Some(single) => vec![single],
    };
    items
        .into_iter()
        .filter(|v| !v.is_null())
        .map(|v| lenient_text(Some(v)))
        .filter(|s| !s.trim().is_empty())
        .collect()
}

fn lenient_risk(value: Option<&JsonValue>) -> RiskLevel {
    match value {
        Some(JsonValue::String(s)) => RiskLevel::parse_lenient(s),
        _ => RiskLevel::Unknown,
    }
}

/// Clamps and defaults a raw gateway object into a `PredictionResult`.
/// Each field is read on its own, so one badly typed field never rejects
/// the whole reply.
pub fn normalize_prediction(value: JsonValue) -> Result<PredictionResult, PredictorError> {
    let fields = match value {
        JsonValue::Object(fields) => fields,
        other => {
            return Err(PredictorError::Shape(format!("expected object, got {}", other)));
        }
    };

    let win_probability = lenient_number(fields.get("winProbability")).clamp(0.0, 100.0);

    Ok(PredictionResult {
        win_probability,
        probability_band: probability_band(win_probability),
        success_factors: string_list(fields.get("successFactors")),
        challenges: string_list(fields.get("challenges")),
        precedents: string_list(fields.get("precedents")),
        strategy: string_list(fields.get("strategy")),
        timeline_months: lenient_number(fields.get("timelineMonths")).max(0.0),
        cost_range: lenient_text(fields.get("costRange")),
        risk_level: lenient_risk(fields.get("riskLevel")),
        summary: lenient_text(fields.get("summary")),
    })
}

#[derive(Clone)]
pub struct CasePredictor {
    client: Arc<dyn ChatClient>,
}

impl CasePredictor {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }

    pub async fn predict(&self, details: &CaseDetails) -> Result<PredictionResult, PredictorError> {
        details.validate()?;
        info!("Predicting outcome for a '{}' case", details.case_type);

        let request = InvokeRequest::structured(build_prediction_prompt(details), prediction_schema());
        let value = match self.client.invoke(&request).await {
            Ok(InvokeResult::Object(value)) => value,
            Ok(InvokeResult::Text(text)) =>
                serde_json
                    ::from_str(&text)
                    .map_err(|e| PredictorError::Shape(format!("reply is not JSON: {}", e)))?,
            Err(e) => {
                error!("Prediction error: {}", e);
                return Err(PredictorError::Gateway(e));
            }
        };
        normalize_prediction(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::chat::mock::MockChatClient;
    use serde_json::json;

    fn details(case_type: &str, description: &str) -> CaseDetails {
        CaseDetails {
            case_type: case_type.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn empty_description_is_rejected_before_gateway_call() {
        let mock = Arc::new(MockChatClient::text("{}"));
        let predictor = CasePredictor::new(mock.clone());
        let err = predictor.predict(&details("Family Law", "  ")).await.unwrap_err();
        assert!(matches!(err, PredictorError::MissingField("description")));
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn missing_case_type_is_rejected() {
        let mock = Arc::new(MockChatClient::text("{}"));
        let predictor = CasePredictor::new(mock.clone());
        let err = predictor.predict(&details("", "Tenant refuses to vacate")).await.unwrap_err();
        assert!(matches!(err, PredictorError::MissingField("caseType")));
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn structured_reply_is_normalised() {
        let reply = json!({
            "winProbability": 140,
            "successFactors": ["Registered sale deed", ""],
            "challenges": ["Delay in filing"],
            "precedents": [],
            "strategy": ["Seek interim injunction"],
            "timelineMonths": -3,
            "costRange": "₹50,000 - ₹2,00,000",
            "riskLevel": "medium",
            "summary": "Strong documentary position."
        });
        let mock = Arc::new(MockChatClient::replying(vec![Ok(InvokeResult::Object(reply))]));
        let predictor = CasePredictor::new(mock.clone());
        let result = predictor
            .predict(&details("Property Dispute", "Boundary wall encroachment")).await
            .unwrap();

        assert_eq!(result.win_probability, 100.0);
        assert_eq!(result.probability_band, ProbabilityBand::Favourable);
        assert_eq!(result.success_factors, vec!["Registered sale deed"]);
        assert_eq!(result.timeline_months, 0.0);
        assert_eq!(result.risk_level, RiskLevel::Medium);
        assert_eq!(result.cost_range, "₹50,000 - ₹2,00,000");

        let requests = mock.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].response_json_schema.is_some());
        assert!(requests[0].prompt.contains("Description: Boundary wall encroachment"));
    }

    #[tokio::test]
    async fn gateway_failure_is_reported() {
        let predictor = CasePredictor::new(Arc::new(MockChatClient::failing()));
        let err = predictor.predict(&details("Tax Law", "GST notice")).await.unwrap_err();
        assert!(matches!(err, PredictorError::Gateway(_)));
        assert_eq!(err.to_string(), "Error analyzing case. Please try again.");
    }

    #[test]
    fn missing_fields_get_defaults() {
        let result = normalize_prediction(json!({})).unwrap();
        assert_eq!(result.win_probability, 0.0);
        assert!(result.challenges.is_empty());
        assert_eq!(result.risk_level, RiskLevel::Unknown);
        assert_eq!(result.summary, "");
    }

    #[test]
    fn string_numbers_are_read_leniently() {
        let result = normalize_prediction(
            json!({ "winProbability": "65%", "timelineMonths": "12 months", "riskLevel": "High Risk" })
        ).unwrap();
        assert_eq!(result.win_probability, 65.0);
        assert_eq!(result.timeline_months, 12.0);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.probability_band, ProbabilityBand::Uncertain);
    }

    #[test]
    fn non_string_risk_level_becomes_unknown() {
        let result = normalize_prediction(json!({ "winProbability": 60, "riskLevel": 2 })).unwrap();
        assert_eq!(result.risk_level, RiskLevel::Unknown);
        assert_eq!(result.win_probability, 60.0);
    }

    #[test]
    fn lone_string_becomes_single_item_list() {
        let result = normalize_prediction(
            json!({ "successFactors": "Strong evidence", "challenges": 3, "strategy": [null, "Settle early"] })
        ).unwrap();
        assert_eq!(result.success_factors, vec!["Strong evidence"]);
        assert_eq!(result.challenges, vec!["3"]);
        assert_eq!(result.strategy, vec!["Settle early"]);
        assert!(result.precedents.is_empty());
    }

    #[test]
    fn non_string_summary_is_stringified() {
        let result = normalize_prediction(
            json!({ "summary": { "verdict": "likely" }, "costRange": 50000 })
        ).unwrap();
        assert_eq!(result.summary, r#"{"verdict":"likely"}"#);
        assert_eq!(result.cost_range, "50000");
        assert_eq!(normalize_prediction(json!({ "summary": null })).unwrap().summary, "");
    }

    #[test]
    fn non_object_reply_is_a_shape_error() {
        assert!(matches!(normalize_prediction(json!([1, 2])), Err(PredictorError::Shape(_))));
    }

    #[test]
    fn bands_follow_thresholds() {
        assert_eq!(probability_band(70.0), ProbabilityBand::Favourable);
        assert_eq!(probability_band(69.9), ProbabilityBand::Uncertain);
        assert_eq!(probability_band(50.0), ProbabilityBand::Uncertain);
        assert_eq!(probability_band(49.0), ProbabilityBand::Unfavourable);
    }

    #[test]
    fn case_details_accept_camel_case_form() {
        let d: CaseDetails = serde_json
            ::from_value(json!({ "caseType": "Tax Law", "description": "x", "legalBasis": "GST Act" }))
            .unwrap();
        assert_eq!(d.legal_basis.as_deref(), Some("GST Act"));
        assert!(d.court.is_none());
    }
}
