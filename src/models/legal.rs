use serde::{ Serialize, Deserialize };

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegalCase {
    pub id: String,
    pub case_title: Option<String>,
    pub case_number: Option<String>,
    pub court_name: Option<String>,
    pub judgment_date: Option<String>,
    pub judges: Vec<String>,
    pub legal_area: Option<String>,
    pub summary: Option<String>,
    pub constitutional_articles: Vec<String>,
    pub keywords: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegalNews {
    pub id: String,
    pub headline: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub source: Option<String>,
    pub publication_date: Option<String>,
    pub tags: Vec<String>,
    pub related_cases: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegalExpert {
    pub id: String,
    pub name: Option<String>,
    pub designation: Option<String>,
    pub specialization: Vec<String>,
    pub experience_years: Option<u32>,
    pub location: Option<String>,
    pub bar_council: Option<String>,
    pub education: Option<String>,
    pub courts_practice: Vec<String>,
    pub notable_cases: Vec<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegalDocument {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub doc_type: Option<String>,
    pub size: Option<String>,
    pub created: Option<String>,
    #[serde(rename = "lastModified")]
    pub last_modified: Option<String>,
    pub status: Option<String>,
    pub tags: Vec<String>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

impl User {
    /// Initials used as an avatar, "AU" for anonymous users.
    pub fn initials(&self) -> String {
        let initials: String = self.full_name
            .as_deref()
            .unwrap_or("")
            .split_whitespace()
            .filter_map(|part| part.chars().next())
            .collect();
        if initials.is_empty() { "AU".to_string() } else { initials }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn partial_records_deserialize() {
        let expert: LegalExpert = serde_json
            ::from_value(json!({ "id": "e1", "name": "Adv. Priya Sharma", "specialization": ["Tax Law"] }))
            .unwrap();
        assert_eq!(expert.name.as_deref(), Some("Adv. Priya Sharma"));
        assert!(expert.location.is_none());
        assert!(expert.notable_cases.is_empty());
    }

    #[test]
    fn document_type_uses_wire_name() {
        let doc: LegalDocument = serde_json
            ::from_value(json!({ "id": "1", "name": "NDA", "type": "Agreement" }))
            .unwrap();
        assert_eq!(doc.doc_type.as_deref(), Some("Agreement"));
    }

    #[test]
    fn initials_from_full_name() {
        let user = User { full_name: Some("Meera Patel".into()), ..Default::default() };
        assert_eq!(user.initials(), "MP");
        assert_eq!(User::default().initials(), "AU");
    }
}
