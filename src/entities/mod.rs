//! Read access to the externally owned entity API and the user session
//! endpoints that sit next to it.

use crate::models::legal::{ LegalCase, LegalDocument, LegalExpert, LegalNews, User };
use async_trait::async_trait;
use log::{ debug, info, warn };
use reqwest::{ Client as HttpClient, StatusCode };
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum EntityError {
    #[error("Entity API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Entity API returned status {0}")]
    Status(u16),
    #[error("Invalid sort key: '{0}'")]
    InvalidSortKey(String),
    #[error("Malformed entity response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Field name with an optional leading `-` for descending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub order: SortOrder,
}

impl SortKey {
    pub fn descending(field: &str) -> Self {
        Self { field: field.to_string(), order: SortOrder::Descending }
    }
}

impl FromStr for SortKey {
    type Err = EntityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (field, order) = match trimmed.strip_prefix('-') {
            Some(rest) => (rest, SortOrder::Descending),
            None => (trimmed, SortOrder::Ascending),
        };
        let valid = !field.is_empty() &&
            field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        if !valid {
            return Err(EntityError::InvalidSortKey(s.to_string()));
        }
        Ok(Self { field: field.to_string(), order })
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.order {
            SortOrder::Descending => write!(f, "-{}", self.field),
            SortOrder::Ascending => write!(f, "{}", self.field),
        }
    }
}

pub trait Entity: DeserializeOwned + Send {
    const NAME: &'static str;
    const DEFAULT_SORT: &'static str;
    const DEFAULT_LIMIT: usize;
}

impl Entity for LegalCase {
    const NAME: &'static str = "LegalCase";
    const DEFAULT_SORT: &'static str = "-judgment_date";
    const DEFAULT_LIMIT: usize = 10;
}

impl Entity for LegalNews {
    const NAME: &'static str = "LegalNews";
    const DEFAULT_SORT: &'static str = "-publication_date";
    const DEFAULT_LIMIT: usize = 50;
}

impl Entity for LegalExpert {
    const NAME: &'static str = "LegalExpert";
    const DEFAULT_SORT: &'static str = "-experience_years";
    const DEFAULT_LIMIT: usize = 20;
}

#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn list(
        &self,
        entity: &str,
        sort: &SortKey,
        limit: usize
    ) -> Result<Vec<JsonValue>, EntityError>;
}

#[async_trait]
pub trait UserService: Send + Sync {
    /// `Ok(None)` when the caller is not signed in.
    async fn me(&self, bearer: Option<&str>) -> Result<Option<User>, EntityError>;
    async fn logout(&self, bearer: Option<&str>) -> Result<(), EntityError>;
    fn login_url(&self, return_to: &str) -> String;
}

/// Lists typed records, skipping rows that do not decode.
pub async fn list_entities<T: Entity>(
    store: &dyn EntityStore,
    sort: Option<SortKey>,
    limit: Option<usize>
) -> Result<Vec<T>, EntityError> {
    let sort = match sort {
        Some(s) => s,
        None => T::DEFAULT_SORT.parse()?,
    };
    let limit = limit.unwrap_or(T::DEFAULT_LIMIT);
    let rows = store.list(T::NAME, &sort, limit).await?;
    let total = rows.len();
    let records: Vec<T> = rows
        .into_iter()
        .filter_map(|row| match serde_json::from_value::<T>(row) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping malformed {} record: {}", T::NAME, e);
                None
            }
        })
        .collect();
    debug!("Loaded {}/{} {} records", records.len(), total, T::NAME);
    Ok(records)
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

pub fn filter_experts<'a>(experts: &'a [LegalExpert], query: &str) -> Vec<&'a LegalExpert> {
    let q = query.trim().to_lowercase();
    experts
        .iter()
        .filter(|e| {
            e.name.as_deref().is_some_and(|n| contains_ci(n, &q)) ||
                e.specialization.iter().any(|s| contains_ci(s, &q)) ||
                e.location.as_deref().is_some_and(|l| contains_ci(l, &q))
        })
        .collect()
}

pub const ALL_CATEGORIES: &str = "all";

pub fn filter_news<'a>(news: &'a [LegalNews], category: &str) -> Vec<&'a LegalNews> {
    news.iter()
        .filter(|n| category == ALL_CATEGORIES || n.category.as_deref() == Some(category))
        .collect()
}

/// Distinct categories in first-seen order, `all` first.
pub fn news_categories(news: &[LegalNews]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut categories = vec![ALL_CATEGORIES.to_string()];
    for category in news.iter().filter_map(|n| n.category.as_deref()) {
        if seen.insert(category) {
            categories.push(category.to_string());
        }
    }
    categories
}

pub fn filter_documents<'a>(
    documents: &'a [LegalDocument],
    query: &str,
    category: &str
) -> Vec<&'a LegalDocument> {
    let q = query.trim().to_lowercase();
    documents
        .iter()
        .filter(|d| {
            let matches_search = contains_ci(&d.name, &q) || d.tags.iter().any(|t| contains_ci(t, &q));
            let matches_category =
                category == ALL_CATEGORIES || d.doc_type.as_deref() == Some(category);
            matches_search && matches_category
        })
        .collect()
}

fn document(
    id: &str,
    name: &str,
    doc_type: &str,
    dates: (&str, &str),
    status: &str,
    tags: &[&str],
    description: &str
) -> LegalDocument {
    LegalDocument {
        id: id.to_string(),
        name: name.to_string(),
        doc_type: Some(doc_type.to_string()),
        size: None,
        created: Some(dates.0.to_string()),
        last_modified: Some(dates.1.to_string()),
        status: Some(status.to_string()),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        description: Some(description.to_string()),
    }
}

/// Template library served when no document backend is configured.
pub fn sample_documents() -> Vec<LegalDocument> {
    vec![
        LegalDocument {
            size: Some("2.3 MB".into()),
            ..document(
                "1",
                "Employment Agreement Template",
                "Contract",
                ("2024-01-15", "2024-01-20"),
                "Active",
                &["Employment", "HR", "Legal"],
                "Standard employment agreement template for Indian companies"
            )
        },
        LegalDocument {
            size: Some("1.8 MB".into()),
            ..document(
                "2",
                "Non-Disclosure Agreement (NDA)",
                "Agreement",
                ("2024-01-10", "2024-01-18"),
                "Draft",
                &["NDA", "Confidentiality", "Business"],
                "Mutual non-disclosure agreement template"
            )
        },
        LegalDocument {
            size: Some("3.1 MB".into()),
            ..document(
                "3",
                "Property Sale Deed Format",
                "Legal Document",
                ("2024-01-05", "2024-01-22"),
                "Active",
                &["Property", "Sale", "Real Estate"],
                "Standard property sale deed format as per Indian laws"
            )
        },
        LegalDocument {
            size: Some("5.2 MB".into()),
            ..document(
                "4",
                "Company Incorporation Documents",
                "Corporate",
                ("2024-01-01", "2024-01-25"),
                "Completed",
                &["Incorporation", "ROC", "Corporate"],
                "Complete set of documents for company incorporation"
            )
        }
    ]
}

pub struct HttpEntityStore {
    http: HttpClient,
    base_url: String,
    api_key: Option<String>,
}

impl HttpEntityStore {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    fn request(&self, method: reqwest::Method, route: &str, bearer: Option<&str>) -> reqwest::RequestBuilder {
        let mut req = self.http.request(method, format!("{}{}", self.base_url, route));
        if let Some(key) = &self.api_key {
            req = req.header("api_key", key);
        }
        if let Some(token) = bearer {
            req = req.bearer_auth(token);
        }
        req
    }
}

#[async_trait]
impl EntityStore for HttpEntityStore {
    async fn list(
        &self,
        entity: &str,
        sort: &SortKey,
        limit: usize
    ) -> Result<Vec<JsonValue>, EntityError> {
        let route = format!("/entities/{}", entity);
        let resp = self
            .request(reqwest::Method::GET, &route, None)
            .query(&[("sort", sort.to_string()), ("limit", limit.to_string())])
            .send().await?;
        if !resp.status().is_success() {
            return Err(EntityError::Status(resp.status().as_u16()));
        }
        match resp.json::<JsonValue>().await? {
            JsonValue::Array(rows) => Ok(rows),
            other => Err(EntityError::Malformed(format!("expected array for {}, got {}", entity, other))),
        }
    }
}

#[async_trait]
impl UserService for HttpEntityStore {
    async fn me(&self, bearer: Option<&str>) -> Result<Option<User>, EntityError> {
        if bearer.is_none() {
            info!("User not logged in");
            return Ok(None);
        }
        let resp = self.request(reqwest::Method::GET, "/auth/me", bearer).send().await?;
        match resp.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                info!("User not logged in");
                Ok(None)
            }
            status if status.is_success() => Ok(Some(resp.json::<User>().await?)),
            status => Err(EntityError::Status(status.as_u16())),
        }
    }

    async fn logout(&self, bearer: Option<&str>) -> Result<(), EntityError> {
        let resp = self.request(reqwest::Method::POST, "/auth/logout", bearer).send().await?;
        if !resp.status().is_success() {
            return Err(EntityError::Status(resp.status().as_u16()));
        }
        Ok(())
    }

    fn login_url(&self, return_to: &str) -> String {
        let encoded: String = url::form_urlencoded
            ::byte_serialize(return_to.as_bytes())
            .collect();
        format!("{}/auth/login?from_url={}", self.base_url, encoded)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::mock::MockEntityStore;
    use serde_json::json;

    #[test]
    fn sort_key_parses_direction() {
        let key: SortKey = "-judgment_date".parse().unwrap();
        assert_eq!(key, SortKey::descending("judgment_date"));
        assert_eq!(key.to_string(), "-judgment_date");

        let asc: SortKey = "name".parse().unwrap();
        assert_eq!(asc.order, SortOrder::Ascending);
        assert!("-".parse::<SortKey>().is_err());
        assert!("name; drop".parse::<SortKey>().is_err());
    }

    #[tokio::test]
    async fn typed_list_uses_entity_defaults_and_skips_bad_rows() {
        let store = MockEntityStore::with(
            "LegalCase",
            vec![
                json!({ "id": "c1", "case_title": "Maneka Gandhi v. Union of India" }),
                json!({ "id": 7, "case_title": ["not", "a", "string"] }),
                json!({ "id": "c2" })
            ]
        );
        let cases: Vec<LegalCase> = list_entities(&store, None, None).await.unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(
            store.calls.lock().unwrap()[0],
            ("LegalCase".to_string(), "-judgment_date".to_string(), 10)
        );
    }

    #[tokio::test]
    async fn explicit_sort_and_limit_are_forwarded() {
        let store = MockEntityStore::default();
        let _: Vec<LegalNews> = list_entities(&store, Some("headline".parse().unwrap()), Some(5))
            .await
            .unwrap();
        assert_eq!(store.calls.lock().unwrap()[0], ("LegalNews".to_string(), "headline".to_string(), 5));
    }

    fn expert(name: &str, specs: &[&str], location: &str) -> LegalExpert {
        LegalExpert {
            name: Some(name.into()),
            specialization: specs.iter().map(|s| s.to_string()).collect(),
            location: Some(location.into()),
            ..Default::default()
        }
    }

    #[test]
    fn expert_search_matches_name_specialization_or_location() {
        let experts = vec![
            expert("Adv. Priya Sharma", &["Tax Law"], "Mumbai"),
            expert("Adv. Rohan Iyer", &["Family Law", "Property"], "Chennai"),
        ];
        assert_eq!(filter_experts(&experts, "priya").len(), 1);
        assert_eq!(filter_experts(&experts, "PROPERTY").len(), 1);
        assert_eq!(filter_experts(&experts, "chennai")[0].name.as_deref(), Some("Adv. Rohan Iyer"));
        assert_eq!(filter_experts(&experts, "").len(), 2);
        assert!(filter_experts(&experts, "delhi").is_empty());
    }

    #[test]
    fn news_categories_and_filter() {
        let news = vec![
            LegalNews { category: Some("Supreme Court".into()), ..Default::default() },
            LegalNews { category: Some("High Courts".into()), ..Default::default() },
            LegalNews { category: Some("Supreme Court".into()), ..Default::default() },
            LegalNews::default(),
        ];
        assert_eq!(news_categories(&news), vec!["all", "Supreme Court", "High Courts"]);
        assert_eq!(filter_news(&news, "Supreme Court").len(), 2);
        assert_eq!(filter_news(&news, ALL_CATEGORIES).len(), 4);
    }

    #[test]
    fn document_filter_combines_search_and_category() {
        let docs = vec![
            LegalDocument {
                name: "Employment Agreement Template".into(),
                doc_type: Some("Contract".into()),
                tags: vec!["HR".into()],
                ..Default::default()
            },
            LegalDocument {
                name: "Non-Disclosure Agreement (NDA)".into(),
                doc_type: Some("Agreement".into()),
                tags: vec!["Confidentiality".into()],
                ..Default::default()
            },
        ];
        assert_eq!(filter_documents(&docs, "agreement", ALL_CATEGORIES).len(), 2);
        assert_eq!(filter_documents(&docs, "agreement", "Contract").len(), 1);
        assert_eq!(filter_documents(&docs, "hr", "all").len(), 1);
        assert!(filter_documents(&docs, "deed", "all").is_empty());
    }

    #[test]
    fn sample_library_filters_by_type() {
        let docs = sample_documents();
        assert_eq!(docs.len(), 4);
        assert_eq!(filter_documents(&docs, "", "Corporate")[0].name, "Company Incorporation Documents");
        assert_eq!(filter_documents(&docs, "real estate", ALL_CATEGORIES).len(), 1);
    }

    #[test]
    fn login_url_encodes_return_path() {
        let store = HttpEntityStore::new("https://entities.example.test/".into(), None);
        assert_eq!(
            store.login_url("/assistant?voice=a b"),
            "https://entities.example.test/auth/login?from_url=%2Fassistant%3Fvoice%3Da+b"
        );
    }

    #[tokio::test]
    async fn me_without_token_is_anonymous() {
        let store = HttpEntityStore::new("http://127.0.0.1:9".into(), None);
        assert_eq!(store.me(None).await.unwrap(), None);
    }
}
