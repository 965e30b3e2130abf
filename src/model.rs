// used to share survey context between code lists and worker threads
use std::sync::Arc;

// used to print out readable forms of a record
use std::fmt;

// used to order model versions
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type Identifier = i64;

// ------------- LanguageSpecificText -------------
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LanguageSpecificText {
    language: String,
    text: String,
}
impl LanguageSpecificText {
    /// Returns `None` for empty text, since an absent language must not
    /// produce an entry.
    pub fn new(language: impl Into<String>, text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            language: language.into(),
            text,
        })
    }
    pub fn language(&self) -> &str {
        &self.language
    }
    pub fn text(&self) -> &str {
        &self.text
    }
}
impl fmt::Display for LanguageSpecificText {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.language, self.text)
    }
}

// ------------- ModelVersion -------------
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelVersion {
    pub id: Identifier,
    pub name: String,
    pub date: Option<NaiveDate>,
}
impl ModelVersion {
    pub fn new(id: Identifier, name: impl Into<String>, date: Option<NaiveDate>) -> Self {
        Self {
            id,
            name: name.into(),
            date,
        }
    }
}

// ------------- Survey -------------
/// The survey context a session runs against. Consumed, never stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Survey {
    pub id: Identifier,
    /// A survey still under design is scoped by a different column.
    pub work: bool,
    pub languages: Vec<String>,
    pub versions: Vec<ModelVersion>,
}
impl Survey {
    pub fn new(id: Identifier, work: bool, languages: Vec<String>) -> Self {
        Self {
            id,
            work,
            languages,
            versions: Vec::new(),
        }
    }
    pub fn with_versions(mut self, versions: Vec<ModelVersion>) -> Self {
        self.versions = versions;
        self
    }
    pub fn default_language(&self) -> Option<&str> {
        self.languages.first().map(String::as_str)
    }
    /// Position of a version in the survey's history: by date first, then by
    /// the order the versions were declared in.
    pub fn version_rank(&self, version: Identifier) -> Option<(Option<NaiveDate>, usize)> {
        self.versions
            .iter()
            .position(|v| v.id == version)
            .map(|position| (self.versions[position].date, position))
    }
}

// ------------- CodeList -------------
#[derive(Clone, Debug)]
pub struct CodeList {
    pub id: Identifier,
    pub name: String,
    pub survey: Arc<Survey>,
}
impl CodeList {
    pub fn new(id: Identifier, name: impl Into<String>, survey: Arc<Survey>) -> Self {
        Self {
            id,
            name: name.into(),
            survey,
        }
    }
}

// ------------- CodeListItem -------------
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CodeListItem {
    id: Identifier,
    code_list: Identifier,
    code: String,
    qualifiable: bool,
    labels: Vec<LanguageSpecificText>,
    descriptions: Vec<LanguageSpecificText>,
    sort_order: i64,
    since_version: Option<Identifier>,
    deprecated_version: Option<Identifier>,
    parent: Option<Identifier>,
}
impl CodeListItem {
    pub fn new(id: Identifier, code_list: Identifier, code: String) -> Self {
        Self {
            id,
            code_list,
            code,
            qualifiable: false,
            labels: Vec::new(),
            descriptions: Vec::new(),
            sort_order: 0,
            since_version: None,
            deprecated_version: None,
            parent: None,
        }
    }
    pub fn set_qualifiable(&mut self, qualifiable: bool) {
        self.qualifiable = qualifiable;
    }
    pub fn set_labels(&mut self, labels: Vec<LanguageSpecificText>) {
        self.labels = labels;
    }
    pub fn set_descriptions(&mut self, descriptions: Vec<LanguageSpecificText>) {
        self.descriptions = descriptions;
    }
    pub fn set_sort_order(&mut self, sort_order: i64) {
        self.sort_order = sort_order;
    }
    pub fn set_versions(&mut self, since: Option<Identifier>, deprecated: Option<Identifier>) {
        self.since_version = since;
        self.deprecated_version = deprecated;
    }
    pub fn set_parent(&mut self, parent: Option<Identifier>) {
        self.parent = parent;
    }
    pub fn id(&self) -> Identifier {
        self.id
    }
    pub fn code_list(&self) -> Identifier {
        self.code_list
    }
    pub fn code(&self) -> &str {
        &self.code
    }
    pub fn qualifiable(&self) -> bool {
        self.qualifiable
    }
    pub fn labels(&self) -> &[LanguageSpecificText] {
        &self.labels
    }
    pub fn descriptions(&self) -> &[LanguageSpecificText] {
        &self.descriptions
    }
    pub fn label(&self, language: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|l| l.language() == language)
            .map(LanguageSpecificText::text)
    }
    pub fn default_label(&self) -> Option<&str> {
        self.labels.first().map(LanguageSpecificText::text)
    }
    pub fn sort_order(&self) -> i64 {
        self.sort_order
    }
    pub fn since_version(&self) -> Option<Identifier> {
        self.since_version
    }
    pub fn deprecated_version(&self) -> Option<Identifier> {
        self.deprecated_version
    }
    pub fn parent(&self) -> Option<Identifier> {
        self.parent
    }
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}
impl fmt::Display for CodeListItem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.default_label() {
            Some(label) => write!(f, "{} - {}", self.code, label),
            None => write!(f, "{}", self.code),
        }
    }
}

// ------------- TaxonOccurrence -------------
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaxonOccurrence {
    pub taxon_id: Identifier,
    pub code: String,
    pub scientific_name: String,
    pub vernacular_name: Option<String>,
    pub language_code: Option<String>,
    pub language_variety: Option<String>,
}
impl fmt::Display for TaxonOccurrence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} [{}]", self.scientific_name, self.code)?;
        if let Some(vernacular) = &self.vernacular_name {
            write!(f, " \"{}\"", vernacular)?;
            if let Some(language) = &self.language_code {
                write!(f, " ({})", language)?;
            }
        }
        Ok(())
    }
}

// ------------- SearchRequest -------------
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SearchCriterion {
    Code,
    ScientificName,
    VernacularName,
    /// A criterion name the engine does not know how to search by.
    Other(String),
}
impl SearchCriterion {
    pub fn name(&self) -> &str {
        match self {
            Self::Code => "code",
            Self::ScientificName => "scientific_name",
            Self::VernacularName => "vernacular_name",
            Self::Other(name) => name,
        }
    }
}
impl From<&str> for SearchCriterion {
    fn from(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "code" => Self::Code,
            "scientific_name" | "scientific" => Self::ScientificName,
            "vernacular_name" | "vernacular" => Self::VernacularName,
            _ => Self::Other(name.to_owned()),
        }
    }
}
impl fmt::Display for SearchCriterion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchRequest {
    /// The search surface (input field) that issued the request.
    pub field: String,
    pub criterion: SearchCriterion,
    pub survey: Identifier,
    pub taxonomy: String,
    pub text: String,
    pub max_results: u32,
}
impl SearchRequest {
    pub fn new(
        field: impl Into<String>,
        criterion: SearchCriterion,
        survey: Identifier,
        taxonomy: impl Into<String>,
        text: impl Into<String>,
        max_results: u32,
    ) -> Self {
        Self {
            field: field.into(),
            criterion,
            survey,
            taxonomy: taxonomy.into(),
            text: text.into(),
            max_results,
        }
    }
}
