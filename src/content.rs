use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::projection::LatLng;
use crate::quiz::QuizOption;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Municipality {
    pub name: String,
    pub reading: String,
    pub lat: f64,
    pub lng: f64,
    /// Stable municipality code, when the reference data carries one.
    #[serde(default)]
    pub code: Option<String>,
}

impl Municipality {
    pub fn location(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MunicipalityPrefecture {
    pub code: String,
    pub name: String,
    pub region: String,
    #[serde(default)]
    pub municipalities: Vec<Municipality>,
}

impl MunicipalityPrefecture {
    pub fn as_option(&self) -> QuizOption {
        QuizOption::new(self.code.clone(), self.name.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Road {
    pub name: String,
    pub category: String,
    /// Prefecture codes the road passes through.
    pub prefectures: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct River {
    pub name: String,
    #[serde(default)]
    pub reading: Option<String>,
    pub prefectures: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaCode {
    pub code: String,
    pub city: String,
    pub pref_code: String,
    pub region: String,
}

/// Pre-authored curriculum question with fixed options.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyQuestion {
    pub id: String,
    pub category: String,
    #[serde(default)]
    pub difficulty: u8,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    #[serde(default)]
    pub explanation: String,
}

/// All static reference records the quizzes draw from.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Content {
    pub prefectures: Vec<MunicipalityPrefecture>,
    pub roads: Vec<Road>,
    pub rivers: Vec<River>,
    pub area_codes: Vec<AreaCode>,
    pub study_questions: Vec<StudyQuestion>,
}

#[derive(Debug, thiserror::Error)]
pub enum ContentLoadError {
    #[error("failed to read content file at {path}: {source}")]
    ReadError {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse content file at {path}: {source}")]
    ParseError {
        path: String,
        source: serde_json::Error,
    },
}

impl PartialEq for ContentLoadError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::ReadError { path: left, .. }, Self::ReadError { path: right, .. }) => {
                left == right
            }
            (Self::ParseError { path: left, .. }, Self::ParseError { path: right, .. }) => {
                left == right
            }
            _ => false,
        }
    }
}

impl Eq for ContentLoadError {}

impl Content {
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Loads a single bundled content document.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ContentLoadError> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|source| ContentLoadError::ReadError {
            path: path.display().to_string(),
            source,
        })?;

        serde_json::from_slice(&data).map_err(|source| ContentLoadError::ParseError {
            path: path.display().to_string(),
            source,
        })
    }

    /// Loads one array file per section (`prefectures.json`, `roads.json`,
    /// `rivers.json`, `area-codes.json`, `study-questions.json`). Missing
    /// files leave their section empty.
    pub fn from_directory(root: impl AsRef<Path>) -> Result<Self, ContentLoadError> {
        let root = root.as_ref();

        Ok(Self {
            prefectures: read_section(root, "prefectures.json")?,
            roads: read_section(root, "roads.json")?,
            rivers: read_section(root, "rivers.json")?,
            area_codes: read_section(root, "area-codes.json")?,
            study_questions: read_section(root, "study-questions.json")?,
        })
    }

    /// Prefecture code to display name.
    pub fn prefecture_names(&self) -> BTreeMap<String, String> {
        self.prefectures
            .iter()
            .map(|prefecture| (prefecture.code.clone(), prefecture.name.clone()))
            .collect()
    }

    pub fn prefecture(&self, code: &str) -> Option<&MunicipalityPrefecture> {
        self.prefectures
            .iter()
            .find(|prefecture| prefecture.code == code)
    }

    pub fn prefectures_in(&self, region: &str) -> Vec<&MunicipalityPrefecture> {
        self.prefectures
            .iter()
            .filter(|prefecture| prefecture.region == region)
            .collect()
    }

    pub fn regions(&self) -> BTreeSet<&str> {
        self.prefectures
            .iter()
            .map(|prefecture| prefecture.region.as_str())
            .collect()
    }

    pub fn road_categories(&self) -> BTreeSet<&str> {
        self.roads.iter().map(|road| road.category.as_str()).collect()
    }

    pub fn study_questions_in(&self, category: &str) -> Vec<StudyQuestion> {
        self.study_questions
            .iter()
            .filter(|question| question.category == category)
            .cloned()
            .collect()
    }
}

fn read_section<T: DeserializeOwned>(root: &Path, file: &str) -> Result<Vec<T>, ContentLoadError> {
    let path = root.join(file);

    let data = match fs::read(&path) {
        Ok(data) => data,
        Err(error) if error.kind() == ErrorKind::NotFound => {
            log::debug!("content section {} not present", path.display());
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(ContentLoadError::ReadError {
                path: path.display().to_string(),
                source,
            });
        }
    };

    serde_json::from_slice(&data).map_err(|source| ContentLoadError::ParseError {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFECTURES: &str = r#"[
        {
            "code": "13",
            "name": "東京都",
            "region": "kanto",
            "municipalities": [
                { "name": "八王子市", "reading": "はちおうじし", "lat": 35.66, "lng": 139.32 }
            ]
        },
        { "code": "14", "name": "神奈川県", "region": "kanto" },
        { "code": "27", "name": "大阪府", "region": "kinki" }
    ]"#;

    #[test]
    fn loads_sections_from_directory() {
        let root = tempfile::tempdir().expect("temporary directory should be created");
        fs::write(root.path().join("prefectures.json"), PREFECTURES)
            .expect("prefectures should be written");
        fs::write(
            root.path().join("area-codes.json"),
            r#"[{ "code": "03", "city": "東京23区", "prefCode": "13", "region": "kanto" }]"#,
        )
        .expect("area codes should be written");

        let content = Content::from_directory(root.path()).expect("content should load");

        assert_eq!(content.prefectures.len(), 3);
        assert_eq!(content.area_codes[0].pref_code, "13");
        assert!(content.roads.is_empty());
        assert!(content.prefectures[1].municipalities.is_empty());
        assert_eq!(
            content.prefectures_in("kanto")
                .iter()
                .map(|prefecture| prefecture.code.as_str())
                .collect::<Vec<_>>(),
            vec!["13", "14"]
        );
        assert_eq!(content.regions().into_iter().collect::<Vec<_>>(), vec!["kanto", "kinki"]);
    }

    #[test]
    fn malformed_section_reports_its_path() {
        let root = tempfile::tempdir().expect("temporary directory should be created");
        let path = root.path().join("roads.json");
        fs::write(&path, "{ not json").expect("roads should be written");

        let error = Content::from_directory(root.path()).expect_err("parse should fail");
        assert!(matches!(error, ContentLoadError::ParseError { .. }));
        assert!(error.to_string().contains("roads.json"));
    }

    #[test]
    fn missing_document_is_a_read_error() {
        let root = tempfile::tempdir().expect("temporary directory should be created");
        let path = root.path().join("content.json");

        let error = Content::from_path(&path).expect_err("missing file should error");
        assert!(matches!(error, ContentLoadError::ReadError { .. }));
    }

    #[test]
    fn single_document_uses_camel_case_sections() {
        let content = Content::from_json_str(
            r#"{ "areaCodes": [], "studyQuestions": [
                { "id": "q1", "category": "basics", "question": "?", "options": ["a", "b"], "correctAnswer": 1 }
            ] }"#,
        )
        .expect("document should parse");

        assert_eq!(content.study_questions[0].correct_answer, 1);
        assert_eq!(content.study_questions_in("basics").len(), 1);
        assert!(content.prefecture_names().is_empty());
    }
}
