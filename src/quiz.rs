use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::fmt;

use crate::projection::LatLng;

/// Number of wrong options shown next to the correct one.
pub const DEFAULT_DISTRACTORS: usize = 3;

/// Subject area of a quiz. Each domain keeps its own progress record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuizDomain {
    Prefecture,
    Municipality,
    Oaza,
    Road,
    River,
    AreaCode,
    Module,
}

impl QuizDomain {
    pub const ALL: [QuizDomain; 7] = [
        QuizDomain::Prefecture,
        QuizDomain::Municipality,
        QuizDomain::Oaza,
        QuizDomain::Road,
        QuizDomain::River,
        QuizDomain::AreaCode,
        QuizDomain::Module,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuizDomain::Prefecture => "prefecture",
            QuizDomain::Municipality => "municipality",
            QuizDomain::Oaza => "oaza",
            QuizDomain::Road => "road",
            QuizDomain::River => "river",
            QuizDomain::AreaCode => "area-code",
            QuizDomain::Module => "module",
        }
    }
}

impl fmt::Display for QuizDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule for comparing a submitted answer with the accepted identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum AnswerScheme {
    /// Exact match on a prefecture code.
    PrefectureCode,
    /// Exact match on a display name. Only unambiguous once the pool has been
    /// scoped to a single prefecture.
    MunicipalityName,
    /// Exact match on a boundary feature code; tells same-named wards of
    /// different cities apart.
    FeatureCode,
    /// Exact match on a pre-authored option identifier.
    OptionId,
}

impl AnswerScheme {
    /// Code matching supersedes name matching whenever the data has codes.
    pub fn for_regions(has_codes: bool) -> Self {
        if has_codes {
            AnswerScheme::FeatureCode
        } else {
            AnswerScheme::MunicipalityName
        }
    }

    pub fn compares_codes(&self) -> bool {
        !matches!(self, AnswerScheme::MunicipalityName)
    }

    pub fn matches(&self, accepted: &[String], answer: &Answer) -> bool {
        let submitted = match answer {
            Answer::Choice(id) => id.as_str(),
            Answer::Region { code, name } => {
                if self.compares_codes() {
                    code.as_deref().unwrap_or(name)
                } else {
                    name
                }
            }
        };

        accepted.iter().any(|id| id == submitted)
    }
}

/// A submitted answer: an option picked from the list, or a region clicked on the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Choice(String),
    Region { code: Option<String>, name: String },
}

impl Answer {
    pub fn choice(id: impl Into<String>) -> Self {
        Answer::Choice(id.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QuizOption {
    pub id: String,
    pub label: String,
}

impl QuizOption {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// What the player is asked about.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Prompt {
    pub text: String,
    /// Secondary line such as a reading or a parent municipality.
    pub detail: Option<String>,
    /// Marker to place on the map.
    pub location: Option<LatLng>,
    /// Region codes to highlight while the question is shown.
    pub highlight: Vec<String>,
}

impl Prompt {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_detail(mut self, detail: Option<String>) -> Self {
        self.detail = detail;
        self
    }

    pub fn with_location(mut self, location: LatLng) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_highlight(mut self, codes: Vec<String>) -> Self {
        self.highlight = codes;
        self
    }
}

/// One generated trial.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QuizQuestion {
    pub prompt: Prompt,
    pub correct_answer_id: String,
    /// Every identifier scored as correct; always contains `correct_answer_id`.
    pub accepted_ids: Vec<String>,
    pub distractors: Vec<QuizOption>,
    /// Correct option plus distractors in display order, fixed for the
    /// lifetime of the question.
    pub options: Vec<QuizOption>,
    pub scheme: AnswerScheme,
    /// Shown once the question has been answered.
    #[serde(default)]
    pub explanation: Option<String>,
}

impl QuizQuestion {
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        let explanation = explanation.into();
        self.explanation = (!explanation.is_empty()).then_some(explanation);
        self
    }

    pub fn is_correct(&self, answer: &Answer) -> bool {
        self.scheme.matches(&self.accepted_ids, answer)
    }

    pub fn distractor_ids(&self) -> impl Iterator<Item = &str> {
        self.distractors.iter().map(|option| option.id.as_str())
    }

    pub fn correct_index(&self) -> Option<usize> {
        self.options
            .iter()
            .position(|option| option.id == self.correct_answer_id)
    }

    pub fn correct_option(&self) -> Option<&QuizOption> {
        self.correct_index().map(|index| &self.options[index])
    }
}

/// Narrowing of the entities eligible as quiz subjects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Scope {
    National,
    Region(String),
    Prefecture(String),
    Municipality(String),
}

impl Scope {
    /// Key under which per-scope scores are kept, if the scope has one.
    pub fn progress_key(&self) -> Option<&str> {
        match self {
            Scope::Prefecture(code) | Scope::Municipality(code) => Some(code),
            Scope::National | Scope::Region(_) => None,
        }
    }

    pub fn clear_segment(&self) -> String {
        match self {
            Scope::National => "all".to_string(),
            Scope::Region(id) => format!("region_{id}"),
            Scope::Prefecture(code) => format!("pref_{code}"),
            Scope::Municipality(code) => format!("muni_{code}"),
        }
    }
}

/// Key marking a perfect run of one exact quiz configuration.
pub fn clear_key(domain: QuizDomain, scope: &Scope, count: usize) -> String {
    format!("{}:{}:{}", domain.as_str(), scope.clear_segment(), count)
}

/// How many questions to draw and how many distractors each gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Draw {
    pub count: usize,
    pub distractors: usize,
}

impl Draw {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            distractors: DEFAULT_DISTRACTORS,
        }
    }

    pub fn with_distractors(mut self, distractors: usize) -> Self {
        self.distractors = distractors;
        self
    }
}

/// Uniformly shuffles `pool` and keeps the first `count` entries.
///
/// Asking for more than the pool holds returns the whole pool.
pub fn sample<T: Clone, R: Rng + ?Sized>(rng: &mut R, pool: &[T], count: usize) -> Vec<T> {
    if count > pool.len() {
        log::debug!(
            "requested {count} questions from a pool of {}; clamping",
            pool.len()
        );
    }

    let mut picked: Vec<T> = pool.to_vec();
    picked.shuffle(rng);
    picked.truncate(count);
    picked
}

/// Assembles a question, drawing distractors from `universe` minus every
/// accepted identifier. Options are shuffled once here and never again.
pub fn build_question<R: Rng + ?Sized>(
    rng: &mut R,
    prompt: Prompt,
    correct: QuizOption,
    accepted: Vec<String>,
    universe: &[QuizOption],
    scheme: AnswerScheme,
    distractor_count: usize,
) -> QuizQuestion {
    let mut accepted_ids = accepted;
    if !accepted_ids.contains(&correct.id) {
        accepted_ids.push(correct.id.clone());
    }

    let mut seen: HashSet<&str> = accepted_ids.iter().map(String::as_str).collect();
    let mut candidates: Vec<&QuizOption> = universe
        .iter()
        .filter(|option| seen.insert(option.id.as_str()))
        .collect();

    candidates.shuffle(rng);
    let distractors: Vec<QuizOption> = candidates
        .into_iter()
        .take(distractor_count)
        .cloned()
        .collect();

    let mut options = Vec::with_capacity(distractors.len() + 1);
    options.push(correct.clone());
    options.extend(distractors.iter().cloned());
    options.shuffle(rng);

    QuizQuestion {
        prompt,
        correct_answer_id: correct.id,
        accepted_ids,
        distractors,
        options,
        scheme,
        explanation: None,
    }
}
