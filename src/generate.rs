//! One question generator per quiz domain.
//!
//! Every generator samples its scoped pool with [`sample`] and builds each
//! question with [`build_question`], so distractors always come from the
//! same option universe as the scope and never include an accepted answer.

use std::collections::{BTreeMap, HashSet};

use rand::Rng;
use rand::seq::SliceRandom;

use crate::boundary::{BoundaryCollection, GeoRegion};
use crate::content::{AreaCode, Municipality, MunicipalityPrefecture, River, Road, StudyQuestion};
use crate::quiz::{AnswerScheme, Draw, Prompt, QuizOption, QuizQuestion, Scope, build_question, sample};

/// Upper bound on curriculum questions asked in one session.
pub const MAX_STUDY_QUESTIONS: usize = 10;

/// Prefectures of `scope`, or `None` when the scope is narrower than a region.
fn prefectures_in_scope<'a>(
    prefectures: &'a [MunicipalityPrefecture],
    scope: &Scope,
) -> Option<Vec<&'a MunicipalityPrefecture>> {
    match scope {
        Scope::National => Some(prefectures.iter().collect()),
        Scope::Region(region) => Some(
            prefectures
                .iter()
                .filter(|prefecture| &prefecture.region == region)
                .collect(),
        ),
        Scope::Prefecture(_) | Scope::Municipality(_) => None,
    }
}

fn options_for(prefectures: &[&MunicipalityPrefecture]) -> Vec<QuizOption> {
    prefectures.iter().map(|prefecture| prefecture.as_option()).collect()
}

/// "Where is this prefecture?" over the prefectures of a national or regional scope.
pub fn prefecture_questions<R: Rng + ?Sized>(
    rng: &mut R,
    prefectures: &[MunicipalityPrefecture],
    scope: &Scope,
    draw: Draw,
) -> Vec<QuizQuestion> {
    let Some(targets) = prefectures_in_scope(prefectures, scope) else {
        log::debug!("prefecture quiz has no pool for scope {scope:?}");
        return Vec::new();
    };
    let universe = options_for(&targets);

    sample(rng, &targets, draw.count)
        .into_iter()
        .map(|prefecture| {
            let mut prompt = Prompt::text(prefecture.name.clone());
            if let Some(first) = prefecture.municipalities.first() {
                prompt = prompt.with_location(first.location());
            }

            build_question(
                rng,
                prompt,
                prefecture.as_option(),
                Vec::new(),
                &universe,
                AnswerScheme::PrefectureCode,
                draw.distractors,
            )
        })
        .collect()
}

/// Dispatches a municipality quiz on its scope: national and regional scopes
/// ask for the prefecture, a prefecture scope asks for the municipality itself.
pub fn municipality_questions<R: Rng + ?Sized>(
    rng: &mut R,
    prefectures: &[MunicipalityPrefecture],
    scope: &Scope,
    draw: Draw,
) -> Vec<QuizQuestion> {
    match scope {
        Scope::Prefecture(code) => match prefectures.iter().find(|prefecture| &prefecture.code == code) {
            Some(prefecture) => municipalities_in_prefecture(rng, prefecture, draw),
            None => {
                log::debug!("unknown prefecture {code}; no municipality questions");
                Vec::new()
            }
        },
        _ => match prefectures_in_scope(prefectures, scope) {
            Some(targets) => municipality_to_prefecture(rng, &targets, draw),
            None => Vec::new(),
        },
    }
}

/// "Which prefecture is this municipality in?"
pub fn municipality_to_prefecture<R: Rng + ?Sized>(
    rng: &mut R,
    prefectures: &[&MunicipalityPrefecture],
    draw: Draw,
) -> Vec<QuizQuestion> {
    let entries: Vec<(&MunicipalityPrefecture, &Municipality)> = prefectures
        .iter()
        .flat_map(|prefecture| {
            prefecture
                .municipalities
                .iter()
                .map(move |municipality| (*prefecture, municipality))
        })
        .collect();
    let universe = options_for(prefectures);

    sample(rng, &entries, draw.count)
        .into_iter()
        .map(|(prefecture, municipality)| {
            let prompt = Prompt::text(municipality.name.clone())
                .with_detail(Some(municipality.reading.clone()))
                .with_location(municipality.location());

            build_question(
                rng,
                prompt,
                prefecture.as_option(),
                Vec::new(),
                &universe,
                AnswerScheme::PrefectureCode,
                draw.distractors,
            )
        })
        .collect()
}

/// "Which municipality is this?" within one prefecture. Matches by code
/// when every municipality carries one, by name otherwise. Repeated names
/// are labelled with their code.
pub fn municipalities_in_prefecture<R: Rng + ?Sized>(
    rng: &mut R,
    prefecture: &MunicipalityPrefecture,
    draw: Draw,
) -> Vec<QuizQuestion> {
    let municipalities = &prefecture.municipalities;
    let has_codes = !municipalities.is_empty()
        && municipalities
            .iter()
            .all(|municipality| municipality.code.is_some());
    let scheme = AnswerScheme::for_regions(has_codes);

    let mut seen = HashSet::new();
    let disambiguate = scheme.compares_codes()
        && municipalities
            .iter()
            .any(|municipality| !seen.insert(municipality.name.as_str()));

    let label = |municipality: &Municipality| match &municipality.code {
        Some(code) if disambiguate => format!("{}（{code}）", municipality.name),
        _ => municipality.name.clone(),
    };
    let option = |municipality: &Municipality| {
        let id = match (&municipality.code, scheme.compares_codes()) {
            (Some(code), true) => code.clone(),
            _ => municipality.name.clone(),
        };
        QuizOption::new(id, label(municipality))
    };
    let universe: Vec<QuizOption> = municipalities.iter().map(option).collect();

    sample(rng, municipalities, draw.count)
        .iter()
        .map(|municipality| {
            let prompt = Prompt::text(label(municipality))
                .with_detail(Some(municipality.reading.clone()))
                .with_location(municipality.location());

            build_question(
                rng,
                prompt,
                option(municipality),
                Vec::new(),
                &universe,
                scheme,
                draw.distractors,
            )
        })
        .collect()
}

/// Map-click questions over boundary regions (municipalities of a prefecture
/// or districts of a municipality). Always matched by feature code; labels
/// carry the parent municipality when names repeat.
pub fn boundary_questions<R: Rng + ?Sized>(
    rng: &mut R,
    collection: &BoundaryCollection,
    draw: Draw,
) -> Vec<QuizQuestion> {
    let disambiguate = collection.has_duplicate_names();
    let label = |region: &GeoRegion| {
        if disambiguate {
            region.display_label()
        } else {
            region.name.clone()
        }
    };

    let universe: Vec<QuizOption> = collection
        .regions()
        .iter()
        .map(|region| QuizOption::new(region.code.clone(), label(region)))
        .collect();

    sample(rng, collection.regions(), draw.count)
        .iter()
        .map(|region| {
            let prompt = Prompt::text(label(region)).with_detail(region.parent.clone());

            build_question(
                rng,
                prompt,
                QuizOption::new(region.code.clone(), label(region)),
                Vec::new(),
                &universe,
                AnswerScheme::FeatureCode,
                draw.distractors,
            )
        })
        .collect()
}

fn prefecture_universe(names: &BTreeMap<String, String>) -> Vec<QuizOption> {
    names
        .iter()
        .map(|(code, name)| QuizOption::new(code.clone(), name.clone()))
        .collect()
}

/// Picks one of `codes` as the displayed correct option. All of them are accepted.
fn pass_through_question<R: Rng + ?Sized>(
    rng: &mut R,
    prompt: Prompt,
    codes: &[String],
    names: &BTreeMap<String, String>,
    universe: &[QuizOption],
    distractors: usize,
) -> Option<QuizQuestion> {
    let code = codes.choose(rng)?;
    let label = names.get(code).cloned().unwrap_or_else(|| code.clone());

    Some(build_question(
        rng,
        prompt,
        QuizOption::new(code.clone(), label),
        codes.to_vec(),
        universe,
        AnswerScheme::PrefectureCode,
        distractors,
    ))
}

/// "Which prefecture does this road pass through?" Optionally limited to one
/// road category.
pub fn road_to_prefecture<R: Rng + ?Sized>(
    rng: &mut R,
    roads: &[Road],
    names: &BTreeMap<String, String>,
    category: Option<&str>,
    draw: Draw,
) -> Vec<QuizQuestion> {
    let pool: Vec<&Road> = roads
        .iter()
        .filter(|road| !road.prefectures.is_empty())
        .filter(|road| category.is_none_or(|category| road.category == category))
        .collect();
    let universe = prefecture_universe(names);

    sample(rng, &pool, draw.count)
        .into_iter()
        .filter_map(|road| {
            let prompt = Prompt::text(road.name.clone()).with_detail(Some(road.category.clone()));
            pass_through_question(rng, prompt, &road.prefectures, names, &universe, draw.distractors)
        })
        .collect()
}

/// "Which prefecture does this river flow through?"
pub fn river_to_prefecture<R: Rng + ?Sized>(
    rng: &mut R,
    rivers: &[River],
    names: &BTreeMap<String, String>,
    draw: Draw,
) -> Vec<QuizQuestion> {
    let pool: Vec<&River> = rivers
        .iter()
        .filter(|river| !river.prefectures.is_empty())
        .collect();
    let universe = prefecture_universe(names);

    sample(rng, &pool, draw.count)
        .into_iter()
        .filter_map(|river| {
            let prompt = Prompt::text(river.name.clone()).with_detail(river.reading.clone());
            pass_through_question(rng, prompt, &river.prefectures, names, &universe, draw.distractors)
        })
        .collect()
}

/// "Which river flows through the highlighted prefectures?"
pub fn river_identify<R: Rng + ?Sized>(
    rng: &mut R,
    rivers: &[River],
    names: &BTreeMap<String, String>,
    draw: Draw,
) -> Vec<QuizQuestion> {
    let universe: Vec<QuizOption> = rivers
        .iter()
        .map(|river| QuizOption::new(river.name.clone(), river.name.clone()))
        .collect();

    sample(rng, rivers, draw.count)
        .iter()
        .map(|river| {
            let passes: Vec<&str> = river
                .prefectures
                .iter()
                .map(|code| names.get(code).map_or(code.as_str(), String::as_str))
                .collect();
            let prompt = Prompt::text(passes.join("・")).with_highlight(river.prefectures.clone());

            build_question(
                rng,
                prompt,
                QuizOption::new(river.name.clone(), river.name.clone()),
                Vec::new(),
                &universe,
                AnswerScheme::OptionId,
                draw.distractors,
            )
        })
        .collect()
}

/// "Which prefecture uses this telephone area code?" A prefecture scope keeps
/// only that prefecture's codes and draws distractors nationally.
pub fn area_code_to_prefecture<R: Rng + ?Sized>(
    rng: &mut R,
    area_codes: &[AreaCode],
    prefectures: &[MunicipalityPrefecture],
    scope: &Scope,
    draw: Draw,
) -> Vec<QuizQuestion> {
    let (pool, targets): (Vec<&AreaCode>, Vec<&MunicipalityPrefecture>) = match scope {
        Scope::National => (area_codes.iter().collect(), prefectures.iter().collect()),
        Scope::Region(region) => (
            area_codes.iter().filter(|area| &area.region == region).collect(),
            prefectures
                .iter()
                .filter(|prefecture| &prefecture.region == region)
                .collect(),
        ),
        Scope::Prefecture(code) => (
            area_codes.iter().filter(|area| &area.pref_code == code).collect(),
            prefectures.iter().collect(),
        ),
        Scope::Municipality(_) => {
            log::debug!("area-code quiz has no municipality scope");
            return Vec::new();
        }
    };
    let universe = options_for(&targets);
    let names: BTreeMap<&str, &str> = prefectures
        .iter()
        .map(|prefecture| (prefecture.code.as_str(), prefecture.name.as_str()))
        .collect();

    sample(rng, &pool, draw.count)
        .into_iter()
        .map(|area| {
            let label = names
                .get(area.pref_code.as_str())
                .map_or_else(|| area.pref_code.clone(), |name| name.to_string());
            let prompt = Prompt::text(area.code.clone()).with_detail(Some(area.city.clone()));

            build_question(
                rng,
                prompt,
                QuizOption::new(area.pref_code.clone(), label),
                Vec::new(),
                &universe,
                AnswerScheme::PrefectureCode,
                draw.distractors,
            )
        })
        .collect()
}

/// Curriculum questions with fixed options, at most [`MAX_STUDY_QUESTIONS`]
/// per session. Options are reshuffled on every generation and identified by
/// their authored index.
pub fn study_questions<R: Rng + ?Sized>(
    rng: &mut R,
    questions: &[StudyQuestion],
    draw: Draw,
) -> Vec<QuizQuestion> {
    let valid: Vec<&StudyQuestion> = questions
        .iter()
        .filter(|question| {
            let ok = question.correct_answer < question.options.len();
            if !ok {
                log::warn!(
                    "study question {} points at option {} of {}; skipped",
                    question.id,
                    question.correct_answer,
                    question.options.len()
                );
            }
            ok
        })
        .collect();

    sample(rng, &valid, draw.count.min(MAX_STUDY_QUESTIONS))
        .into_iter()
        .map(|question| {
            let universe: Vec<QuizOption> = question
                .options
                .iter()
                .enumerate()
                .map(|(index, label)| QuizOption::new(index.to_string(), label.clone()))
                .collect();
            let correct = universe[question.correct_answer].clone();

            build_question(
                rng,
                Prompt::text(question.question.clone()),
                correct,
                Vec::new(),
                &universe,
                AnswerScheme::OptionId,
                universe.len().saturating_sub(1),
            )
            .with_explanation(question.explanation.clone())
        })
        .collect()
}
