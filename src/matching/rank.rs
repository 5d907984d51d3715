// src/matching/rank.rs
//! Scores the course catalog against a market signal.

use crate::catalog::CourseRecord;
use crate::market::MarketSignal;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    fn from_score(score: f64) -> Self {
        if score >= 7.0 {
            Priority::High
        } else if score >= 3.0 {
            Priority::Medium
        } else {
            Priority::Low
        }
    }
}

/// A course annotated with its request-relative relevance.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCourse {
    pub course: CourseRecord,
    /// 0-10, relative to the best overlap in this request's catalog.
    pub score: f64,
    pub tier: Priority,
    pub rationale: String,
    pub matched_skills: Vec<String>,
}

/// Rank the catalog against the signal.
///
/// Overlap is weighted by each shared skill's frequency rank in the signal,
/// then normalized to 0-10 against the best course of this request. Ties
/// prefer courses with fewer prerequisites (takeable sooner). An empty
/// skill signal falls back to keyword heuristics against the role string.
pub fn rank(catalog: &[CourseRecord], signal: &MarketSignal) -> Vec<ScoredCourse> {
    let weights = rank_weights(signal);

    let mut raw: Vec<(usize, f64, Vec<String>)> = catalog
        .iter()
        .enumerate()
        .map(|(i, course)| {
            let (overlap, matched) = if weights.is_empty() {
                catalog_only_overlap(course, &signal.role)
            } else {
                skill_overlap(course, &weights)
            };
            (i, overlap, matched)
        })
        .collect();

    let max_overlap = raw
        .iter()
        .map(|(_, overlap, _)| *overlap)
        .fold(0.0_f64, f64::max);

    let mut scored: Vec<ScoredCourse> = raw
        .drain(..)
        .map(|(i, overlap, matched)| {
            let course = catalog[i].clone();
            let score = if max_overlap > 0.0 {
                round1(10.0 * overlap / max_overlap)
            } else {
                0.0
            };
            let tier = Priority::from_score(score);
            let rationale = rationale_for(&course, tier, &matched, &signal.role);
            ScoredCourse {
                course,
                score,
                tier,
                rationale,
                matched_skills: matched,
            }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.course.prerequisites.len().cmp(&b.course.prerequisites.len()))
            .then_with(|| a.course.code.cmp(&b.course.code))
    });

    debug!(
        "Ranked {} courses for '{}' ({} with skill overlap)",
        scored.len(),
        signal.role,
        scored.iter().filter(|s| !s.matched_skills.is_empty()).count()
    );
    scored
}

/// Weight per signal skill: higher-frequency market skills contribute more.
fn rank_weights(signal: &MarketSignal) -> HashMap<String, f64> {
    let n = signal.skills.len();
    signal
        .skills
        .iter()
        .enumerate()
        .map(|(i, skill)| (skill.name.to_lowercase(), (n - i) as f64))
        .collect()
}

fn skill_overlap(course: &CourseRecord, weights: &HashMap<String, f64>) -> (f64, Vec<String>) {
    let mut overlap = 0.0;
    let mut matched = Vec::new();
    for skill in &course.skills {
        if let Some(weight) = weights.get(&skill.to_lowercase()) {
            overlap += weight;
            matched.push(skill.clone());
        }
    }
    (overlap, matched)
}

/// Catalog-only heuristic for empty signals: match role words against the
/// course's skills, title, and description.
fn catalog_only_overlap(course: &CourseRecord, role: &str) -> (f64, Vec<String>) {
    let role_words: Vec<String> = role
        .to_lowercase()
        .split_whitespace()
        .filter(|w| w.len() > 2)
        .map(str::to_string)
        .collect();

    let title = course.title.to_lowercase();
    let description = course.description.to_lowercase();
    let mut overlap = 0.0;
    let mut matched = Vec::new();

    for word in &role_words {
        if course.skills.iter().any(|s| s.to_lowercase().contains(word)) {
            overlap += 2.0;
        }
        if title.contains(word) || description.contains(word) {
            overlap += 1.0;
        }
    }
    // Surface the course's own skills as the explanation, since the signal
    // contributed none.
    if overlap > 0.0 {
        matched.extend(course.skills.iter().take(3).cloned());
    }

    (overlap, matched)
}

fn rationale_for(
    course: &CourseRecord,
    tier: Priority,
    matched: &[String],
    role: &str,
) -> String {
    if matched.is_empty() {
        return format!(
            "{} does not address the skills currently requested for {} roles",
            course.code, role
        );
    }

    let listed = join_skills(matched);
    match tier {
        Priority::High => format!(
            "Builds {listed}, among the most requested skills for {role} roles"
        ),
        Priority::Medium => format!(
            "Covers {listed}, which appear regularly in {role} postings"
        ),
        Priority::Low => format!(
            "Touches on {listed}, a minor part of current {role} demand"
        ),
    }
}

fn join_skills(skills: &[String]) -> String {
    let shown: Vec<&str> = skills.iter().take(3).map(String::as_str).collect();
    match shown.as_slice() {
        [one] => (*one).to_string(),
        [one, two] => format!("{one} and {two}"),
        [one, two, three] => format!("{one}, {two} and {three}"),
        _ => String::new(),
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
