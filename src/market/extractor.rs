// src/market/extractor.rs
//! Turns raw posting text into a structured [`MarketSignal`].
//!
//! Skill matching is exact-phrase with word boundaries: multi-word phrases
//! claim their span before single tokens, so "JavaScript" never counts as
//! "Java" and a vocabulary entry can never fire on a longer unrelated word.

use super::types::{MarketSignal, Posting, Provenance, SalarySummary, SkillCount};
use chrono::Utc;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Known skill phrases, canonical display casing. Multi-word entries are
/// matched greedily before single tokens regardless of order here.
const SKILL_VOCABULARY: &[&str] = &[
    // Multi-word phrases
    "Machine Learning",
    "Deep Learning",
    "Data Science",
    "Data Analysis",
    "Data Visualization",
    "Data Warehousing",
    "Statistical Analysis",
    "Natural Language Processing",
    "Financial Analysis",
    "Financial Modeling",
    "Risk Management",
    "Project Management",
    "Market Research",
    "Content Marketing",
    "Marketing Strategy",
    "Google Analytics",
    "Research Methods",
    "Brain Imaging",
    "A/B Testing",
    "Power BI",
    "Node.js",
    "CI/CD",
    // Single tokens
    "Python",
    "Java",
    "JavaScript",
    "TypeScript",
    "React",
    "Angular",
    "Vue",
    "AWS",
    "Azure",
    "GCP",
    "Docker",
    "Kubernetes",
    "Jenkins",
    "Terraform",
    "Ansible",
    "Git",
    "SQL",
    "MongoDB",
    "PostgreSQL",
    "MySQL",
    "Redis",
    "Pandas",
    "NumPy",
    "TensorFlow",
    "PyTorch",
    "Scikit-learn",
    "Spark",
    "Hadoop",
    "Linux",
    "Bash",
    "Excel",
    "Tableau",
    "Bloomberg",
    "Valuation",
    "MATLAB",
    "Neuroscience",
    "fMRI",
    "EEG",
    "Electrophysiology",
    "SEO",
    "Statistics",
    "Agile",
    "Scrum",
    "Leadership",
];

#[derive(Debug, Clone)]
struct SkillPhrase {
    display: &'static str,
    lowered: String,
}

/// Extracts skill frequencies, a salary summary, and insight strings from a
/// batch of postings.
pub struct SkillExtractor {
    // Sorted longest-first so greedy matching claims phrases before tokens.
    vocabulary: Vec<SkillPhrase>,
}

impl Default for SkillExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SkillExtractor {
    pub fn new() -> Self {
        let mut vocabulary: Vec<SkillPhrase> = SKILL_VOCABULARY
            .iter()
            .map(|display| SkillPhrase {
                display,
                lowered: display.to_lowercase(),
            })
            .collect();
        vocabulary.sort_by(|a, b| b.lowered.len().cmp(&a.lowered.len()));
        Self { vocabulary }
    }

    /// Structure a batch of postings into a live-provenance signal.
    ///
    /// Zero postings is a valid input and yields an empty signal, not an
    /// error; the matching engine handles that case with catalog-only
    /// heuristics.
    pub fn extract(&self, role: &str, location: &str, postings: &[Posting]) -> MarketSignal {
        // Frequency per skill, counting presence once per posting, keyed by
        // first-seen order for stable ties.
        let mut order: Vec<&'static str> = Vec::new();
        let mut counts: Vec<u32> = Vec::new();
        let mut salaries: Vec<(f64, f64)> = Vec::new();
        let mut seniorities: Vec<String> = Vec::new();

        for posting in postings {
            let matched = self.match_skills(&posting.description);
            for display in matched {
                match order.iter().position(|&d| d == display) {
                    Some(i) => counts[i] += 1,
                    None => {
                        order.push(display);
                        counts.push(1);
                    }
                }
            }

            match self.posting_salary(posting) {
                Some(range) => salaries.push(range),
                None => {
                    if posting.salary_text.is_some() {
                        // Ambiguous salary text: skip the posting's salary,
                        // never abort the batch.
                        warn!(
                            "Unparseable salary text in posting '{}': {:?}",
                            posting.title, posting.salary_text
                        );
                    }
                }
            }

            if let Some(level) = &posting.seniority {
                seniorities.push(level.clone());
            }
        }

        let mut skills: Vec<SkillCount> = order
            .iter()
            .zip(&counts)
            .map(|(display, &count)| SkillCount::new(*display, count))
            .collect();
        // Stable sort keeps first-seen order among equal counts.
        skills.sort_by(|a, b| b.count.cmp(&a.count));

        let salary = summarize_salaries(&salaries);
        let insights = build_insights(role, location, postings, &skills, &salary, &seniorities);

        debug!(
            "Extracted {} skills from {} postings for '{}'",
            skills.len(),
            postings.len(),
            role
        );

        MarketSignal {
            role: role.to_string(),
            location: location.to_string(),
            skills,
            salary,
            insights,
            provenance: Provenance::Live,
            generated_at: Utc::now(),
            posting_count: postings.len() as u32,
        }
    }

    /// Skills present in one description, deduplicated, ordered by where
    /// each skill first appears in the text. Longer phrases still claim
    /// their span first; only the reported order follows the text.
    fn match_skills(&self, description: &str) -> Vec<&'static str> {
        let haystack = description.to_lowercase();
        let bytes = haystack.as_bytes();
        let mut claimed: Vec<(usize, usize)> = Vec::new();
        let mut matches: Vec<(usize, &'static str)> = Vec::new();

        for phrase in &self.vocabulary {
            let mut from = 0;
            while let Some(pos) = haystack[from..].find(&phrase.lowered) {
                let start = from + pos;
                let end = start + phrase.lowered.len();
                from = start + 1;

                if !bounded(bytes, start, end) {
                    continue;
                }
                if claimed.iter().any(|&(s, e)| start < e && end > s) {
                    continue;
                }

                claimed.push((start, end));
                matches.push((start, phrase.display));
            }
        }

        matches.sort_by_key(|&(start, _)| start);
        let mut seen: HashSet<&'static str> = HashSet::new();
        matches
            .into_iter()
            .filter(|&(_, display)| seen.insert(display))
            .map(|(_, display)| display)
            .collect()
    }

    fn posting_salary(&self, posting: &Posting) -> Option<(f64, f64)> {
        if let Some(text) = &posting.salary_text {
            if let Some(range) = parse_salary_text(text) {
                return Some(range);
            }
        }
        // Some postings only state pay inside the description body.
        if posting.description.contains('$') {
            return parse_salary_text(&posting.description);
        }
        None
    }
}

/// Word-boundary check: the match may not extend an alphanumeric run on
/// either side ("neuroscientist" must not register "scientist").
fn bounded(bytes: &[u8], start: usize, end: usize) -> bool {
    let before_ok = start == 0 || !bytes[start - 1].is_ascii_alphanumeric();
    let after_ok = end >= bytes.len() || !bytes[end].is_ascii_alphanumeric();
    before_ok && after_ok
}

fn salary_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\s*([0-9][0-9,]*(?:\.[0-9]+)?)\s*([kK])?").expect("valid salary pattern")
    })
}

/// Permissive salary-range parse: "$X - $Y", "$X+", "up to $X", with
/// optional thousands suffix. Returns (min, max) or None when nothing
/// numeric is present.
pub(crate) fn parse_salary_text(text: &str) -> Option<(f64, f64)> {
    let mut values: Vec<f64> = Vec::new();
    for capture in salary_pattern().captures_iter(text) {
        let raw = capture[1].replace(',', "");
        let Ok(mut value) = raw.parse::<f64>() else {
            continue;
        };
        if capture.get(2).is_some() {
            value *= 1_000.0;
        }
        values.push(value);
    }

    match values.as_slice() {
        [] => None,
        [single] => Some((*single, *single)),
        [first, second, ..] => Some((first.min(*second), first.max(*second))),
    }
}

fn summarize_salaries(salaries: &[(f64, f64)]) -> Option<SalarySummary> {
    if salaries.is_empty() {
        return None;
    }

    let min = salaries.iter().map(|s| s.0).fold(f64::INFINITY, f64::min);
    let max = salaries.iter().map(|s| s.1).fold(f64::NEG_INFINITY, f64::max);
    let average = salaries
        .iter()
        .map(|s| (s.0 + s.1) / 2.0)
        .sum::<f64>()
        / salaries.len() as f64;

    Some(SalarySummary {
        min,
        max,
        average,
        sample_count: salaries.len() as u32,
    })
}

fn build_insights(
    role: &str,
    location: &str,
    postings: &[Posting],
    skills: &[SkillCount],
    salary: &Option<SalarySummary>,
    seniorities: &[String],
) -> Vec<String> {
    let posting_count = postings.len();
    if posting_count == 0 {
        return vec![format!("No recent postings found for {role} in {location}")];
    }

    let mut insights = vec![format!(
        "Analyzed {posting_count} recent postings for {role} in {location}"
    )];

    if let Some(top) = skills.first() {
        insights.push(format!(
            "{} appears in {} of {} postings",
            top.name, top.count, posting_count
        ));
    }

    if let Some(summary) = salary {
        insights.push(format!(
            "Advertised salaries range ${:.0}-${:.0} with a ${:.0} midpoint",
            summary.min, summary.max, summary.average
        ));
    }

    if insights.len() < 4 {
        if let Some(level) = most_common(seniorities) {
            insights.push(format!("Most openings target {level} candidates"));
        }
    }

    // A batch that yielded neither skills nor salary still gets a second
    // statistic so the summary never reads as a lone headline.
    if insights.len() < 2 {
        let employers: HashSet<&str> = postings
            .iter()
            .map(|p| p.company.as_str())
            .filter(|c| !c.is_empty())
            .collect();
        if employers.is_empty() {
            insights.push(
                "No skill or salary details could be extracted from the postings".to_string(),
            );
        } else {
            insights.push(format!(
                "Postings come from {} distinct employers",
                employers.len()
            ));
        }
    }

    insights.truncate(4);
    insights
}

fn most_common(values: &[String]) -> Option<&str> {
    let mut best: Option<(&str, usize)> = None;
    for value in values {
        let count = values.iter().filter(|v| *v == value).count();
        if best.map_or(true, |(_, n)| count > n) {
            best = Some((value, count));
        }
    }
    best.map(|(v, _)| v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(description: &str, salary_text: Option<&str>) -> Posting {
        Posting {
            title: "Data Scientist".to_string(),
            company: "TechCorp Inc".to_string(),
            location: "Dallas, TX".to_string(),
            description: description.to_string(),
            posted: Some("2 weeks ago".to_string()),
            salary_text: salary_text.map(str::to_string),
            seniority: Some("Senior level".to_string()),
            url: "https://example.com/jobs/view/1".to_string(),
        }
    }

    #[test]
    fn dallas_data_scientist_scenario() {
        let extractor = SkillExtractor::new();
        let postings = vec![
            posting(
                "Looking for Python and SQL experience with statistics.",
                Some("$90,000 - $110,000"),
            ),
            posting("Must know Python, SQL and Docker.", None),
        ];

        let signal = extractor.extract("Data Scientist", "Dallas, TX", &postings);

        assert_eq!(signal.provenance, Provenance::Live);
        assert_eq!(signal.posting_count, 2);
        assert_eq!(signal.skills[0], SkillCount::new("Python", 2));
        assert_eq!(signal.skills[1], SkillCount::new("SQL", 2));

        let salary = signal.salary.expect("salary should parse");
        assert_eq!(salary.min, 90_000.0);
        assert_eq!(salary.max, 110_000.0);
        assert!((salary.average - 100_000.0).abs() < 1.0);
        assert!(signal.insights.len() >= 2 && signal.insights.len() <= 4);
    }

    #[test]
    fn frequencies_are_non_increasing() {
        let extractor = SkillExtractor::new();
        let postings = vec![
            posting("Python, SQL, Docker", None),
            posting("Python and SQL", None),
            posting("Python only here", None),
        ];

        let signal = extractor.extract("Data Engineer", "Austin, TX", &postings);
        let counts: Vec<u32> = signal.skills.iter().map(|s| s.count).collect();
        assert!(counts.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(signal.skills[0], SkillCount::new("Python", 3));
    }

    #[test]
    fn phrase_matching_respects_word_boundaries() {
        let extractor = SkillExtractor::new();
        let matched = extractor.match_skills("Seeking a neuroscientist for our lab");
        // No vocabulary entry may fire inside a longer word.
        assert!(matched.is_empty());

        let matched = extractor.match_skills("Neuroscience research methods required");
        assert!(matched.contains(&"Neuroscience"));
        assert!(matched.contains(&"Research Methods"));
    }

    #[test]
    fn longer_phrases_claim_their_span_first() {
        let extractor = SkillExtractor::new();

        let matched = extractor.match_skills("Strong JavaScript fundamentals");
        assert!(matched.contains(&"JavaScript"));
        assert!(!matched.contains(&"Java"));

        let matched = extractor.match_skills("Experience with machine learning pipelines");
        assert!(matched.contains(&"Machine Learning"));

        // Both can still appear when genuinely separate.
        let matched = extractor.match_skills("Java on the backend, JavaScript up front");
        assert!(matched.contains(&"Java"));
        assert!(matched.contains(&"JavaScript"));
    }

    #[test]
    fn equal_count_skills_keep_text_appearance_order() {
        let extractor = SkillExtractor::new();
        let postings = vec![posting(
            "SQL comes first, then Python, then Machine Learning.",
            None,
        )];

        let signal = extractor.extract("Data Scientist", "Dallas, TX", &postings);
        let names: Vec<&str> = signal.skill_names().collect();
        // All counts are 1; order must follow where each skill appears in
        // the text, not vocabulary order.
        assert_eq!(names, vec!["SQL", "Python", "Machine Learning"]);
    }

    #[test]
    fn sparse_batch_still_gets_at_least_two_insights() {
        let extractor = SkillExtractor::new();
        let mut postings = vec![
            posting("We value enthusiasm and a positive attitude.", None),
            posting("Join a friendly, supportive team.", None),
        ];
        for p in &mut postings {
            p.seniority = None;
        }

        let signal = extractor.extract("Data Scientist", "Dallas, TX", &postings);
        assert!(!signal.has_skills());
        assert!(signal.salary.is_none());
        assert!(signal.insights.len() >= 2 && signal.insights.len() <= 4);
        assert!(signal.insights[1].contains("employers"));
    }

    #[test]
    fn salary_parsing_variants() {
        assert_eq!(
            parse_salary_text("$90,000 - $110,000"),
            Some((90_000.0, 110_000.0))
        );
        assert_eq!(parse_salary_text("$120k+"), Some((120_000.0, 120_000.0)));
        assert_eq!(
            parse_salary_text("up to $95,000 a year"),
            Some((95_000.0, 95_000.0))
        );
        assert_eq!(parse_salary_text("$80K-$100K"), Some((80_000.0, 100_000.0)));
        assert_eq!(parse_salary_text("competitive pay"), None);
    }

    #[test]
    fn unparseable_salary_is_skipped_not_fatal() {
        let extractor = SkillExtractor::new();
        let postings = vec![
            posting("Python role", Some("competitive compensation")),
            posting("Python role", Some("$100,000")),
        ];

        let signal = extractor.extract("Data Scientist", "Dallas, TX", &postings);
        let salary = signal.salary.expect("one posting parsed");
        assert_eq!(salary.sample_count, 1);
        assert_eq!(salary.average, 100_000.0);
    }

    #[test]
    fn zero_postings_is_a_valid_empty_signal() {
        let extractor = SkillExtractor::new();
        let signal = extractor.extract("Data Scientist", "Dallas, TX", &[]);

        assert!(!signal.has_skills());
        assert!(signal.salary.is_none());
        assert_eq!(signal.posting_count, 0);
        assert_eq!(signal.provenance, Provenance::Live);
    }
}
