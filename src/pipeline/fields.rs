//! Field extraction: normalised page text → [`ChildRecord`].
//!
//! The registration form is a fixed template, so every field is found by
//! anchoring on its printed label. OCR drops and garbles labels often enough
//! that a few fields also carry permissive fallbacks (a bare date anywhere on
//! the page, a bare year, a configured facility name).
//!
//! ## Rule table
//!
//! Extraction is data, not inline matching: each [`FieldRule`] holds an
//! ordered list of [`Candidate`]s, and each candidate pairs a pattern with a
//! normaliser. For a field, candidates are tried in order; within a
//! candidate, matches are tried left to right. The first match whose
//! normaliser accepts it wins. No match at all yields an empty string.
//!
//! Policy is deliberately simple: first match wins, no confidence scoring,
//! no cross-field checks (a bare year is never compared against the year of
//! admission). The only signal beyond the value itself is
//! [`Confidence::Low`] for the known-centre fallback, which is surfaced in
//! [`ChildRecord::low_confidence`].

use crate::pipeline::normalize::normalize_text;
use crate::record::{ChildRecord, Field, Gender, TextSource};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::fmt;

/// How much a matched value can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    /// Matched a printed label, or a deterministic content pattern.
    Normal,
    /// Guessed from a configured list; must not be treated as authoritative.
    Low,
}

type Normalizer = Box<dyn Fn(&Captures<'_>) -> Option<String> + Send + Sync>;

/// One way of finding a field: a pattern plus the cleanup applied to its match.
pub struct Candidate {
    pattern: Regex,
    normalize: Normalizer,
    confidence: Confidence,
}

impl Candidate {
    fn new(
        pattern: &Regex,
        normalize: impl Fn(&Captures<'_>) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            pattern: pattern.clone(),
            normalize: Box::new(normalize),
            confidence: Confidence::Normal,
        }
    }

    fn low_confidence(mut self) -> Self {
        self.confidence = Confidence::Low;
        self
    }

    fn first_match(&self, text: &str) -> Option<String> {
        self.pattern
            .captures_iter(text)
            .find_map(|caps| (self.normalize)(&caps))
    }
}

/// Ordered candidates for one field.
pub struct FieldRule {
    pub field: Field,
    candidates: Vec<Candidate>,
}

impl FieldRule {
    fn find(&self, text: &str) -> Option<(String, Confidence)> {
        self.candidates
            .iter()
            .find_map(|c| c.first_match(text).map(|v| (v, c.confidence)))
    }
}

/// The complete extraction table for the registration form.
pub struct FieldExtractor {
    rules: Vec<FieldRule>,
}

impl fmt::Debug for FieldExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.rules
                    .iter()
                    .map(|r| (r.field, r.candidates.len())),
            )
            .finish()
    }
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl FieldExtractor {
    /// Build the table. `known_centres` feeds the low-confidence fallback
    /// for [`Field::Center`]; pass an empty slice to disable it.
    pub fn new(known_centres: &[String]) -> Self {
        let rules = vec![
            FieldRule {
                field: Field::Name,
                candidates: vec![Candidate::new(&RE_NAME, |c| clean_name(&c[1]))],
            },
            FieldRule {
                field: Field::ChildNumber,
                candidates: vec![Candidate::new(&RE_CHILD_NUMBER, |c| {
                    clean_child_number(&c[1], c.get(2).is_some())
                })],
            },
            FieldRule {
                field: Field::Gender,
                candidates: vec![Candidate::new(&RE_GENDER, |c| {
                    match Gender::parse(&c[1]) {
                        Gender::Unknown => None,
                        g => Some(g.as_str().to_string()),
                    }
                })],
            },
            FieldRule {
                field: Field::DateOfBirth,
                candidates: vec![
                    Candidate::new(&RE_DOB_LABELLED, |c| parse_numeric_date(&c[1])),
                    Candidate::new(&RE_BARE_DATE, format_date_captures),
                    Candidate::new(&RE_BARE_YEAR, |c| Some(c[1].to_string())),
                ],
            },
            FieldRule {
                field: Field::ClassOfStudy,
                candidates: vec![
                    Candidate::new(&RE_EARLY_CHILDHOOD, |_| Some(EARLY_CHILDHOOD.to_string())),
                    Candidate::new(&RE_CLASS, |c| clean_class(&c[1])),
                ],
            },
            FieldRule {
                field: Field::Center,
                candidates: centre_candidates(known_centres),
            },
            FieldRule {
                field: Field::YearOfAdmission,
                candidates: vec![
                    Candidate::new(&RE_YEAR_OF_ADMISSION, |c| Some(c[1].to_string())),
                    Candidate::new(&RE_ADMISSION_YEAR, |c| Some(c[1].to_string())),
                ],
            },
        ];
        Self { rules }
    }

    /// Extract every field from already-normalised text.
    ///
    /// Pure: the same input always yields the same record. `text_source` is
    /// left at its default; text acquisition fills it in.
    pub fn extract(&self, normalized: &str) -> ChildRecord {
        let mut record = ChildRecord {
            raw_text: normalized.to_string(),
            ..Default::default()
        };

        for rule in &self.rules {
            let Some((value, confidence)) = rule.find(normalized) else {
                continue;
            };
            if confidence == Confidence::Low {
                record.low_confidence.push(rule.field);
            }
            match rule.field {
                Field::Name => record.name = value,
                Field::ChildNumber => record.child_number = value,
                Field::Gender => record.gender = Gender::parse(&value),
                Field::DateOfBirth => record.date_of_birth = value,
                Field::ClassOfStudy => record.class_of_study = value,
                Field::Center => record.center = value,
                Field::YearOfAdmission => record.year_of_admission = value,
            }
        }

        record
    }

    /// Normalise raw page text, then extract.
    pub fn extract_page(&self, raw: &str, source: TextSource) -> ChildRecord {
        let mut record = self.extract(&normalize_text(raw));
        record.text_source = source;
        record
    }

    /// Extract a single field; empty string when nothing matched.
    pub fn extract_field(&self, field: Field, normalized: &str) -> String {
        self.rules
            .iter()
            .find(|r| r.field == field)
            .and_then(|r| r.find(normalized))
            .map(|(v, _)| v)
            .unwrap_or_default()
    }
}

// ── Patterns ─────────────────────────────────────────────────────────────────
//
// Labels are case-insensitive; `[:\-\s]*` absorbs whatever separator OCR
// left between a label and its value, including a line break.

const EARLY_CHILDHOOD: &str = "Early Childhood Centre";

/// Label, then a run starting with a capital letter on the same line.
static RE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i:Child\s*Name|\bName)\s*[:\-\s"']*([A-Z][A-Za-z \t'.\-]{0,49})"#).unwrap()
});

/// Labels that end a name run when OCR joins two form rows onto one line.
static RE_NAME_STOP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:Child\s*(?:Number|No)|Gender|Sex|DOB|Date\s*of\s*Birth|Class|Cent(?:re|er))\b",
    )
    .unwrap()
});

static RE_CHILD_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bChild\s*(?:Number|No\.?)\s*[:\-\s]*([A-Za-z0-9/\-]+)(\.(?:\s|$))?")
        .unwrap()
});

static RE_GENDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:Gender|Sex)\s*[:\-\s]*([A-Za-z]+)").unwrap());

static RE_DOB_LABELLED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\bDOB|Date\s*of\s*Birth|Birth\s*Date)\s*[:\-\s]*([0-9/\-.\s]{6,15})")
        .unwrap()
});

static RE_BARE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})[/\-.](\d{1,2})[/\-.](\d{4}|\d{2})\b").unwrap());

static RE_BARE_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").unwrap());

static RE_EARLY_CHILDHOOD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Early\s*Childhood").unwrap());

static RE_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bClass\b(?:\s*of\s*study)?\s*[:\-\s]*([^\n]*)").unwrap()
});

/// Ends a class value: the centre label, or the list number of the next row.
static RE_CLASS_STOP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Name\s*of\s*Cent(?:re|er)|\s\d{1,2}\.(?:\s|$)").unwrap());

static RE_ROMAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(VIII|VII|III|II|IV|IX|VI|I|V|X)\b").unwrap());

static RE_CENTRE_NAMED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Name\s*of\s*Cent(?:re|er)\s*[:\-\s]*([^\n]+)").unwrap()
});

/// A bare label needs an explicit separator, otherwise the tail of
/// "Early Childhood Centre" on the class line would read as a label.
static RE_CENTRE_BARE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bCent(?:re|er)\b[ \t]*[:\-][ \t]*([^\n]+)").unwrap());

static RE_YEAR_OF_ADMISSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Year\s*of\s*admission\s*[:\-\s]*(\d{4})\b").unwrap());

static RE_ADMISSION_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Admission\s*Year\s*[:\-\s]*(\d{4})\b").unwrap());

/// Ends a centre value when OCR joins the next row onto the same line.
static RE_CENTRE_STOP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\s\d{1,2}\.(?:\s|$)|\b(?:Year\s*of\s*admission|Admission\s*Year|Child\s*(?:Name|Number|No)|Date\s*of\s*Birth|DOB|Gender)\b",
    )
    .unwrap()
});

/// Text that begins another form row rather than a value: a list number
/// (`6. `) or a printed label. Label separators may cross a line break, so a
/// blank row would otherwise read its neighbour.
static RE_ROW_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?:\d{1,2}\.(?:\s|$)|(?:Child\s*(?:Name|Number|No)|Name\s*of\s*Cent(?:re|er)|Date\s*of\s*Birth|Birth\s*Date|Class\s*of\s*study|Year\s*of\s*admission|Admission\s*Year)\b|(?:Gender|Sex|DOB|Class|Cent(?:re|er)|Name)\s*[:\-])",
    )
    .unwrap()
});

static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const LABEL_WORDS: [&str; 12] = [
    "gender", "sex", "dob", "date", "birth", "class", "name", "centre", "center", "year",
    "admission", "child",
];

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn centre_candidates(known_centres: &[String]) -> Vec<Candidate> {
    let mut candidates = vec![
        Candidate::new(&RE_CENTRE_NAMED, |c| clean_centre(&c[1])),
        Candidate::new(&RE_CENTRE_BARE, |c| clean_centre(&c[1])),
    ];
    for known in known_centres {
        let name = known.trim().to_string();
        let Ok(pattern) = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&name))) else {
            continue;
        };
        candidates.push(Candidate::new(&pattern, move |_| Some(name.clone())).low_confidence());
    }
    candidates
}

// ── Normalisers ──────────────────────────────────────────────────────────────

fn collapse_ws(s: &str) -> String {
    RE_WS.replace_all(s.trim(), " ").into_owned()
}

/// Collapse whitespace, strip wrapping quotes/punctuation, keep ≤ `max_words`.
fn clean_value(value: &str, max_words: usize) -> String {
    let collapsed = collapse_ws(value);
    let stripped = collapsed
        .trim_matches(|c: char| matches!(c, '"' | '\'' | ',' | '.' | ';' | ':'))
        .trim();
    stripped
        .split(' ')
        .filter(|w| !w.is_empty())
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}

fn clean_name(captured: &str) -> Option<String> {
    let cut = RE_NAME_STOP
        .find(captured)
        .map_or(captured, |m| &captured[..m.start()]);
    let name = clean_value(cut, 4);
    // "Name of Centre" is a label, not a child called "of".
    let first = name.split(' ').next().unwrap_or_default();
    if name.is_empty() || first.eq_ignore_ascii_case("of") {
        None
    } else {
        Some(name)
    }
}

/// `list_marker`: the token was followed by `. `, so a bare number is the
/// next row's list number, not a value.
fn clean_child_number(token: &str, list_marker: bool) -> Option<String> {
    let token = token.trim_matches(|c| c == '-' || c == '/');
    if token.is_empty()
        || LABEL_WORDS.iter().any(|w| token.eq_ignore_ascii_case(w))
        || (list_marker && token.bytes().all(|b| b.is_ascii_digit()))
    {
        None
    } else {
        Some(token.to_string())
    }
}

fn clean_class(captured: &str) -> Option<String> {
    if RE_ROW_START.is_match(captured) {
        return None;
    }
    let cut = RE_CLASS_STOP
        .find(captured)
        .map_or(captured, |m| &captured[..m.start()]);
    let arabic = RE_ROMAN.replace_all(cut, |c: &Captures<'_>| roman_to_arabic(&c[1]).to_string());
    let kept: String = arabic
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ' || *c == '-')
        .collect();
    let value = collapse_ws(&kept);
    (!value.is_empty()).then_some(value)
}

fn clean_centre(captured: &str) -> Option<String> {
    if RE_ROW_START.is_match(captured) {
        return None;
    }
    let cut = RE_CENTRE_STOP
        .find(captured)
        .map_or(captured, |m| &captured[..m.start()]);
    let kept: String = cut
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '.'))
        .collect();
    let value = collapse_ws(&kept);
    (!value.is_empty()).then_some(value)
}

fn roman_to_arabic(numeral: &str) -> u8 {
    match numeral {
        "I" => 1,
        "II" => 2,
        "III" => 3,
        "IV" => 4,
        "V" => 5,
        "VI" => 6,
        "VII" => 7,
        "VIII" => 8,
        "IX" => 9,
        _ => 10,
    }
}

/// Find the first `D/M/Y` date in `s` and format it as `DD Mon YYYY`.
pub fn parse_numeric_date(s: &str) -> Option<String> {
    RE_BARE_DATE
        .captures(s)
        .and_then(|c| format_date_captures(&c))
}

fn format_date_captures(c: &Captures<'_>) -> Option<String> {
    format_date(&c[1], &c[2], &c[3])
}

/// Two-digit years pivot at 50: `51`–`99` → 19xx, `00`–`50` → 20xx.
fn format_date(day: &str, month: &str, year: &str) -> Option<String> {
    let d: u32 = day.parse().ok()?;
    let m: usize = month.parse().ok()?;
    if !(1..=31).contains(&d) || !(1..=12).contains(&m) {
        return None;
    }
    let year = if year.len() == 2 {
        let yy: u32 = year.parse().ok()?;
        if yy > 50 {
            format!("19{year}")
        } else {
            format!("20{year}")
        }
    } else {
        year.to_string()
    };
    Some(format!("{d:02} {} {year}", MONTHS[m - 1]))
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const FORM: &str = "Help A Child Registration\n\
        1. Child Name: Ravi Kumar Singh\n\
        2. Child Number: HAC-2019/045\n\
        3. Gender: Male\n\
        4. Date of Birth: 5/3/14\n\
        5. Class of study: IV\n\
        6. Name of Centre: Purnea East\n\
        7. Year of admission: 2019";

    fn extractor() -> FieldExtractor {
        FieldExtractor::default()
    }

    #[test]
    fn full_form() {
        let rec = extractor().extract(FORM);
        assert_eq!(rec.name, "Ravi Kumar Singh");
        assert_eq!(rec.child_number, "HAC-2019/045");
        assert_eq!(rec.gender, Gender::Male);
        assert_eq!(rec.date_of_birth, "05 Mar 2014");
        assert_eq!(rec.class_of_study, "4");
        assert_eq!(rec.center, "Purnea East");
        assert_eq!(rec.year_of_admission, "2019");
        assert_eq!(rec.raw_text, FORM);
        assert!(!rec.is_partial());
        assert!(rec.low_confidence.is_empty());
    }

    #[test]
    fn extraction_is_idempotent() {
        let ex = extractor();
        assert_eq!(ex.extract(FORM), ex.extract(FORM));
    }

    #[test]
    fn empty_text_gives_fully_shaped_empty_record() {
        let rec = extractor().extract("");
        assert!(rec.is_blank());
        assert_eq!(rec.gender, Gender::Unknown);
    }

    // ── Name ────────────────────────────────────────────────────────────────

    #[test]
    fn name_stops_at_next_label_on_same_line() {
        let ex = extractor();
        assert_eq!(
            ex.extract_field(Field::Name, "Name: Asha Devi Gender: F"),
            "Asha Devi"
        );
        assert_eq!(
            ex.extract_field(Field::Name, "Child Name - Sunil Child No 7"),
            "Sunil"
        );
    }

    #[test]
    fn name_stops_at_numbered_marker() {
        assert_eq!(
            extractor().extract_field(Field::Name, "Child Name: Meena Kumari 2. Child Number: 9"),
            "Meena Kumari"
        );
    }

    #[test]
    fn name_is_clipped_to_four_words() {
        assert_eq!(
            extractor().extract_field(Field::Name, "Name: Anil Kumar Prasad Yadav Junior"),
            "Anil Kumar Prasad Yadav"
        );
    }

    #[test]
    fn name_strips_wrapping_punctuation() {
        assert_eq!(
            extractor().extract_field(Field::Name, "Name: 'Pooja Rani'."),
            "Pooja Rani"
        );
    }

    #[test]
    fn name_of_centre_is_not_a_name() {
        let text = "Name of Centre: Gaya\nChild Name: Rohit";
        assert_eq!(extractor().extract_field(Field::Name, text), "Rohit");
    }

    #[test]
    fn name_value_on_following_line() {
        assert_eq!(
            extractor().extract_field(Field::Name, "Child Name:\nSita Kumari\nGender: F"),
            "Sita Kumari"
        );
    }

    // ── Child number ────────────────────────────────────────────────────────

    #[test]
    fn child_number_label_variants() {
        let ex = extractor();
        assert_eq!(ex.extract_field(Field::ChildNumber, "Child No. 12/B"), "12/B");
        assert_eq!(ex.extract_field(Field::ChildNumber, "Child No: A-77"), "A-77");
        assert_eq!(ex.extract_field(Field::ChildNumber, "Child Number:  PUR0045"), "PUR0045");
    }

    #[test]
    fn child_number_does_not_swallow_next_label() {
        assert_eq!(
            extractor().extract_field(Field::ChildNumber, "Child Number:\nGender: M"),
            ""
        );
    }

    #[test]
    fn blank_child_number_row_does_not_read_next_list_number() {
        let ex = extractor();
        assert_eq!(ex.extract_field(Field::ChildNumber, "Child Number:\n3. Gender: M"), "");
        assert_eq!(ex.extract_field(Field::ChildNumber, "2. Child No.\n3. Gender: M"), "");
        assert_eq!(
            ex.extract_field(Field::ChildNumber, "Child Number:\nAdmission Year 2020"),
            ""
        );
    }

    #[test]
    fn child_number_on_following_line_is_kept() {
        assert_eq!(
            extractor().extract_field(Field::ChildNumber, "Child Number:\nHAC-77\nGender: M"),
            "HAC-77"
        );
    }

    // ── Gender ──────────────────────────────────────────────────────────────

    #[test]
    fn gender_known_values() {
        let ex = extractor();
        for (raw, want) in [
            ("M", "Male"),
            ("m", "Male"),
            ("Male", "Male"),
            ("MALE", "Male"),
            ("female", "Female"),
            ("F", "Female"),
        ] {
            assert_eq!(ex.extract_field(Field::Gender, &format!("Gender: {raw}")), want, "{raw}");
        }
    }

    #[test]
    fn gender_unknown_values_are_discarded() {
        let ex = extractor();
        for raw in ["Other", "Unknown", "Boy"] {
            assert_eq!(ex.extract_field(Field::Gender, &format!("Sex: {raw}")), "", "{raw}");
        }
    }

    // ── Date of birth ───────────────────────────────────────────────────────

    #[test]
    fn two_digit_years_pivot_at_fifty() {
        assert_eq!(parse_numeric_date("1/1/51").as_deref(), Some("01 Jan 1951"));
        assert_eq!(parse_numeric_date("1/1/99").as_deref(), Some("01 Jan 1999"));
        assert_eq!(parse_numeric_date("1/1/50").as_deref(), Some("01 Jan 2050"));
        assert_eq!(parse_numeric_date("31/12/00").as_deref(), Some("31 Dec 2000"));
    }

    #[test]
    fn date_separators_and_padding() {
        assert_eq!(parse_numeric_date("7-8-2012").as_deref(), Some("07 Aug 2012"));
        assert_eq!(parse_numeric_date("07.08.2012").as_deref(), Some("07 Aug 2012"));
    }

    #[test]
    fn invalid_month_is_rejected() {
        assert_eq!(parse_numeric_date("10/13/2012"), None);
        assert_eq!(parse_numeric_date("00/05/2012"), None);
    }

    #[test]
    fn labelled_dob_wins_over_other_dates() {
        let text = "Registered 01/06/2020\nDOB: 14-02-15";
        assert_eq!(extractor().extract_field(Field::DateOfBirth, text), "14 Feb 2015");
    }

    #[test]
    fn bare_date_fallback() {
        assert_eq!(
            extractor().extract_field(Field::DateOfBirth, "born on 3/9/2011 at home"),
            "03 Sep 2011"
        );
    }

    #[test]
    fn bare_year_fallback() {
        assert_eq!(
            extractor().extract_field(Field::DateOfBirth, "Birth year approx 2013"),
            "2013"
        );
        assert_eq!(extractor().extract_field(Field::DateOfBirth, "year 1850"), "");
    }

    // ── Class ───────────────────────────────────────────────────────────────

    #[test]
    fn roman_numerals_map_to_digits() {
        let ex = extractor();
        let numerals = ["I", "II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X"];
        for (i, numeral) in numerals.iter().enumerate() {
            assert_eq!(
                ex.extract_field(Field::ClassOfStudy, &format!("Class: {numeral}")),
                (i + 1).to_string(),
                "{numeral}"
            );
        }
    }

    #[test]
    fn early_childhood_anywhere_wins() {
        let ex = extractor();
        assert_eq!(
            ex.extract_field(Field::ClassOfStudy, "Class of study: early childhood"),
            "Early Childhood Centre"
        );
        assert_eq!(
            ex.extract_field(Field::ClassOfStudy, "Class: III\nProgramme: EARLY CHILDHOOD care"),
            "Early Childhood Centre"
        );
    }

    #[test]
    fn class_stops_at_centre_label_and_strips_symbols() {
        assert_eq!(
            extractor().extract_field(Field::ClassOfStudy, "Class: Std-II (A) Name of Centre: Gaya"),
            "Std-2 A"
        );
    }

    #[test]
    fn blank_class_row_does_not_read_next_row() {
        let ex = extractor();
        assert_eq!(
            ex.extract_field(Field::ClassOfStudy, "5. Class of study:\n6. Name of Centre: Gaya"),
            ""
        );
        assert_eq!(
            ex.extract_field(Field::ClassOfStudy, "Class of study:\nYear of admission: 2019"),
            ""
        );
    }

    #[test]
    fn class_stops_at_joined_list_number() {
        assert_eq!(
            extractor().extract_field(Field::ClassOfStudy, "5. Class of study: IV 6. Name of Centre: Gaya"),
            "4"
        );
    }

    // ── Centre ──────────────────────────────────────────────────────────────

    #[test]
    fn centre_labelled() {
        let ex = extractor();
        assert_eq!(ex.extract_field(Field::Center, "Name of Centre: St. Mary's, Patna"), "St. Marys Patna");
        assert_eq!(ex.extract_field(Field::Center, "Center - Gaya Road"), "Gaya Road");
    }

    #[test]
    fn blank_centre_row_does_not_read_next_row() {
        let ex = extractor();
        assert_eq!(
            ex.extract_field(Field::Center, "6. Name of Centre:\n7. Year of admission: 2019"),
            ""
        );
        assert_eq!(
            ex.extract_field(Field::Center, "Name of Centre:\nYear of admission: 2019"),
            ""
        );
    }

    #[test]
    fn centre_stops_at_joined_next_row() {
        assert_eq!(
            extractor().extract_field(Field::Center, "Name of Centre: Purnea East 7. Year of admission: 2019"),
            "Purnea East"
        );
    }

    #[test]
    fn numbered_form_with_blank_rows_leaves_them_empty() {
        let text = "1. Child Name: Ravi Kumar\n\
            2. Child Number:\n\
            3. Gender: Male\n\
            4. Date of Birth: 5/3/14\n\
            5. Class of study:\n\
            6. Name of Centre:\n\
            7. Year of admission: 2019";
        let rec = extractor().extract(text);
        assert_eq!(rec.name, "Ravi Kumar");
        assert_eq!(rec.child_number, "");
        assert_eq!(rec.gender, Gender::Male);
        assert_eq!(rec.date_of_birth, "05 Mar 2014");
        assert_eq!(rec.class_of_study, "");
        assert_eq!(rec.center, "");
        assert_eq!(rec.year_of_admission, "2019");
        assert_eq!(
            rec.missing_fields(),
            vec![Field::ChildNumber, Field::ClassOfStudy, Field::Center]
        );
    }

    #[test]
    fn early_childhood_centre_is_not_a_centre_label() {
        let text = "Class: Early Childhood Centre\nName of Centre: Purnea";
        let rec = extractor().extract(text);
        assert_eq!(rec.class_of_study, "Early Childhood Centre");
        assert_eq!(rec.center, "Purnea");
    }

    #[test]
    fn known_centre_fallback_is_low_confidence() {
        let ex = FieldExtractor::new(&["Purnea".to_string(), "Gaya".to_string()]);
        let rec = ex.extract("Child Name: Ravi\nVillage near gaya district");
        assert_eq!(rec.center, "Gaya");
        assert_eq!(rec.low_confidence, vec![Field::Center]);
    }

    #[test]
    fn known_centre_fallback_disabled_by_default() {
        assert_eq!(extractor().extract_field(Field::Center, "village near Gaya"), "");
    }

    // ── Year of admission ───────────────────────────────────────────────────

    #[test]
    fn year_of_admission_variants() {
        let ex = extractor();
        assert_eq!(ex.extract_field(Field::YearOfAdmission, "Year of admission: 2018"), "2018");
        assert_eq!(ex.extract_field(Field::YearOfAdmission, "Admission Year 2021"), "2021");
        assert_eq!(ex.extract_field(Field::YearOfAdmission, "Year of admission: 18"), "");
    }

    #[test]
    fn extract_page_normalises_and_tags_source() {
        let rec = extractor().extract_page("Child  Name:   Ravi\r\n\r\nSex: m", TextSource::Ocr);
        assert_eq!(rec.name, "Ravi");
        assert_eq!(rec.gender, Gender::Male);
        assert_eq!(rec.raw_text, "Child Name: Ravi\nSex: m");
        assert_eq!(rec.text_source, TextSource::Ocr);
    }
}
