//! Field extraction through the public API, on page text shaped like real
//! text layers and OCR output.

use child_intake::{
    normalize_text, ChildRecord, ExtractionConfig, Field, FieldExtractor, Gender, TextSource,
};

// ── Samples ──────────────────────────────────────────────────────────────────

/// Typical tesseract output for a clean scan: CRLF, padded columns, blank
/// lines between rows and a zero-width space picked up from the template.
const OCR_PAGE: &str = "HELP A CHILD\r\n\r\nREGISTRATION FORM\r\n\r\n\
    \u{200B}Child  Name :  Sunita Kumari\r\n\
    Child No.  PUR-0112\r\n\
    Sex: F\r\n\
    DOB 3/4/16\r\n\r\n\
    Class of study: III\r\n\
    Name of Centre :   Purnea  East\r\n\
    Year of admission 2021\r\n";

/// A form filled on a computer: text layer, one field per line.
const TYPED_PAGE: &str = "Help A Child Registration Form\n\
    Child Name: Arjun Singh\n\
    Child Number: HAC/2020/7\n\
    Gender: Male\n\
    Date of Birth: 28-11-2013\n\
    Class of study: VI\n\
    Name of Centre: Gaya Road\n\
    Year of admission: 2020\n";

fn extractor() -> FieldExtractor {
    FieldExtractor::default()
}

// ── Whole pages ──────────────────────────────────────────────────────────────

#[test]
fn noisy_ocr_page_yields_complete_record() {
    let rec = extractor().extract_page(OCR_PAGE, TextSource::Ocr);

    assert_eq!(rec.name, "Sunita Kumari");
    assert_eq!(rec.child_number, "PUR-0112");
    assert_eq!(rec.gender, Gender::Female);
    assert_eq!(rec.date_of_birth, "03 Apr 2016");
    assert_eq!(rec.class_of_study, "3");
    assert_eq!(rec.center, "Purnea East");
    assert_eq!(rec.year_of_admission, "2021");
    assert_eq!(rec.text_source, TextSource::Ocr);
    assert!(!rec.is_partial());
}

#[test]
fn raw_text_is_the_normalised_page() {
    let rec = extractor().extract_page(OCR_PAGE, TextSource::Ocr);
    assert_eq!(rec.raw_text, normalize_text(OCR_PAGE));
    assert!(!rec.raw_text.contains('\r'));
    assert!(!rec.raw_text.contains('\u{200B}'));
    assert!(!rec.raw_text.contains("\n\n"));
}

#[test]
fn typed_page_yields_complete_record() {
    let rec = extractor().extract_page(TYPED_PAGE, TextSource::TextLayer);

    assert_eq!(rec.name, "Arjun Singh");
    assert_eq!(rec.child_number, "HAC/2020/7");
    assert_eq!(rec.gender, Gender::Male);
    assert_eq!(rec.date_of_birth, "28 Nov 2013");
    assert_eq!(rec.class_of_study, "6");
    assert_eq!(rec.center, "Gaya Road");
    assert_eq!(rec.year_of_admission, "2020");
    assert!(rec.missing_fields().is_empty());
}

#[test]
fn normalising_twice_changes_nothing() {
    let once = normalize_text(OCR_PAGE);
    assert_eq!(normalize_text(&once), once);

    let ex = extractor();
    assert_eq!(ex.extract(&once), ex.extract(&normalize_text(&once)));
}

#[test]
fn partially_legible_page_reports_missing_fields() {
    let page = "Child Name: Rekha\nGender: ?\nClass: Early Childhood\n";
    let rec = extractor().extract_page(page, TextSource::Ocr);

    assert_eq!(rec.name, "Rekha");
    assert_eq!(rec.class_of_study, "Early Childhood Centre");
    assert!(rec.is_partial());
    assert_eq!(
        rec.missing_fields(),
        vec![
            Field::ChildNumber,
            Field::Gender,
            Field::DateOfBirth,
            Field::Center,
            Field::YearOfAdmission,
        ]
    );
}

#[test]
fn blank_page_yields_blank_record() {
    let rec = extractor().extract_page(" \r\n\u{FEFF}\r\n ", TextSource::TextLayer);
    assert!(rec.is_blank());
    assert_eq!(rec.raw_text, "");
}

// ── Configured centres ───────────────────────────────────────────────────────

#[test]
fn configured_centre_list_fills_unlabelled_centre() {
    let config = ExtractionConfig::builder()
        .known_centres(["Purnea East", "Gaya Road"])
        .build()
        .unwrap();
    let ex = FieldExtractor::new(&config.known_centres);

    // The centre label was lost; only the facility stamp survived OCR.
    let page = "Child Name: Kiran Devi\nstamp: GAYA ROAD CAMPUS\n";
    let rec = ex.extract_page(page, TextSource::Ocr);
    assert_eq!(rec.center, "Gaya Road");
    assert_eq!(rec.low_confidence, vec![Field::Center]);

    // A labelled centre still wins and is not flagged.
    let rec = ex.extract_page(TYPED_PAGE, TextSource::TextLayer);
    assert_eq!(rec.center, "Gaya Road");
    assert!(rec.low_confidence.is_empty());
}

// ── Wire format ──────────────────────────────────────────────────────────────

#[test]
fn record_json_uses_backend_field_names() {
    let mut rec = extractor().extract_page(TYPED_PAGE, TextSource::TextLayer);
    rec.pdf_name = "batch-04.pdf".into();
    let json = serde_json::to_value(&rec).unwrap();

    assert_eq!(json["name"], "Arjun Singh");
    assert_eq!(json["childNumber"], "HAC/2020/7");
    assert_eq!(json["gender"], "Male");
    assert_eq!(json["dateOfBirth"], "28 Nov 2013");
    assert_eq!(json["classOfStudy"], "6");
    assert_eq!(json["center"], "Gaya Road");
    assert_eq!(json["yearOfAdmission"], "2020");
    assert_eq!(json["pdfName"], "batch-04.pdf");
    assert_eq!(json["textSource"], "textLayer");
    assert!(json.get("lowConfidence").is_none());
}

#[test]
fn unknown_gender_round_trips_as_empty_string() {
    let rec = ChildRecord::default();
    let json = serde_json::to_string(&rec).unwrap();
    assert!(json.contains(r#""gender":"""#));

    let back: ChildRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back, rec);
}
