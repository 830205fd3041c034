use std::fs;

use chronochat_core::chart::ChartDescription;
use chronochat_core::config::ExportConfig;
use chronochat_core::export::{
    build_report, export_artifacts, write_artifacts, ChartRenderer, ExportError, ReportText,
    PDF_MIME, PNG_MIME,
};
use chronochat_core::{visualize, ChartType, SelectionSpec};
use chronochat_parser::parse_dataset;
use tempfile::{tempdir, NamedTempFile};

struct SolidRenderer;

impl ChartRenderer for SolidRenderer {
    fn render_png(
        &self,
        _chart: &ChartDescription,
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>, ExportError> {
        Ok(solid_png(width, height))
    }
}

struct FailingRenderer;

impl ChartRenderer for FailingRenderer {
    fn render_png(
        &self,
        _chart: &ChartDescription,
        _width: u32,
        _height: u32,
    ) -> Result<Vec<u8>, ExportError> {
        Err(ExportError::Render("no drawing backend".to_string()))
    }
}

fn solid_png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().expect("png header");
        writer
            .write_image_data(&vec![200u8; (width * height * 3) as usize])
            .expect("png data");
    }
    out
}

fn sample_chart() -> ChartDescription {
    let dataset = parse_dataset("timestamp,status\n1700000000,4\n1700003600,5\n").expect("parse");
    let selection = SelectionSpec::new(ChartType::Line, "timestamp", ["status"]);
    visualize(&dataset, &selection).expect("visualize").chart
}

fn small_config() -> ExportConfig {
    ExportConfig {
        chart_width: 40,
        chart_height: 24,
        ..ExportConfig::default()
    }
}

#[test]
fn exports_image_and_report_in_memory() {
    let text = ReportText {
        title: "Weekly message activity".to_string(),
        description: "Status codes for outgoing messages.".to_string(),
    };

    let artifacts =
        export_artifacts(&SolidRenderer, &sample_chart(), &text, &small_config()).expect("export");

    assert_eq!(artifacts.image.mime_type, PNG_MIME);
    assert_eq!(&artifacts.image.bytes[..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
    assert_eq!(artifacts.report.mime_type, PDF_MIME);
    assert!(artifacts.report.bytes.starts_with(b"%PDF"));
    assert!(artifacts.image.file_name.contains(&artifacts.request_id.to_string()));
    assert_ne!(artifacts.image.file_name, artifacts.report.file_name);
}

#[test]
fn empty_title_and_description_are_fine() {
    let artifacts = export_artifacts(
        &SolidRenderer,
        &sample_chart(),
        &ReportText::default(),
        &small_config(),
    )
    .expect("export with empty text");
    assert!(artifacts.report.bytes.starts_with(b"%PDF"));
}

#[test]
fn long_descriptions_push_the_chart_to_another_page() {
    let text = ReportText {
        title: "Report".to_string(),
        description: "message status overview ".repeat(600),
    };
    let pdf = build_report(&text, &solid_png(40, 24)).expect("report");
    assert!(pdf.starts_with(b"%PDF"));
}

#[test]
fn long_titles_still_produce_a_report() {
    let text = ReportText {
        title: "Messages per contact and status across the whole export ".repeat(5),
        description: "Counts per day.".to_string(),
    };
    let pdf = build_report(&text, &solid_png(40, 24)).expect("report");
    assert!(pdf.starts_with(b"%PDF"));
}

#[test]
fn renderer_failures_are_reported() {
    let err = export_artifacts(
        &FailingRenderer,
        &sample_chart(),
        &ReportText::default(),
        &small_config(),
    )
    .expect_err("render should fail");
    assert!(matches!(err, ExportError::Render(_)));
}

#[test]
fn non_png_images_fail_the_report() {
    let err = build_report(&ReportText::default(), b"not a png").expect_err("bad image");
    assert!(matches!(err, ExportError::Document(_)));
}

#[test]
fn each_request_writes_its_own_files() {
    let dir = tempdir().expect("temp dir");
    let chart = sample_chart();

    let first = export_artifacts(&SolidRenderer, &chart, &ReportText::default(), &small_config())
        .expect("first export");
    let second = export_artifacts(&SolidRenderer, &chart, &ReportText::default(), &small_config())
        .expect("second export");

    let (first_image, first_report) = write_artifacts(&first, dir.path()).expect("write first");
    let (second_image, _) = write_artifacts(&second, dir.path()).expect("write second");

    assert_ne!(first_image, second_image);
    assert_eq!(fs::read(&first_image).expect("read image"), first.image.bytes);
    assert_eq!(fs::read(&first_report).expect("read report"), first.report.bytes);
}

#[test]
fn unwritable_directories_are_reported() {
    let blocker = NamedTempFile::new().expect("blocker file");
    let artifacts = export_artifacts(
        &SolidRenderer,
        &sample_chart(),
        &ReportText::default(),
        &small_config(),
    )
    .expect("export");

    let err = write_artifacts(&artifacts, &blocker.path().join("nested")).expect_err("cannot write");
    assert!(matches!(err, ExportError::Write { .. }));
}
