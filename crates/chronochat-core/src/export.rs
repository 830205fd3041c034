use std::fs;
use std::io::{BufWriter, Cursor};
use std::path::{Path, PathBuf};

use printpdf::image_crate::codecs::png::PngDecoder;
use printpdf::{BuiltinFont, Image, ImageTransform, Mm, PdfDocument, PdfLayerReference};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::chart::ChartDescription;
use crate::config::ExportConfig;

pub const PNG_MIME: &str = "image/png";
pub const PDF_MIME: &str = "application/pdf";

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 10.0;
const IMAGE_WIDTH_MM: f32 = 190.0;
/// The chart never starts higher than this distance from the top of the page.
const IMAGE_TOP_MM: f32 = 100.0;
const TITLE_SIZE_PT: f32 = 15.0;
const BODY_SIZE_PT: f32 = 12.0;
const TITLE_LINE_MM: f32 = 7.0;
const BODY_LINE_MM: f32 = 6.0;
const PT_TO_MM: f32 = 0.3528;
/// Rough Helvetica advance width as a fraction of the font size.
const HELVETICA_AVG_ADVANCE: f32 = 0.5;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to render chart image: {0}")]
    Render(String),
    #[error("failed to build report document: {0}")]
    Document(String),
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Turns a chart description into PNG bytes.
pub trait ChartRenderer {
    fn render_png(
        &self,
        chart: &ChartDescription,
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>, ExportError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Chart image and report for one export request, held in memory so
/// concurrent requests never share a file.
#[derive(Debug, Clone)]
pub struct ExportedArtifacts {
    pub request_id: Uuid,
    pub image: Artifact,
    pub report: Artifact,
}

#[derive(Debug, Clone, Default)]
pub struct ReportText {
    pub title: String,
    pub description: String,
}

pub fn export_artifacts(
    renderer: &dyn ChartRenderer,
    chart: &ChartDescription,
    text: &ReportText,
    config: &ExportConfig,
) -> Result<ExportedArtifacts, ExportError> {
    let request_id = Uuid::new_v4();
    let png = renderer.render_png(chart, config.chart_width, config.chart_height)?;
    let pdf = build_report(text, &png)?;

    Ok(ExportedArtifacts {
        request_id,
        image: Artifact {
            file_name: format!("chart-{request_id}.png"),
            mime_type: PNG_MIME,
            bytes: png,
        },
        report: Artifact {
            file_name: format!("report-{request_id}.pdf"),
            mime_type: PDF_MIME,
            bytes: pdf,
        },
    })
}

/// Writes both artifacts under `dir`, creating it if needed, and returns the
/// image and report paths in that order.
pub fn write_artifacts(
    artifacts: &ExportedArtifacts,
    dir: &Path,
) -> Result<(PathBuf, PathBuf), ExportError> {
    fs::create_dir_all(dir).map_err(|source| ExportError::Write {
        path: dir.to_path_buf(),
        source,
    })?;

    let image_path = write_artifact(&artifacts.image, dir)?;
    let report_path = write_artifact(&artifacts.report, dir)?;
    info!(
        request_id = %artifacts.request_id,
        image = %image_path.display(),
        report = %report_path.display(),
        "wrote export artifacts"
    );
    Ok((image_path, report_path))
}

fn write_artifact(artifact: &Artifact, dir: &Path) -> Result<PathBuf, ExportError> {
    let path = dir.join(&artifact.file_name);
    fs::write(&path, &artifact.bytes).map_err(|source| ExportError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Lays out an A4 report: centred title, wrapped description, then the chart
/// image. The image moves to a second page when the description leaves no room.
pub fn build_report(text: &ReportText, png: &[u8]) -> Result<Vec<u8>, ExportError> {
    let decoder = PngDecoder::new(Cursor::new(png))
        .map_err(|err| ExportError::Document(format!("chart image is not a PNG: {err}")))?;
    let image = Image::try_from(decoder)
        .map_err(|err| ExportError::Document(format!("failed to decode chart image: {err}")))?;
    let (pixel_width, pixel_height) = (image.image.width.0, image.image.height.0);
    if pixel_width == 0 || pixel_height == 0 {
        return Err(ExportError::Document("chart image has no pixels".to_string()));
    }

    let (doc, page, layer) = PdfDocument::new(
        text.title.as_str(),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "report",
    );
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|err| ExportError::Document(err.to_string()))?;
    let mut current = doc.get_page(page).get_layer(layer);

    let mut cursor_mm = MARGIN_MM + 10.0;
    for line in wrap_text(&text.title, line_capacity(TITLE_SIZE_PT)) {
        let title_x = ((PAGE_WIDTH_MM - text_width_mm(&line, TITLE_SIZE_PT)) / 2.0).max(MARGIN_MM);
        current.use_text(
            line,
            TITLE_SIZE_PT,
            Mm(title_x),
            Mm(PAGE_HEIGHT_MM - cursor_mm),
            &font,
        );
        cursor_mm += TITLE_LINE_MM;
    }
    cursor_mm += 10.0 - TITLE_LINE_MM;

    for line in wrap_text(&text.description, line_capacity(BODY_SIZE_PT)) {
        cursor_mm += BODY_LINE_MM;
        if cursor_mm > PAGE_HEIGHT_MM - MARGIN_MM {
            current = add_page(&doc);
            cursor_mm = MARGIN_MM + BODY_LINE_MM;
        }
        current.use_text(
            line,
            BODY_SIZE_PT,
            Mm(MARGIN_MM),
            Mm(PAGE_HEIGHT_MM - cursor_mm),
            &font,
        );
    }
    cursor_mm += 10.0;

    let image_height_mm = IMAGE_WIDTH_MM * pixel_height as f32 / pixel_width as f32;
    let mut image_top_mm = cursor_mm.max(IMAGE_TOP_MM);
    if image_top_mm + image_height_mm > PAGE_HEIGHT_MM - MARGIN_MM {
        current = add_page(&doc);
        image_top_mm = MARGIN_MM;
    }
    let dpi = pixel_width as f32 * 25.4 / IMAGE_WIDTH_MM;
    image.add_to_layer(
        current,
        ImageTransform {
            translate_x: Some(Mm(MARGIN_MM)),
            translate_y: Some(Mm(PAGE_HEIGHT_MM - image_top_mm - image_height_mm)),
            dpi: Some(dpi),
            ..Default::default()
        },
    );

    let mut writer = BufWriter::new(Vec::new());
    doc.save(&mut writer)
        .map_err(|err| ExportError::Document(err.to_string()))?;
    writer
        .into_inner()
        .map_err(|err| ExportError::Document(err.to_string()))
}

fn add_page(doc: &printpdf::PdfDocumentReference) -> PdfLayerReference {
    let (page, layer) = doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "report");
    doc.get_page(page).get_layer(layer)
}

/// Characters that fit across the image width at the given font size.
fn line_capacity(size_pt: f32) -> usize {
    ((IMAGE_WIDTH_MM / text_width_mm("n", size_pt)) as usize).max(1)
}

fn text_width_mm(text: &str, size_pt: f32) -> f32 {
    text.chars().count() as f32 * size_pt * HELVETICA_AVG_ADVANCE * PT_TO_MM
}

/// Greedy word wrap that also honours explicit line breaks. Words longer than
/// a line are split.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > max_chars {
                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                lines.push(word.drain(..max_chars).collect());
            }
            let word: String = word.into_iter().collect();
            if word.is_empty() {
                continue;
            }
            let needed = if line.is_empty() {
                word.chars().count()
            } else {
                line.chars().count() + 1 + word.chars().count()
            };
            if needed > max_chars && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(&word);
        }
        lines.push(line);
    }
    lines
}
