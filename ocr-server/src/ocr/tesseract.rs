use async_trait::async_trait;
use leptess::{LepTess, Variable};
use tracing::debug;

use super::engine::{NormalizedQuad, RecognitionEngine, TextObservation};
use super::preprocessing::PreparedImage;
use crate::config::{OcrConfig, RecognitionOptions};
use crate::error::{OcrServerError, Result};

const LEVEL_LINE: u32 = 4;
const LEVEL_WORD: u32 = 5;

/// Local OCR through Tesseract.
///
/// Every call builds its own `LepTess` on a blocking thread so concurrent
/// requests never share recognizer state.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    data_path: Option<String>,
    languages: Vec<String>,
}

impl TesseractEngine {
    /// Check that Tesseract can load the configured languages.
    pub fn probe(config: &OcrConfig) -> std::result::Result<Self, String> {
        let languages: Vec<String> = config
            .languages
            .split(|c| c == ',' || c == '+')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        if languages.is_empty() {
            return Err("no OCR languages configured".to_string());
        }

        let engine = Self {
            data_path: config.tessdata_path.clone(),
            languages,
        };
        engine.create(true)?;
        Ok(engine)
    }

    /// Tesseract language string: every configured language when
    /// auto-detection is on, only the primary one otherwise.
    fn language_spec(&self, auto_detect: bool) -> String {
        if auto_detect {
            self.languages.join("+")
        } else {
            self.languages[0].clone()
        }
    }

    fn create(&self, auto_detect: bool) -> std::result::Result<LepTess, String> {
        LepTess::new(self.data_path.as_deref(), &self.language_spec(auto_detect))
            .map_err(|e| e.to_string())
    }

    fn run(
        &self,
        image: &PreparedImage,
        options: &RecognitionOptions,
    ) -> Result<Vec<TextObservation>> {
        let mut lt = self
            .create(options.auto_detect_language)
            .map_err(OcrServerError::OcrUnavailable)?;

        if !options.language_correction {
            for variable in [
                Variable::LanguageModelPenaltyNonDictWord,
                Variable::LanguageModelPenaltyNonFreqDictWord,
            ] {
                lt.set_variable(variable, "0").map_err(|e| {
                    OcrServerError::Recognition(format!("Failed to configure Tesseract: {e}"))
                })?;
            }
        }

        lt.set_image_from_mem(&image.png)
            .map_err(|e| OcrServerError::Recognition(format!("Failed to set image: {e}")))?;
        let tsv = lt
            .get_tsv_text(0)
            .map_err(|e| OcrServerError::Recognition(format!("Failed to extract text: {e}")))?;

        let lines = parse_tsv_lines(&tsv);
        debug!(lines = lines.len(), "Tesseract recognized lines");
        Ok(lines
            .into_iter()
            .map(|line| line.normalize(image.width, image.height))
            .collect())
    }
}

#[async_trait]
impl RecognitionEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn observe(
        &self,
        image: PreparedImage,
        options: RecognitionOptions,
    ) -> Result<Vec<TextObservation>> {
        let engine = self.clone();
        tokio::task::spawn_blocking(move || engine.run(&image, &options))
            .await
            .map_err(|e| OcrServerError::Recognition(format!("OCR task panicked: {e}")))?
    }
}

/// A text line in pixel space, top-left origin, as Tesseract reports it.
#[derive(Debug, Clone, PartialEq)]
struct PixelLine {
    text: String,
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

impl PixelLine {
    fn normalize(self, image_width: u32, image_height: u32) -> TextObservation {
        let w = image_width.max(1) as f64;
        let h = image_height.max(1) as f64;
        let min_x = (self.left / w).clamp(0.0, 1.0);
        let max_x = ((self.left + self.width) / w).clamp(0.0, 1.0);
        let max_y = (1.0 - self.top / h).clamp(0.0, 1.0);
        let min_y = (1.0 - (self.top + self.height) / h).clamp(0.0, 1.0);

        TextObservation {
            text: self.text,
            quad: NormalizedQuad::from_bounds(min_x, min_y, max_x, max_y),
        }
    }
}

/// Collect text lines from Tesseract TSV output.
///
/// Columns: level, page, block, paragraph, line, word, left, top, width,
/// height, confidence, text. Line rows (level 4) carry the geometry, word
/// rows (level 5) the text. Lines without any word text are dropped.
fn parse_tsv_lines(tsv: &str) -> Vec<PixelLine> {
    let mut lines: Vec<PixelLine> = Vec::new();
    let mut current: Option<PixelLine> = None;

    for row in tsv.lines() {
        let cols: Vec<&str> = row.splitn(12, '\t').collect();
        if cols.len() < 11 {
            continue;
        }
        let Ok(level) = cols[0].trim().parse::<u32>() else {
            continue;
        };

        match level {
            LEVEL_LINE => {
                if let Some(line) = current.take().filter(|l| !l.text.is_empty()) {
                    lines.push(line);
                }
                let num = |i: usize| cols[i].trim().parse::<f64>().unwrap_or(0.0);
                current = Some(PixelLine {
                    text: String::new(),
                    left: num(6),
                    top: num(7),
                    width: num(8),
                    height: num(9),
                });
            }
            LEVEL_WORD => {
                let word = cols.get(11).map(|w| w.trim()).unwrap_or("");
                if let Some(line) = current.as_mut().filter(|_| !word.is_empty()) {
                    if !line.text.is_empty() {
                        line.text.push(' ');
                    }
                    line.text.push_str(word);
                }
            }
            _ => {
                if let Some(line) = current.take().filter(|l| !l.text.is_empty()) {
                    lines.push(line);
                }
            }
        }
    }

    if let Some(line) = current.filter(|l| !l.text.is_empty()) {
        lines.push(line);
    }

    lines
}
