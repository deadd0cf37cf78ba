//! Article input: stdin, `$EDITOR`, or local files (text, PDF, PPTX).

use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to extract PDF text: {0}")]
    Pdf(String),
    #[error("failed to open presentation: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("failed to parse slide XML: {0}")]
    Xml(String),
    #[error("no text found in {0}")]
    NoText(String),
}

/// Read the article from stdin until end of input
pub fn read_stdin() -> Result<String, SourceError> {
    let mut text = String::new();
    std::io::stdin().read_to_string(&mut text)?;
    Ok(text)
}

/// Compose the article in the user's editor
pub fn read_editor() -> Result<String, SourceError> {
    Ok(edit::edit("")?)
}

/// Read the article from a local file, choosing the extractor by extension
pub fn read_file(path: &Path) -> Result<String, SourceError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let text = match extension.as_deref() {
        Some("pdf") => {
            pdf_extract::extract_text(path).map_err(|e| SourceError::Pdf(e.to_string()))?
        }
        Some("pptx") => read_pptx(path)?,
        _ => std::fs::read_to_string(path)?,
    };

    if text.trim().is_empty() {
        return Err(SourceError::NoText(path.display().to_string()));
    }
    Ok(text)
}

/// Extract slide text from a PowerPoint file, one paragraph per slide
fn read_pptx(path: &Path) -> Result<String, SourceError> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
        .collect();
    slides.sort_by_key(|(n, _)| *n);

    let mut paragraphs = Vec::with_capacity(slides.len());
    for (_, name) in slides {
        let mut xml = String::new();
        archive.by_name(&name)?.read_to_string(&mut xml)?;
        let text = slide_text(&xml)?;
        if !text.is_empty() {
            paragraphs.push(text);
        }
    }

    Ok(paragraphs.join("\n\n"))
}

/// `ppt/slides/slide12.xml` -> 12
fn slide_number(name: &str) -> Option<u32> {
    name.strip_prefix("ppt/slides/slide")?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

/// Collect the text runs (`<a:t>`) of a slide
fn slide_text(xml: &str) -> Result<String, SourceError> {
    let mut reader = Reader::from_str(xml);
    let mut in_text = false;
    let mut runs: Vec<String> = Vec::new();
    let mut current = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"a:t" => {
                in_text = true;
                current.clear();
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"a:t" => {
                in_text = false;
                let run = current.trim();
                if !run.is_empty() {
                    runs.push(run.to_string());
                }
            }
            Ok(Event::Text(t)) if in_text => {
                current.push_str(&String::from_utf8_lossy(&t));
            }
            Ok(Event::GeneralRef(r)) if in_text => {
                let entity = match &*r {
                    b"amp" => "&",
                    b"lt" => "<",
                    b"gt" => ">",
                    b"quot" => "\"",
                    b"apos" => "'",
                    _ => "",
                };
                current.push_str(entity);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SourceError::Xml(e.to_string())),
            _ => {}
        }
    }

    Ok(runs.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const SLIDE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">
  <p:cSld><p:spTree>
    <a:p><a:r><a:t>Small tools</a:t></a:r></a:p>
    <a:p><a:r><a:t>Fish &amp; chips</a:t></a:r></a:p>
  </p:spTree></p:cSld>
</p:sld>"#;

    #[test]
    fn slide_numbers_parse() {
        assert_eq!(slide_number("ppt/slides/slide3.xml"), Some(3));
        assert_eq!(slide_number("ppt/slides/slide12.xml"), Some(12));
        assert_eq!(slide_number("ppt/slides/_rels/slide1.xml.rels"), None);
        assert_eq!(slide_number("ppt/slideLayouts/slideLayout1.xml"), None);
    }

    #[test]
    fn slide_text_collects_runs_and_entities() {
        assert_eq!(slide_text(SLIDE).unwrap(), "Small tools Fish & chips");
    }

    #[test]
    fn pptx_slides_are_read_in_numeric_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.pptx");
        {
            let file = std::fs::File::create(&path).unwrap();
            let mut zip = zip::ZipWriter::new(file);
            let options = SimpleFileOptions::default();
            for (name, text) in [
                ("ppt/slides/slide10.xml", "Tenth"),
                ("ppt/slides/slide2.xml", "Second"),
            ] {
                zip.start_file(name, options).unwrap();
                write!(zip, "<p:sld><a:t>{text}</a:t></p:sld>").unwrap();
            }
            zip.finish().unwrap();
        }

        assert_eq!(read_file(&path).unwrap(), "Second\n\nTenth");
    }

    #[test]
    fn plain_text_files_are_read_verbatim() {
        let mut file = tempfile::Builder::new().suffix(".md").tempfile().unwrap();
        write!(file, "# Heading\n\nBody text.").unwrap();
        assert_eq!(read_file(file.path()).unwrap(), "# Heading\n\nBody text.");
    }

    #[test]
    fn blank_files_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "   \n\n").unwrap();
        assert!(matches!(read_file(file.path()), Err(SourceError::NoText(_))));
    }
}
