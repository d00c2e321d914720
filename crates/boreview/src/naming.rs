//! Mapping between page images and source document names.

use regex::Regex;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn page_suffix() -> &'static Regex {
  static PAGE: OnceLock<Regex> = OnceLock::new();
  PAGE.get_or_init(|| Regex::new(r"^(?P<doc>.+?)_page(?P<page>\d+)$").expect("valid regex"))
}

fn digit_runs() -> &'static Regex {
  static DIGITS: OnceLock<Regex> = OnceLock::new();
  DIGITS.get_or_init(|| Regex::new(r"\d+|\D+").expect("valid regex"))
}

/// A rendered page of a source document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
  pub path: PathBuf,
  pub document: String,
  pub page: Option<u32>,
}

/// Document name for an image file: `11235.pdf_page1.png` -> `11235.pdf`
///
/// Names without a `_page<N>` suffix map to `<stem>.pdf`; a `.pdf`
/// extension is appended when the prefix lacks one.
pub fn document_for_image(path: &Path) -> Option<PageImage> {
  let stem = path.file_stem()?.to_str()?;

  let (document, page) = match page_suffix().captures(stem) {
    Some(caps) => (caps["doc"].to_string(), caps["page"].parse().ok()),
    None => (stem.to_string(), None),
  };

  let document =
    if document.to_lowercase().ends_with(".pdf") { document } else { format!("{document}.pdf") };

  Some(PageImage { path: path.to_path_buf(), document, page })
}

/// Output file name for a document's ground truth: `11235.pdf` -> `11235_ground_truth.json`
pub fn ground_truth_file_name(document: &str) -> String {
  let stem =
    document.strip_suffix(".pdf").or_else(|| document.strip_suffix(".PDF")).unwrap_or(document);
  format!("{stem}_ground_truth.json")
}

pub fn is_png(path: &Path) -> bool {
  path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("png"))
}

/// Files in `dir` in natural order of their names; hidden files skipped
pub fn list_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
  let mut files = Vec::new();
  for entry in std::fs::read_dir(dir)? {
    let path = entry?.path();
    let hidden = path.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.starts_with('.'));
    if path.is_file() && !hidden {
      files.push(path);
    }
  }
  files.sort_by(|a, b| natural_cmp(&file_name(a), &file_name(b)));
  Ok(files)
}

/// All page images in `dir`, naturally sorted
pub fn scan_page_images(dir: &Path) -> std::io::Result<Vec<PageImage>> {
  Ok(list_files(dir)?.iter().filter(|p| is_png(p)).filter_map(|p| document_for_image(p)).collect())
}

pub fn file_name(path: &Path) -> String {
  path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Chunk {
  Number(u128),
  Text(String),
}

fn chunks(text: &str) -> Vec<Chunk> {
  digit_runs()
    .find_iter(text)
    .map(|m| {
      let s = m.as_str();
      match s.parse::<u128>() {
        Ok(n) if s.bytes().all(|b| b.is_ascii_digit()) => Chunk::Number(n),
        _ => Chunk::Text(s.to_lowercase()),
      }
    })
    .collect()
}

/// Natural ordering: `9156.pdf` sorts before `11084.pdf`
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
  chunks(a).cmp(&chunks(b)).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;
  use tempfile::TempDir;

  #[test]
  fn test_document_for_image() {
    let page = document_for_image(Path::new("draw/11235.pdf_page1.png")).unwrap();
    assert_eq!(page.document, "11235.pdf");
    assert_eq!(page.page, Some(1));

    let page = document_for_image(Path::new("11709_part2_page12.png")).unwrap();
    assert_eq!(page.document, "11709_part2.pdf");
    assert_eq!(page.page, Some(12));

    let page = document_for_image(Path::new("13076.png")).unwrap();
    assert_eq!(page.document, "13076.pdf");
    assert_eq!(page.page, None);
  }

  #[test]
  fn test_ground_truth_file_name() {
    assert_eq!(ground_truth_file_name("11235.pdf"), "11235_ground_truth.json");
    assert_eq!(ground_truth_file_name("notes"), "notes_ground_truth.json");
  }

  #[test]
  fn test_natural_cmp() {
    let mut names = vec!["11084.pdf", "9156.pdf", "a10.png", "A2.png"];
    names.sort_by(|a, b| natural_cmp(a, b));
    assert_eq!(names, vec!["9156.pdf", "11084.pdf", "A2.png", "a10.png"]);
  }

  #[test]
  fn test_scan_page_images_filters_and_sorts() {
    let temp = TempDir::new().unwrap();
    let files = [
      "11084.pdf_page1.png",
      "9156.pdf_page2.png",
      "9156.pdf_page1.PNG",
      ".hidden.png",
      "notes.txt",
    ];
    for name in files {
      fs::write(temp.path().join(name), b"").unwrap();
    }

    let pages = scan_page_images(temp.path()).unwrap();
    let names: Vec<String> = pages.iter().map(|p| file_name(&p.path)).collect();
    assert_eq!(names, vec!["9156.pdf_page1.PNG", "9156.pdf_page2.png", "11084.pdf_page1.png"]);

    let all: Vec<String> = list_files(temp.path()).unwrap().iter().map(|p| file_name(p)).collect();
    assert_eq!(
      all,
      vec!["9156.pdf_page1.PNG", "9156.pdf_page2.png", "11084.pdf_page1.png", "notes.txt"]
    );
  }
}
