//! Names for archive entries and downloads.
//!
//! Entry names come from user-supplied module and file names, so anything
//! that could escape the archive root or trip an extractor is replaced.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static PATH_HOSTILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[/\\:*?"<>|\x00-\x1F\x7F]"#).expect("valid regex"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s").expect("valid regex"));

static NOT_HEADER_SAFE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]").expect("valid regex"));

fn strip_leading_dots(s: &str) -> &str {
    s.trim_start_matches('.')
}

/// Directory segment for a module: whitespace and path-hostile characters
/// become `_`.
pub fn path_segment(name: &str) -> String {
    let cleaned = WHITESPACE.replace_all(name.trim(), "_");
    let cleaned = PATH_HOSTILE.replace_all(&cleaned, "_");
    let cleaned = strip_leading_dots(&cleaned);
    if cleaned.is_empty() {
        "module".to_string()
    } else {
        cleaned.to_string()
    }
}

/// `<order>_<segment>` label of a module directory.
pub fn module_label(order: i32, name: &str) -> String {
    format!("{}_{}", order, path_segment(name))
}

/// Base name of an uploaded file with directory components removed.
/// Spaces and leading dots are kept so the original name survives.
pub fn file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned = PATH_HOSTILE.replace_all(base.trim(), "_");
    match &*cleaned {
        "" | "." | ".." => "file".to_string(),
        _ => cleaned.into_owned(),
    }
}

/// ASCII-only stem for a `Content-Disposition` file name.
pub fn download_stem(name: &str) -> String {
    let spaced = WHITESPACE.replace_all(name.trim(), "_");
    let cleaned = NOT_HEADER_SAFE.replace_all(&spaced, "_");
    let cleaned = strip_leading_dots(&cleaned);
    if cleaned.is_empty() {
        "export".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Splits `notes.pdf` into (`notes`, `.pdf`). Names without a dot have no
/// extension.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

/// Hands out names unique within one archive directory. Comparison is
/// case-insensitive so extraction on case-folding filesystems cannot collide.
#[derive(Debug, Default)]
pub struct UniqueNames {
    taken: HashSet<String>,
}

impl UniqueNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `name` as used without returning it.
    pub fn reserve(&mut self, name: &str) {
        self.taken.insert(name.to_lowercase());
    }

    fn try_take(&mut self, name: &str) -> bool {
        self.taken.insert(name.to_lowercase())
    }

    /// Returns `label`, or `label_2`, `label_3`, ... if already taken.
    pub fn claim_label(&mut self, label: &str) -> String {
        if self.try_take(label) {
            return label.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}_{}", label, n);
            if self.try_take(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Like [`claim_label`](Self::claim_label) but the suffix goes before the
    /// extension: `notes.pdf`, `notes_2.pdf`.
    pub fn claim_file(&mut self, name: &str) -> String {
        if self.try_take(name) {
            return name.to_string();
        }
        let (stem, ext) = split_extension(name);
        let mut n = 2;
        loop {
            let candidate = format!("{}_{}{}", stem, n, ext);
            if self.try_take(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_replaces_spaces_with_underscores() {
        assert_eq!(module_label(1, "Getting Started"), "1_Getting_Started");
        assert_eq!(module_label(3, "  Loops  and  Lists "), "3_Loops__and__Lists");
    }

    #[test]
    fn segment_strips_path_tricks() {
        assert_eq!(path_segment("../../etc"), "_.._etc");
        assert_eq!(path_segment("a/b\\c:d"), "a_b_c_d");
        assert_eq!(path_segment("..."), "module");
        assert_eq!(path_segment(""), "module");
    }

    #[test]
    fn file_name_keeps_base_name_only() {
        assert_eq!(file_name("notes.pdf"), "notes.pdf");
        assert_eq!(file_name("../../etc/passwd"), "passwd");
        assert_eq!(file_name("C:\\Users\\me\\lab 1.py"), "lab 1.py");
        assert_eq!(file_name(".env"), ".env");
        assert_eq!(file_name("..hidden"), "..hidden");
        assert_eq!(file_name("dir/"), "file");
        assert_eq!(file_name("a/.."), "file");
        assert_eq!(file_name("."), "file");
    }

    #[test]
    fn download_stem_is_header_safe() {
        assert_eq!(download_stem("Intro to CS"), "Intro_to_CS");
        assert_eq!(download_stem("Café \"101\""), "Caf___101_");
        assert_eq!(download_stem("   "), "export");
    }

    #[test]
    fn colliding_labels_get_suffixes() {
        let mut names = UniqueNames::new();
        assert_eq!(names.claim_label("1_Intro"), "1_Intro");
        assert_eq!(names.claim_label("1_Intro"), "1_Intro_2");
        assert_eq!(names.claim_label("1_intro"), "1_intro_3");
    }

    #[test]
    fn colliding_files_keep_their_extension() {
        let mut names = UniqueNames::new();
        names.reserve("module.json");
        assert_eq!(names.claim_file("notes.pdf"), "notes.pdf");
        assert_eq!(names.claim_file("notes.pdf"), "notes_2.pdf");
        assert_eq!(names.claim_file("Module.json"), "Module_2.json");
        assert_eq!(names.claim_file("Makefile"), "Makefile");
        assert_eq!(names.claim_file("Makefile"), "Makefile_2");
        assert_eq!(names.claim_file(".env"), ".env");
        assert_eq!(names.claim_file(".env"), ".env_2");
    }
}
