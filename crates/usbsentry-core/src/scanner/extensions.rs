/// Suspicious file-extension heuristic.
use compact_str::CompactString;
use std::collections::BTreeSet;

/// Extensions flagged when no configuration overrides them: executables,
/// scripts, installers, and registry files that autorun-style USB attacks
/// rely on.
pub const DEFAULT_SUSPICIOUS_EXTENSIONS: &[&str] = &[
    ".exe", ".bat", ".vbs", ".ps1", ".cmd", ".scr", ".js", ".jar", ".msi", ".dll", ".hta",
    ".com", ".pif", ".reg",
];

/// A normalised set of extension suffixes.
///
/// Entries are stored lowercase with a leading dot, so `"EXE"`, `"exe"` and
/// `".exe"` all configure the same suffix and `"fooexe"` never matches.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SuspiciousExtensions {
    suffixes: BTreeSet<CompactString>,
}

impl SuspiciousExtensions {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let suffixes = extensions
            .into_iter()
            .filter_map(|ext| normalise(ext.as_ref()))
            .collect();
        Self { suffixes }
    }

    /// The built-in list.
    pub fn defaults() -> Self {
        Self::new(DEFAULT_SUSPICIOUS_EXTENSIONS)
    }

    /// The configured suffix that `file_name` ends with, if any. Matching is
    /// case-insensitive.
    pub fn matching(&self, file_name: &str) -> Option<&str> {
        if self.suffixes.is_empty() {
            return None;
        }
        let lower = file_name.to_lowercase();
        self.suffixes
            .iter()
            .find(|suffix| lower.ends_with(suffix.as_str()))
            .map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.suffixes.iter().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.suffixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suffixes.is_empty()
    }
}

fn normalise(raw: &str) -> Option<CompactString> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "." {
        return None;
    }
    let lower = trimmed.to_lowercase();
    if lower.starts_with('.') {
        Some(CompactString::new(lower))
    } else {
        Some(CompactString::new(format!(".{lower}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_case_file_name_matches() {
        let set = SuspiciousExtensions::new([".exe"]);
        assert_eq!(set.matching("payload.EXE"), Some(".exe"));
        assert_eq!(set.matching("Payload.Exe"), Some(".exe"));
    }

    #[test]
    fn configuration_is_normalised() {
        let set = SuspiciousExtensions::new(["EXE", " .Bat ", "", "."]);
        let listed: Vec<&str> = set.iter().collect();
        assert_eq!(listed, vec![".bat", ".exe"]);
    }

    #[test]
    fn bare_suffix_without_dot_does_not_match() {
        let set = SuspiciousExtensions::new(["exe"]);
        assert_eq!(set.matching("notanexe"), None);
        assert_eq!(set.matching("setup.exe"), Some(".exe"));
    }

    #[test]
    fn clean_names_do_not_match() {
        let set = SuspiciousExtensions::defaults();
        assert_eq!(set.matching("holiday.jpg"), None);
        assert_eq!(set.matching("README"), None);
        assert_eq!(set.matching("autorun.inf.vbs"), Some(".vbs"));
    }

    #[test]
    fn empty_set_matches_nothing() {
        let set = SuspiciousExtensions::default();
        assert!(set.is_empty());
        assert_eq!(set.matching("x.exe"), None);
    }

    #[test]
    fn defaults_cover_the_builtin_list() {
        assert_eq!(
            SuspiciousExtensions::defaults().len(),
            DEFAULT_SUSPICIOUS_EXTENSIONS.len()
        );
    }
}
