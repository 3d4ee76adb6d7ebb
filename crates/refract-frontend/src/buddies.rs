use refract_core::FileIdentity;

use crate::database::CompilationDatabase;

/// File extensions used to tell headers from main source files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceKinds {
    pub header_extensions: Vec<String>,
    pub source_extensions: Vec<String>,
}

impl Default for SourceKinds {
    fn default() -> Self {
        Self {
            header_extensions: ["h", "hh", "hpp", "hxx", "inl"]
                .into_iter()
                .map(String::from)
                .collect(),
            source_extensions: ["c", "cc", "cpp", "cxx", "c++", "m", "mm"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl SourceKinds {
    pub fn is_header(&self, file: &FileIdentity) -> bool {
        file.extension()
            .is_some_and(|ext| self.header_extensions.iter().any(|h| h == ext))
    }
}

/// Translation units that probably include `file`.
///
/// Candidates are main sources in the same directory with the same stem (ignoring a trailing
/// `_p` private-header marker), kept only if the database knows how to compile them.
pub fn potential_buddies(
    file: &FileIdentity,
    db: &dyn CompilationDatabase,
    kinds: &SourceKinds,
) -> Vec<FileIdentity> {
    let (Some(dir), Some(stem)) = (file.as_path().parent(), file.file_stem()) else {
        return Vec::new();
    };

    let mut stems = vec![stem];
    if let Some(stripped) = stem.strip_suffix("_p") {
        stems.push(stripped);
    }

    let mut out = Vec::new();
    for stem in stems {
        for ext in &kinds.source_extensions {
            let candidate = FileIdentity::from_canonical(dir.join(format!("{stem}.{ext}")));
            if &candidate != file && db.contains(&candidate) && !out.contains(&candidate) {
                out.push(candidate);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::database::FixedCompilationDatabase;

    fn id(path: &str) -> FileIdentity {
        FileIdentity::from_canonical(path)
    }

    #[test]
    fn header_finds_same_stem_sources_known_to_the_database() {
        let db = FixedCompilationDatabase::new(
            "/p",
            [id("/p/widget.cpp"), id("/p/other.cpp"), id("/q/widget.cc")],
            Vec::new(),
        );
        assert_eq!(
            potential_buddies(&id("/p/widget.h"), &db, &SourceKinds::default()),
            vec![id("/p/widget.cpp")]
        );
    }

    #[test]
    fn private_headers_map_to_their_public_stem() {
        let db = FixedCompilationDatabase::new("/p", [id("/p/widget.cpp")], Vec::new());
        assert_eq!(
            potential_buddies(&id("/p/widget_p.h"), &db, &SourceKinds::default()),
            vec![id("/p/widget.cpp")]
        );
    }

    #[test]
    fn no_buddies_without_database_entries() {
        let db = FixedCompilationDatabase::default();
        assert!(potential_buddies(&id("/p/widget.h"), &db, &SourceKinds::default()).is_empty());
        assert!(SourceKinds::default().is_header(&id("/p/widget.h")));
    }
}
