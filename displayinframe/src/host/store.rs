use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use wiki::DocumentModel;
use wiki::reference::DocumentReference;

use crate::error::LoadError;
use crate::services::DocumentLoader;

/// Documents held in memory.
#[derive(Debug, Default)]
pub struct MemoryWiki {
    documents: HashMap<DocumentReference, DocumentModel>,
}

impl MemoryWiki {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `content` as the default-language source of `reference`.
    pub fn insert(&mut self, reference: DocumentReference, content: impl Into<String>) {
        let document = DocumentModel::new(reference.clone(), content);
        self.documents.insert(reference, document);
    }

    pub fn insert_document(&mut self, document: DocumentModel) {
        self.documents.insert(document.reference.clone(), document);
    }

    pub fn references(&self) -> Vec<&DocumentReference> {
        let mut references: Vec<_> = self.documents.keys().collect();
        references.sort();
        references
    }
}

impl DocumentLoader for MemoryWiki {
    fn load(&self, reference: &DocumentReference) -> Result<DocumentModel, LoadError> {
        self.documents
            .get(reference)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(reference.to_string()))
    }
}

/// Documents of a single wiki stored as Markdown files:
/// `<root>/<Space>/.../<Page>.md`, translations in `<Page>.<locale>.md`.
#[derive(Debug, Clone)]
pub struct FileWiki {
    root: PathBuf,
    wiki: String,
}

impl FileWiki {
    pub fn new(root: impl Into<PathBuf>, wiki: impl Into<String>) -> Self {
        FileWiki {
            root: root.into(),
            wiki: wiki.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding `reference`, or `None` when one of its names cannot be
    /// stored as a single path component under the root.
    pub fn path_of(&self, reference: &DocumentReference) -> Option<PathBuf> {
        self.page_path(reference)
    }

    fn page_path(&self, reference: &DocumentReference) -> Option<PathBuf> {
        if !reference.spaces.iter().all(|s| is_plain_name(s)) || !is_plain_name(&reference.name) {
            return None;
        }
        let mut path = self.root.clone();
        for space in &reference.spaces {
            path.push(space);
        }
        path.push(format!("{}.md", reference.name));
        Some(path)
    }

    /// Every document stored under the root, sorted.
    pub fn list(&self) -> Result<Vec<DocumentReference>, LoadError> {
        let mut references = Vec::new();
        self.collect(&self.root, &mut Vec::new(), &mut references)?;
        references.sort();
        Ok(references)
    }

    fn collect(
        &self,
        dir: &Path,
        spaces: &mut Vec<String>,
        out: &mut Vec<DocumentReference>,
    ) -> Result<(), LoadError> {
        let entries = fs::read_dir(dir).map_err(|source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            if path.is_dir() {
                spaces.push(name);
                self.collect(&path, spaces, out)?;
                spaces.pop();
            } else if let Some(page) = name.strip_suffix(".md") {
                // Pages at the root have no space; translations are not pages.
                if spaces.is_empty() || page.contains('.') {
                    continue;
                }
                out.push(DocumentReference::new(self.wiki.clone(), spaces.clone(), page));
            }
        }
        Ok(())
    }

    fn read_translations(
        &self,
        reference: &DocumentReference,
        page: &Path,
    ) -> Result<BTreeMap<String, String>, LoadError> {
        let mut translations = BTreeMap::new();
        let Some(dir) = page.parent() else {
            return Ok(translations);
        };
        let io_error = |path: &Path| {
            let path = path.to_path_buf();
            move |source: io::Error| LoadError::Io { path, source }
        };

        let prefix = format!("{}.", reference.name);
        for entry in fs::read_dir(dir).map_err(io_error(dir))? {
            let entry = entry.map_err(io_error(dir))?;
            let file_name = entry.file_name();
            let Some(locale) = file_name
                .to_str()
                .and_then(|n| n.strip_prefix(&prefix))
                .and_then(|n| n.strip_suffix(".md"))
                .filter(|l| !l.is_empty() && !l.contains('.'))
            else {
                continue;
            };
            let path = entry.path();
            let content = fs::read_to_string(&path).map_err(io_error(&path))?;
            translations.insert(locale.to_string(), content);
        }
        Ok(translations)
    }
}

/// A space or page name that maps to exactly one normal path component.
fn is_plain_name(name: &str) -> bool {
    !name.contains(['/', '\\'])
        && matches!(
            Path::new(name).components().collect::<Vec<_>>().as_slice(),
            [Component::Normal(_)]
        )
}

impl DocumentLoader for FileWiki {
    fn load(&self, reference: &DocumentReference) -> Result<DocumentModel, LoadError> {
        if reference.wiki != self.wiki {
            return Err(LoadError::NotFound(reference.to_string()));
        }

        let Some(path) = self.page_path(reference) else {
            warn!(document = %reference, "reference does not map to a file under the wiki root");
            return Err(LoadError::NotFound(reference.to_string()));
        };
        debug!(path = %path.display(), "loading page");
        let content = fs::read_to_string(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound(reference.to_string()),
            _ => LoadError::Io {
                path: path.clone(),
                source,
            },
        })?;

        let mut document = DocumentModel::new(reference.clone(), content);
        document.translations = self.read_translations(reference, &path)?;
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(s: &str) -> DocumentReference {
        s.parse().unwrap()
    }

    #[test]
    fn memory_wiki_reports_missing_documents() {
        let mut store = MemoryWiki::new();
        store.insert(reference("xwiki:Main.Home"), "home");
        assert_eq!(store.load(&reference("xwiki:Main.Home")).unwrap().content, "home");
        assert!(matches!(
            store.load(&reference("xwiki:Main.Gone")),
            Err(LoadError::NotFound(r)) if r == "xwiki:Main.Gone"
        ));
    }

    #[test]
    fn file_wiki_loads_pages_and_translations() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Docs").join("Guide")).unwrap();
        fs::write(dir.path().join("Docs").join("Guide").join("Intro.md"), "# Intro").unwrap();
        fs::write(dir.path().join("Docs").join("Guide").join("Intro.fr.md"), "# Introduction").unwrap();
        fs::write(dir.path().join("Docs").join("Home.md"), "home").unwrap();

        let store = FileWiki::new(dir.path(), "xwiki");
        let intro = store.load(&reference("xwiki:Docs.Guide.Intro")).unwrap();
        assert_eq!(intro.content, "# Intro");
        assert_eq!(intro.content_for(Some("fr")), "# Introduction");

        assert_eq!(
            store.list().unwrap(),
            vec![reference("xwiki:Docs.Home"), reference("xwiki:Docs.Guide.Intro")]
        );
    }

    #[test]
    fn file_wiki_only_serves_its_own_wiki() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Main")).unwrap();
        fs::write(dir.path().join("Main").join("Home.md"), "home").unwrap();

        let store = FileWiki::new(dir.path(), "xwiki");
        assert!(store.load(&reference("xwiki:Main.Home")).is_ok());
        assert!(matches!(
            store.load(&reference("other:Main.Home")),
            Err(LoadError::NotFound(_))
        ));
        assert!(matches!(
            store.load(&reference("xwiki:Main.Missing")),
            Err(LoadError::NotFound(_))
        ));
    }

    #[test]
    fn file_wiki_stays_under_its_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("wiki");
        fs::create_dir_all(root.join("Main")).unwrap();
        fs::create_dir_all(dir.path().join("outside")).unwrap();
        fs::write(dir.path().join("outside").join("WebHome.md"), "outside").unwrap();

        let store = FileWiki::new(&root, "xwiki");
        let escaping = [
            DocumentReference::new("xwiki", vec!["..".into(), "outside".into()], "WebHome"),
            DocumentReference::new("xwiki", vec![".".into(), "Main".into()], "WebHome"),
            DocumentReference::new(
                "xwiki",
                vec!["Main".into()],
                format!("{}/outside/WebHome", dir.path().display()),
            ),
            DocumentReference::new("xwiki", vec!["Main".into()], "..\\outside"),
        ];
        for reference in &escaping {
            assert_eq!(store.path_of(reference), None, "{:?}", reference);
            assert!(
                matches!(store.load(reference), Err(LoadError::NotFound(_))),
                "{:?}",
                reference
            );
        }
    }

    #[test]
    fn unreadable_translation_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Main").join("Home.fr.md")).unwrap();
        fs::write(dir.path().join("Main").join("Home.md"), "home").unwrap();

        let store = FileWiki::new(dir.path(), "xwiki");
        match store.load(&reference("xwiki:Main.Home")) {
            Err(LoadError::Io { path, .. }) => assert!(path.ends_with("Home.fr.md")),
            other => panic!("expected an I/O error, got {:?}", other.map(|d| d.content)),
        }
    }
}
