//! Generation driver: discover schema documents, compile them, merge their codes into one
//! run-wide table, and write the rendered artifacts.
//!
//! Output layout under the output directory:
//!
//! ```text
//! <doc>/msg_<name>.txt     one per compiled message
//! <doc>/<doc>.enums.txt    enum listing of the document
//! main/crc_table.txt       run-wide extra-CRC table
//! main/dispatch.txt        msgid -> message name
//! ```
//!
//! Schema problems, including files that are not UTF-8, are collected per document and
//! never stop the run. Filesystem errors are fatal.

use crate::codec::Endianness;
use crate::compiler::compile_source;
use crate::error::{ParseError, SchemaError};
use crate::pool::{default_workers, parallel_map};
use crate::render::{render_crc_table, render_dispatch, render_enums, render_message};
use crate::table::CompatibilityTable;
use crate::types::MessageSpec;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Run configuration.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub schema_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Upper bound on compile threads.
    pub workers: usize,
    pub endianness: Endianness,
}

impl GenerateOptions {
    pub fn new(schema_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            schema_dir: schema_dir.into(),
            output_dir: output_dir.into(),
            workers: default_workers(),
            endianness: Endianness::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GenerateError {
    fn io(path: &Path) -> impl FnOnce(std::io::Error) -> GenerateError + '_ {
        move |source| GenerateError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Outcome for one schema document.
#[derive(Debug)]
pub struct DocumentReport {
    pub name: String,
    pub path: PathBuf,
    /// Set when the document could not be parsed; nothing else was produced for it.
    pub parse_error: Option<ParseError>,
    pub schema_errors: Vec<SchemaError>,
    /// Names of the messages written, in document order.
    pub messages: Vec<String>,
    pub enums: usize,
}

impl DocumentReport {
    pub fn error_count(&self) -> usize {
        self.schema_errors.len() + usize::from(self.parse_error.is_some())
    }
}

#[derive(Debug)]
pub struct GenerateReport {
    pub documents: Vec<DocumentReport>,
    pub table: CompatibilityTable,
}

impl GenerateReport {
    pub fn error_count(&self) -> usize {
        self.documents.iter().map(DocumentReport::error_count).sum()
    }

    pub fn message_count(&self) -> usize {
        self.documents.iter().map(|d| d.messages.len()).sum()
    }
}

/// `*.xml` files directly under `dir`, sorted by path.
pub fn discover_schemas(dir: &Path) -> Result<Vec<PathBuf>, GenerateError> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(GenerateError::io(dir))? {
        let path = entry.map_err(GenerateError::io(dir))?.path();
        let is_xml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("xml"));
        if is_xml && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Write `contents` to a temporary file in the target directory and rename it into place.
fn write_atomic(path: &Path, contents: &str) -> Result<(), GenerateError> {
    let dir = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(GenerateError::io(dir))?;
    tmp.write_all(contents.as_bytes()).map_err(GenerateError::io(tmp.path()))?;
    tmp.persist(path).map_err(|e| GenerateError::Io {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

/// Message artifact file name. Names differing only in case share one.
fn artifact_name(spec: &MessageSpec) -> String {
    format!("msg_{}.txt", spec.name().to_lowercase())
}

fn document_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Run the whole generation.
pub fn generate(options: &GenerateOptions) -> Result<GenerateReport, GenerateError> {
    let paths = discover_schemas(&options.schema_dir)?;
    info!(dir = %options.schema_dir.display(), documents = paths.len(), "schemas found");

    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = fs::read(&path).map_err(GenerateError::io(&path))?;
        let source = String::from_utf8(bytes).map_err(|e| ParseError::Encoding(e.utf8_error().to_string()));
        sources.push((document_name(&path), path, source));
    }

    let workers = options.workers.max(1);
    let per_document = (workers / sources.len().max(1)).max(1);
    let compiled = parallel_map(&sources, workers, |(name, _, source)| match source {
        Ok(text) => compile_source(name, text, per_document),
        Err(e) => Err(e.clone()),
    });

    let mut table = CompatibilityTable::new();
    let mut documents = Vec::with_capacity(sources.len());
    for ((name, path, _), result) in sources.into_iter().zip(compiled) {
        let mut report = DocumentReport {
            name: name.clone(),
            path,
            parse_error: None,
            schema_errors: Vec::new(),
            messages: Vec::new(),
            enums: 0,
        };
        let doc = match result {
            Ok(doc) => doc,
            Err(e) => {
                warn!(document = %name, error = %e, "document skipped");
                report.parse_error = Some(e);
                documents.push(report);
                continue;
            }
        };
        report.schema_errors = doc.errors;

        let mut files: HashMap<String, &str> = HashMap::new();
        let mut kept: Vec<(String, &MessageSpec)> = Vec::with_capacity(doc.messages.len());
        for spec in &doc.messages {
            let file = artifact_name(spec);
            if let Some(existing) = files.get(&file) {
                let e = SchemaError::ArtifactCollision {
                    message: spec.name().to_string(),
                    existing: existing.to_string(),
                    file,
                };
                warn!(document = %name, error = %e, "message skipped");
                report.schema_errors.push(e);
                continue;
            }
            match table.register_message(spec) {
                Ok(()) => {
                    files.insert(file.clone(), spec.name());
                    kept.push((file, spec));
                }
                Err(e) => {
                    warn!(document = %name, error = %e, "message skipped");
                    report.schema_errors.push(e);
                }
            }
        }

        let dir = options.output_dir.join(&name);
        fs::create_dir_all(&dir).map_err(GenerateError::io(&dir))?;
        for (file, spec) in kept {
            let path = dir.join(file);
            write_atomic(&path, &render_message(spec, options.endianness))?;
            debug!(path = %path.display(), "wrote message");
            report.messages.push(spec.name().to_string());
        }
        write_atomic(
            &dir.join(format!("{}.enums.txt", name)),
            &render_enums(&name, &doc.enums),
        )?;
        report.enums = doc.enums.len();

        info!(
            document = %name,
            messages = report.messages.len(),
            enums = report.enums,
            errors = report.error_count(),
            "document generated"
        );
        documents.push(report);
    }

    let main = options.output_dir.join("main");
    fs::create_dir_all(&main).map_err(GenerateError::io(&main))?;
    write_atomic(&main.join("crc_table.txt"), &render_crc_table(&table))?;
    write_atomic(&main.join("dispatch.txt"), &render_dispatch(&table))?;

    Ok(GenerateReport { documents, table })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovers_only_xml_sorted() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["b.xml", "a.XML", "notes.txt"] {
            fs::write(dir.path().join(name), "").expect("write");
        }
        fs::create_dir(dir.path().join("sub.xml")).expect("mkdir");
        let found: Vec<String> = discover_schemas(dir.path())
            .expect("discover")
            .iter()
            .map(|p| p.file_name().expect("name").to_string_lossy().into_owned())
            .collect();
        assert_eq!(found, ["a.XML", "b.xml"]);
    }

    #[test]
    fn missing_schema_dir_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let options = GenerateOptions::new(dir.path().join("absent"), dir.path().join("out"));
        assert!(matches!(generate(&options), Err(GenerateError::Io { .. })));
    }

    #[test]
    fn atomic_write_leaves_only_the_target() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("x.txt");
        write_atomic(&path, "one").expect("write");
        write_atomic(&path, "two").expect("overwrite");
        assert_eq!(fs::read_to_string(&path).expect("read"), "two");
        assert_eq!(fs::read_dir(dir.path()).expect("list").count(), 1);
    }
}
