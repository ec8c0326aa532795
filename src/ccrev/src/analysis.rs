//! Class analysis over a set of script files.
//!
//! Files are analyzed independently, in parallel, and merged back in input
//! order. Each parse runs on its own thread under a time limit; a file whose
//! tree cannot be built degrades to a textual count of the factory token and
//! never affects the other files.

use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::class_model::{ClassModel, Extractor};
use crate::context::Context;
use crate::script::{LiteParser, ParseError, ScriptParser};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Token counted when a file cannot be parsed
pub const DEFAULT_COUNT_TOKEN: &str = "cc.Class";

/// Parse threads get a large stack so deeply nested bundles do not overflow
const PARSE_STACK_SIZE: usize = 64 * 1024 * 1024;

/// What one file contributed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value")]
pub enum FileAnalysis {
    Models(Vec<ClassModel>),
    /// Degraded result: occurrences of the count token in the raw text
    Count(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzedFile {
    pub path: PathBuf,
    pub result: FileAnalysis,
}

impl AnalyzedFile {
    pub fn is_degraded(&self) -> bool {
        matches!(self.result, FileAnalysis::Count(_))
    }
}

/// Per-file results in input order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub files: Vec<AnalyzedFile>,
    /// Inputs that could not be read
    pub skipped: Vec<PathBuf>,
}

impl AnalysisReport {
    /// Every extracted model, in file order then traversal order
    pub fn models(&self) -> impl Iterator<Item = &ClassModel> {
        self.files.iter().flat_map(|f| match &f.result {
            FileAnalysis::Models(models) => models.as_slice(),
            FileAnalysis::Count(_) => &[],
        })
    }

    pub fn into_models(self) -> Vec<ClassModel> {
        self.files
            .into_iter()
            .flat_map(|f| match f.result {
                FileAnalysis::Models(models) => models,
                FileAnalysis::Count(_) => Vec::new(),
            })
            .collect()
    }

    pub fn degraded(&self) -> impl Iterator<Item = &AnalyzedFile> {
        self.files.iter().filter(|f| f.is_degraded())
    }

    /// Sum of the token counts of degraded files
    pub fn counted(&self) -> usize {
        self.files
            .iter()
            .map(|f| match f.result {
                FileAnalysis::Count(n) => n,
                FileAnalysis::Models(_) => 0,
            })
            .sum()
    }
}

/// Runs parse and extraction per file
#[derive(Clone)]
pub struct Analyzer {
    parser: Arc<dyn ScriptParser>,
    extractor: Extractor,
    count_token: String,
    timeout: Duration,
    parallel: bool,
    dump_dir: Option<PathBuf>,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(Arc::new(LiteParser::new()))
    }
}

impl Analyzer {
    pub fn new(parser: Arc<dyn ScriptParser>) -> Self {
        Self {
            parser,
            extractor: Extractor::new(),
            count_token: DEFAULT_COUNT_TOKEN.to_string(),
            timeout: DEFAULT_TIMEOUT,
            parallel: true,
            dump_dir: None,
        }
    }

    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_count_token(mut self, token: impl Into<String>) -> Self {
        self.count_token = token.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Write each parsed tree as JSON into `dir`
    pub fn with_tree_dump(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dump_dir = Some(dir.into());
        self
    }

    /// Analyze the bootstrap script and every auxiliary script of a build
    pub fn analyze_context(&self, ctx: &Context) -> AnalysisReport {
        let (inputs, missing) = ctx.analysis_inputs();
        if !missing.is_empty() {
            tracing::warn!("skipping {} missing script(s)", missing.len());
        }
        tracing::info!("analyzing {} script(s)", inputs.len());
        self.analyze_files(&inputs)
    }

    pub fn analyze_files(&self, paths: &[PathBuf]) -> AnalysisReport {
        let results: Vec<Result<AnalyzedFile, PathBuf>> = if self.parallel {
            paths
                .par_iter()
                .enumerate()
                .map(|(i, p)| self.analyze_indexed(i, p))
                .collect()
        } else {
            paths
                .iter()
                .enumerate()
                .map(|(i, p)| self.analyze_indexed(i, p))
                .collect()
        };

        let mut report = AnalysisReport::default();
        for result in results {
            match result {
                Ok(file) => report.files.push(file),
                Err(path) => report.skipped.push(path),
            }
        }
        report
    }

    fn analyze_indexed(&self, index: usize, path: &Path) -> Result<AnalyzedFile, PathBuf> {
        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("cannot read {}: {}", path.display(), e);
                return Err(path.to_path_buf());
            }
        };

        let source = String::from_utf8_lossy(&raw).into_owned();
        let dump = self.dump_dir.as_ref().map(|dir| {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("script");
            dir.join(format!("{:03}_{}.json", index, stem))
        });

        let result = self.analyze_source_with_dump(source, dump);
        if let FileAnalysis::Count(n) = result {
            tracing::warn!(
                "{} could not be parsed, counted {} occurrence(s) of {}",
                path.display(),
                n,
                self.count_token
            );
        }
        Ok(AnalyzedFile {
            path: path.to_path_buf(),
            result,
        })
    }

    /// Analyze script text, degrading to a token count when parsing fails
    pub fn analyze_source(&self, source: &str) -> FileAnalysis {
        self.analyze_source_with_dump(source.to_string(), None)
    }

    fn analyze_source_with_dump(&self, source: String, dump: Option<PathBuf>) -> FileAnalysis {
        match self.parse_and_extract(&source, dump) {
            Ok(models) => FileAnalysis::Models(models),
            Err(e) => {
                tracing::debug!("parse failed: {}", e);
                FileAnalysis::Count(source.matches(self.count_token.as_str()).count())
            }
        }
    }

    /// Parse and extract on a dedicated thread, giving up after the timeout
    fn parse_and_extract(
        &self,
        source: &str,
        dump: Option<PathBuf>,
    ) -> Result<Vec<ClassModel>, ParseError> {
        let (tx, rx) = mpsc::channel();
        let parser = Arc::clone(&self.parser);
        let extractor = self.extractor.clone();
        let owned = source.to_string();

        thread::Builder::new()
            .name("ccrev-parse".to_string())
            .stack_size(PARSE_STACK_SIZE)
            .spawn(move || {
                let result = parser.parse(&owned).map(|tree| {
                    if let Some(path) = dump {
                        write_tree_dump(&path, &tree);
                    }
                    extractor.extract(&tree)
                });
                // The receiver is gone if the caller timed out
                let _ = tx.send(result);
            })
            .map_err(|e| ParseError::Aborted(e.to_string()))?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(ParseError::Timeout(self.timeout)),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(ParseError::Aborted("parser thread panicked".to_string()))
            }
        }
    }
}

fn write_tree_dump(path: &Path, tree: &crate::script::SyntaxTree) {
    let written = fs::create_dir_all(path.parent().unwrap_or(Path::new(".")))
        .map_err(|e| e.to_string())
        .and_then(|_| serde_json::to_vec(tree).map_err(|e| e.to_string()))
        .and_then(|json| fs::write(path, json).map_err(|e| e.to_string()));
    if let Err(e) = written {
        tracing::warn!("cannot write syntax tree {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::SyntaxTree;
    use tempfile::TempDir;

    /// Never finishes within any reasonable timeout
    struct StuckParser;

    impl ScriptParser for StuckParser {
        fn parse(&self, _source: &str) -> Result<SyntaxTree, ParseError> {
            thread::sleep(Duration::from_secs(5));
            Ok(SyntaxTree { body: Vec::new() })
        }
    }

    #[test]
    fn test_models_from_source() {
        let result = Analyzer::default().analyze_source("cc.Class({ name: 'A' }); cc.Class({ name: 'B' });");
        let FileAnalysis::Models(models) = result else {
            panic!("expected models");
        };
        assert_eq!(models.len(), 2);
    }

    #[test]
    fn test_parse_failure_degrades_to_count() {
        let result = Analyzer::default().analyze_source("cc.Class({ name: 'A' }; cc.Class(");
        assert_eq!(result, FileAnalysis::Count(2));
    }

    #[test]
    fn test_custom_count_token() {
        let result = Analyzer::default()
            .with_count_token("my.Class")
            .analyze_source("my.Class({ ) my.Class cc.Class");
        assert_eq!(result, FileAnalysis::Count(2));
    }

    #[test]
    fn test_timeout_degrades_to_count() {
        let analyzer =
            Analyzer::new(Arc::new(StuckParser)).with_timeout(Duration::from_millis(50));
        assert_eq!(
            analyzer.analyze_source("cc.Class({})"),
            FileAnalysis::Count(1)
        );
    }

    #[test]
    fn test_files_keep_input_order_and_isolate_failures() {
        let dir = TempDir::new().unwrap();
        let mut paths = Vec::new();
        for (i, body) in [
            "cc.Class({ name: 'First' })",
            "cc.Class({ name: 'Broken' ",
            "cc.Class({ name: 'Third' }); cc.Class({ name: 'Fourth' })",
        ]
        .iter()
        .enumerate()
        {
            let path = dir.path().join(format!("{}.js", i));
            fs::write(&path, body).unwrap();
            paths.push(path);
        }
        paths.push(dir.path().join("absent.js"));

        for parallel in [true, false] {
            let report = Analyzer::default().with_parallel(parallel).analyze_files(&paths);
            assert_eq!(report.files.len(), 3);
            assert_eq!(report.skipped, vec![dir.path().join("absent.js")]);
            assert_eq!(report.files[1].result, FileAnalysis::Count(1));
            assert_eq!(report.counted(), 1);
            assert_eq!(report.degraded().count(), 1);

            let names: Vec<_> = report.models().map(|m| m.display_name()).collect();
            assert_eq!(names, vec!["First", "Third", "Fourth"]);
        }
    }

    #[test]
    fn test_tree_dump() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("project.js");
        fs::write(&script, "cc.Class({ name: 'Dumped' })").unwrap();
        let dump_dir = dir.path().join("temp/ast");

        let report = Analyzer::default()
            .with_tree_dump(&dump_dir)
            .analyze_files(&[script]);
        assert_eq!(report.into_models().len(), 1);

        let dumped = fs::read_to_string(dump_dir.join("000_project.json")).unwrap();
        assert!(dumped.contains("CallExpression") || dumped.contains("\"Call\""));
    }

    #[test]
    fn test_analyze_context_skips_missing_scripts() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("res")).unwrap();
        fs::write(
            root.join("src/settings.js"),
            "window._CCSettings={jsList:['extra.js','missing.js']};",
        )
        .unwrap();
        fs::write(root.join("src/project.js"), "cc.Class({ name: 'Boot' })").unwrap();
        fs::write(root.join("src/extra.js"), "cc.Class({ name: 'Extra' })").unwrap();

        let ctx = Context::load(root, &root.join("out"), None).unwrap();
        let report = Analyzer::default().analyze_context(&ctx);
        let names: Vec<_> = report.models().map(|m| m.display_name()).collect();
        assert_eq!(names, vec!["Boot", "Extra"]);
    }
}
