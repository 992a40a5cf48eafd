//! Analysis engine
//!
//! Pass 1 detects, parses and extracts every file on a pool of worker
//! threads. Pass 2 starts once all results are in (or the deadline passes)
//! and links imports and calls against the complete symbol table before the
//! assembler freezes the graph.

use crate::adapter::{default_registry, AdapterRegistry, ModuleRoots};
use crate::assembler::{build_records, GraphAssembler};
use crate::config::AnalyzerConfig;
use crate::diagnostics::Diagnostic;
use crate::extract::{extract, ExtractedFile};
use crate::language::{detect, Detection, DetectorConfig, SkipReason};
use crate::linker::Linker;
use crate::parser::{parse_source, ParseError};
use crate::report::AnalysisReport;
use crate::source::{normalize_path, SourceFile};
use crate::{Error, Result};
use crossbeam::channel::{self, RecvTimeoutError};
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One file handed to the engine: path relative to the repository root plus
/// its raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub path: String,
    pub content: Vec<u8>,
}

impl InputFile {
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self { path: path.into(), content: content.into() }
    }
}

/// Outcome of pass 1 for one file
enum FileOutcome {
    Extracted(ExtractedFile),
    Rejected(Diagnostic),
}

/// Read-only state shared by the workers
struct WorkerContext {
    registry: Arc<AdapterRegistry>,
    detector: DetectorConfig,
    parse_timeout: Option<Duration>,
    cancel: Arc<AtomicBool>,
}

impl WorkerContext {
    fn process(&self, input: InputFile) -> FileOutcome {
        let language = match detect(&input.path, &input.content, &self.detector) {
            Detection::Supported(language) => language,
            Detection::Skip(reason) => {
                tracing::debug!("Skipping {}: {}", input.path, reason);
                return FileOutcome::Rejected(Diagnostic::skipped(input.path, reason));
            }
        };
        let Some(adapter) = self.registry.for_language(language) else {
            return FileOutcome::Rejected(Diagnostic::skipped(
                input.path,
                SkipReason::LanguageDisabled { language },
            ));
        };
        let text = match String::from_utf8(input.content) {
            Ok(text) => text,
            Err(_) => {
                return FileOutcome::Rejected(Diagnostic::skipped(input.path, SkipReason::NotUtf8));
            }
        };

        let file = SourceFile::new(input.path, language, text);
        let tree = match parse_source(&file, adapter, self.parse_timeout) {
            Ok(tree) => tree,
            Err(error) => {
                tracing::warn!("Parse failure: {}", error);
                return FileOutcome::Rejected(Diagnostic::parse_failure(error));
            }
        };
        let facts = extract(&file, &tree, adapter);
        tracing::debug!(
            "Extracted {}: {} symbols, {} imports, {} calls",
            file.path,
            facts.symbols.len(),
            facts.imports.len(),
            facts.calls.len()
        );
        FileOutcome::Extracted(ExtractedFile { file, facts })
    }

    /// Catch a panic inside one file and record it as that file's failure
    fn process_guarded(&self, input: InputFile) -> FileOutcome {
        let path = input.path.clone();
        panic::catch_unwind(AssertUnwindSafe(|| self.process(input))).unwrap_or_else(|payload| {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::warn!("Analysis of {} panicked: {}", path, detail);
            FileOutcome::Rejected(Diagnostic::parse_failure(ParseError {
                path,
                line: 1,
                column: 1,
                message: format!("analysis panicked: {}", detail),
            }))
        })
    }
}

/// Runs analyses with a fixed configuration.
pub struct Analyzer {
    config: AnalyzerConfig,
    registry: Arc<AdapterRegistry>,
}

impl Analyzer {
    /// Create an analyzer, checking that every enabled language has a
    /// loadable grammar
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        let registry = default_registry();
        for language in &config.languages {
            let adapter = registry
                .for_language(*language)
                .ok_or_else(|| Error::Grammar(format!("no adapter for {}", language)))?;
            tree_sitter::Parser::new()
                .set_language(&adapter.grammar())
                .map_err(|e| Error::Grammar(format!("{}: {}", language, e)))?;
        }

        Ok(Self { config, registry: Arc::new(registry) })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyze one repository snapshot.
    ///
    /// Only an empty input list is an error. Everything else that goes wrong
    /// with a file ends up as a diagnostic on the report.
    pub fn analyze(&self, root: &Path, inputs: Vec<InputFile>) -> Result<AnalysisReport> {
        if inputs.is_empty() {
            return Err(Error::NoInput);
        }
        let started = Instant::now();
        let repo = self.repo_name(root);

        // Later duplicates replace earlier ones; the map also sorts by path
        let inputs: Vec<InputFile> = inputs
            .into_iter()
            .map(|i| (normalize_path(&i.path), i.content))
            .collect::<BTreeMap<_, _>>()
            .into_iter()
            .map(|(path, content)| InputFile { path, content })
            .collect();
        let paths: Vec<String> = inputs.iter().map(|i| i.path.clone()).collect();
        let roots = ModuleRoots::discover(
            &self.registry,
            inputs.iter().map(|i| (i.path.as_str(), i.content.as_slice())),
        );
        tracing::info!("Analyzing {} files of {}", inputs.len(), repo);

        let (outcomes, partial) = self.extract_all(inputs);

        let mut diagnostics = Vec::new();
        let mut extracted = Vec::new();
        for (path, outcome) in paths.into_iter().zip(outcomes) {
            match outcome {
                Some(FileOutcome::Extracted(file)) => extracted.push(file),
                Some(FileOutcome::Rejected(diagnostic)) => diagnostics.push(diagnostic),
                None => {
                    tracing::warn!("Abandoned {} at deadline", path);
                    diagnostics.push(Diagnostic::abandoned(path));
                }
            }
        }

        let (linked, _) = Linker::new(&extracted, &self.registry)
            .with_module_roots(roots)
            .run();

        let mut assembler = GraphAssembler::new();
        for record in build_records(&repo, extracted, linked) {
            assembler.add_file(record);
        }
        let (graph, violations) = assembler.finish();
        diagnostics.extend(violations);
        diagnostics.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        let report = AnalysisReport::new(graph, diagnostics, partial);
        tracing::info!(
            "Analysis finished in {:?}: {} files analyzed, {}",
            started.elapsed(),
            report.completeness.files_analyzed,
            report.completeness
        );
        Ok(report)
    }

    fn repo_name(&self, root: &Path) -> String {
        self.config
            .repo
            .clone()
            .or_else(|| root.file_name().map(|s| s.to_string_lossy().to_string()))
            .unwrap_or_else(|| "repo".to_string())
    }

    /// Pass 1. Returns one slot per input (`None` when abandoned) and
    /// whether the deadline cut the pass short.
    fn extract_all(&self, inputs: Vec<InputFile>) -> (Vec<Option<FileOutcome>>, bool) {
        let total = inputs.len();
        let deadline = self.config.deadline.map(|d| Instant::now() + d);
        let context = Arc::new(WorkerContext {
            registry: Arc::clone(&self.registry),
            detector: self.config.detector(),
            parse_timeout: self.config.parse_timeout,
            cancel: Arc::new(AtomicBool::new(false)),
        });

        let (job_tx, job_rx) = channel::unbounded::<(usize, InputFile)>();
        let (result_tx, result_rx) = channel::unbounded::<(usize, FileOutcome)>();
        for job in inputs.into_iter().enumerate() {
            // The receiver is alive until the workers are spawned
            let _ = job_tx.send(job);
        }
        drop(job_tx);

        let workers = self.config.workers.clamp(1, total);
        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let jobs = job_rx.clone();
            let results = result_tx.clone();
            let context = Arc::clone(&context);
            handles.push(std::thread::spawn(move || {
                for (index, input) in jobs.iter() {
                    if context.cancel.load(Ordering::Relaxed) {
                        break;
                    }
                    let outcome = context.process_guarded(input);
                    if results.send((index, outcome)).is_err() {
                        break;
                    }
                }
            }));
        }
        drop(result_tx);

        let mut outcomes: Vec<Option<FileOutcome>> = (0..total).map(|_| None).collect();
        let mut received = 0;
        let mut partial = false;
        while received < total {
            let next = match deadline {
                Some(at) => result_rx.recv_deadline(at),
                None => result_rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match next {
                Ok((index, outcome)) => {
                    outcomes[index] = Some(outcome);
                    received += 1;
                }
                Err(RecvTimeoutError::Timeout) => {
                    context.cancel.store(true, Ordering::Relaxed);
                    tracing::warn!("Deadline reached with {} of {} files done", received, total);
                    partial = true;
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    partial = true;
                    break;
                }
            }
        }

        if partial {
            // In-flight workers finish their current file and exit on their own
            drop(handles);
        } else {
            for handle in handles {
                let _ = handle.join();
            }
        }
        (outcomes, partial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use crate::edge::{Callee, ImportTarget};
    use crate::symbol::SymbolKind;

    fn inputs(files: &[(&str, &str)]) -> Vec<InputFile> {
        files.iter().map(|(p, t)| InputFile::new(*p, t.as_bytes().to_vec())).collect()
    }

    fn analyze(files: &[(&str, &str)]) -> AnalysisReport {
        Analyzer::new(AnalyzerConfig::default())
            .unwrap()
            .analyze(Path::new("/work/demo"), inputs(files))
            .unwrap()
    }

    const GREETER: &[(&str, &str)] = &[
        ("main.py", "import math_utils\nfrom greeter import Greeter\n\ndef main():\n    g = Greeter()\n    g.greet()\n    math_utils.multiply(2, 3)\n"),
        ("greeter.py", "from math_utils import add\n\nclass Greeter:\n    def greet(self):\n        return add(1, 2)\n"),
        ("math_utils.py", "def add(a, b):\n    return a + b\n\ndef multiply(a, b):\n    return a * b\n"),
    ];

    fn describe_calls(report: &AnalysisReport) -> Vec<String> {
        let graph = &report.graph;
        graph
            .calls()
            .iter()
            .map(|c| {
                let caller = &graph.symbol(c.caller).unwrap().qualified_name;
                match &c.callee {
                    Callee::Resolved(id) => {
                        let callee = graph.symbol(*id).unwrap();
                        format!("{} -> {}:{}", caller, callee.path, callee.qualified_name)
                    }
                    Callee::Unresolved(text) => format!("{} -> ?{}", caller, text),
                }
            })
            .collect()
    }

    #[test]
    fn test_empty_input_is_fatal() {
        let analyzer = Analyzer::new(AnalyzerConfig::default()).unwrap();
        assert!(matches!(analyzer.analyze(Path::new("."), Vec::new()), Err(Error::NoInput)));
    }

    #[test]
    fn test_greeter_scenario() {
        let report = analyze(GREETER);
        assert_eq!(
            describe_calls(&report),
            vec![
                "Greeter.greet -> math_utils.py:add",
                "main -> greeter.py:Greeter",
                "main -> ?g.greet",
                "main -> math_utils.py:multiply",
            ]
        );
        let edges: Vec<_> = report
            .graph
            .imports()
            .iter()
            .map(|i| (i.source.as_str(), i.target.to_string()))
            .collect();
        assert_eq!(
            edges,
            vec![
                ("greeter.py", "internal:math_utils.py".to_string()),
                ("main.py", "internal:math_utils.py".to_string()),
                ("main.py", "internal:greeter.py".to_string()),
            ]
        );
        assert!(report.diagnostics.is_empty());
        assert_eq!(
            report.graph.symbols()[0].uri.to_string(),
            "repomap://demo/greeter.py#module:greeter@1"
        );
    }

    #[test]
    fn test_resolution_scenario_symbols() {
        let report = analyze(&[
            ("main.py", "import greeter\nimport math_utils\n\nprint(greeter.Greeter().greet())\n"),
            ("greeter.py", "from math_utils import add\n\nclass Greeter:\n    def greet(self):\n        return add(1, 2)\n"),
            ("math_utils.py", "def add(a, b):\n    return a + b\n\ndef multiply(a, b):\n    return a * b\n"),
        ]);
        let graph = &report.graph;

        let symbols: Vec<_> = graph
            .symbols()
            .iter()
            .map(|s| (s.kind, s.qualified_name.as_str()))
            .collect();
        assert_eq!(
            symbols,
            vec![
                (SymbolKind::Module, "greeter"),
                (SymbolKind::Class, "Greeter"),
                (SymbolKind::Method, "Greeter.greet"),
                (SymbolKind::Module, "main"),
                (SymbolKind::Module, "math_utils"),
                (SymbolKind::Function, "add"),
                (SymbolKind::Function, "multiply"),
            ]
        );

        let edges: Vec<_> = graph
            .imports()
            .iter()
            .map(|i| (i.source.as_str(), i.target.internal_path()))
            .collect();
        assert_eq!(
            edges,
            vec![
                ("greeter.py", Some("math_utils.py")),
                ("main.py", Some("greeter.py")),
                ("main.py", Some("math_utils.py")),
            ]
        );
        assert_eq!(describe_calls(&report), vec!["Greeter.greet -> math_utils.py:add"]);
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn test_deep_expression_does_not_abort_run() {
        let mut deep = String::from("x = 1");
        deep.push_str(&" + 1".repeat(20_000));
        deep.push('\n');
        let report = analyze(&[("deep.py", deep.as_str()), ("ok.py", "def f():\n    g()\n")]);

        let paths: Vec<_> = report.graph.files().iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["deep.py", "ok.py"]);
        assert_eq!(describe_calls(&report), vec!["f -> ?g"]);
    }

    #[test]
    fn test_same_line_definitions_are_distinct() {
        let report =
            analyze(&[("a.js", "function f() { return 1; } function f() { return 2; }\n")]);
        let uris: Vec<_> = report.graph.symbols().iter().map(|s| s.uri.to_string()).collect();
        assert_eq!(
            uris,
            vec![
                "repomap://demo/a.js#module:a@1",
                "repomap://demo/a.js#function:f@1:1",
                "repomap://demo/a.js#function:f@1:28",
            ]
        );
        assert!(report.diagnostics.is_empty());
        assert_eq!(report.graph.symbols()[2].id.index(), 2);
    }

    #[test]
    fn test_go_module_decides_internal_imports() {
        let report = analyze(&[
            ("go.mod", "module github.com/acme/app\n\ngo 1.22\n"),
            (
                "main.go",
                "package main\n\nimport (\n    \"github.com/acme/app/internal/util\"\n    \"github.com/pkg/errors\"\n)\n\nfunc main() {\n    util.Join()\n    errors.Wrap()\n}\n",
            ),
            ("internal/util/util.go", "package util\n\nfunc Join() {}\n"),
            ("pkg/errors/errors.go", "package errors\n\nfunc Wrap() {}\n"),
        ]);

        let targets: Vec<_> = report
            .graph
            .imports_from("main.go")
            .iter()
            .map(|i| i.target.to_string())
            .collect();
        assert_eq!(
            targets,
            vec!["internal:internal/util/util.go", "external:github.com/pkg/errors"]
        );
        assert_eq!(
            describe_calls(&report),
            vec!["main -> internal/util/util.go:Join", "main -> ?errors.Wrap"]
        );
    }

    #[test]
    fn test_bases_and_params_reach_the_graph() {
        let source = "class Square(Shape):\n    def scale(self, factor):\n        pass\n";
        let report = analyze(&[("shapes.py", source)]);
        let square = &report.graph.symbols()[1];
        assert_eq!(square.bases, vec!["Shape"]);
        assert_eq!(report.graph.symbols()[2].params, vec!["self", "factor"]);

        let json = report.to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["graph"]["symbols"][1]["bases"][0], "Shape");
        assert!(value["graph"]["symbols"][0].get("params").is_none());
    }

    #[test]
    fn test_deterministic_across_runs_and_input_order() {
        let first = analyze(GREETER);
        let mut reversed = GREETER.to_vec();
        reversed.reverse();
        let second = analyze(&reversed);
        assert_eq!(first.to_json_pretty().unwrap(), second.to_json_pretty().unwrap());

        let single = Analyzer::new(AnalyzerConfig { workers: 1, ..Default::default() })
            .unwrap()
            .analyze(Path::new("/work/demo"), inputs(GREETER))
            .unwrap();
        assert_eq!(first.to_json_pretty().unwrap(), single.to_json_pretty().unwrap());
    }

    #[test]
    fn test_duplicate_input_is_idempotent() {
        let mut files = GREETER.to_vec();
        files.push(GREETER[0]);
        let report = analyze(&files);
        assert_eq!(report.to_json_pretty().unwrap(), analyze(GREETER).to_json_pretty().unwrap());
    }

    #[test]
    fn test_partial_failure() {
        let report = analyze(&[
            ("a.py", "from c import helper\n\ndef run():\n    helper()\n"),
            ("b.py", "def broken(:\n    pass\n"),
            ("c.py", "def helper():\n    pass\n"),
        ]);

        let paths: Vec<_> = report.graph.files().iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["a.py", "c.py"]);
        assert_eq!(report.diagnostics.len(), 1);
        let DiagnosticKind::ParseFailure(error) = &report.diagnostics[0].kind else {
            panic!("expected a parse failure, got {:?}", report.diagnostics[0]);
        };
        assert_eq!((error.path.as_str(), error.line), ("b.py", 1));
        assert_eq!(describe_calls(&report), vec!["run -> c.py:helper"]);
        assert_eq!(report.completeness.parse_failures, 1);
    }

    #[test]
    fn test_unresolved_call_recorded_once() {
        let report = analyze(&[("a.py", "def run():\n    undefined_fn()\n")]);
        assert_eq!(describe_calls(&report), vec!["run -> ?undefined_fn"]);
        assert_eq!(report.completeness.unresolved_calls, 1);
        assert_eq!(report.completeness.unresolved_by_file["a.py"].unresolved_calls, 1);
    }

    #[test]
    fn test_graph_invariants_hold() {
        let report = analyze(&[
            ("pkg/__init__.py", ""),
            ("pkg/util.py", "import os\n\nclass Box:\n    def open(self):\n        return self.size()\n    def size(self):\n        return os.sep\n"),
            ("app.py", "from pkg import util\nfrom pkg.util import Box\n\ndef main():\n    Box().open()\n    util.Box()\n"),
            ("src/lib.rs", "mod shapes;\nuse shapes::Circle;\n\npub fn area() -> f64 {\n    Circle::new().area()\n}\n"),
            ("src/shapes.rs", "pub struct Circle;\n\nimpl Circle {\n    pub fn new() -> Self { Circle }\n    pub fn area(&self) -> f64 { self.radius() }\n    fn radius(&self) -> f64 { 1.0 }\n}\n"),
            ("logo.png", "\u{0}PNG"),
        ]);
        let graph = &report.graph;

        for symbol in graph.symbols() {
            assert!(graph.file(&symbol.path).is_some());
            assert!(symbol.line_start >= 1 && symbol.line_start <= symbol.line_end);
            assert!(symbol.line_end <= graph.file(&symbol.path).unwrap().line_count);
            match symbol.owner {
                None => assert_eq!(symbol.kind, SymbolKind::Module),
                Some(owner) => assert_eq!(graph.symbol(owner).unwrap().path, symbol.path),
            }
        }
        for import in graph.imports() {
            if let ImportTarget::Internal(path) = &import.target {
                assert!(graph.file(path).is_some());
            }
        }
        for call in graph.calls() {
            let caller = graph.symbol(call.caller).unwrap();
            assert!(caller.kind.is_callable());
            if let Some(callee) = call.callee.symbol() {
                let callee = graph.symbol(callee).unwrap();
                let imported = graph
                    .imports_from(&caller.path)
                    .iter()
                    .any(|i| i.target.internal_path() == Some(callee.path.as_str()));
                assert!(callee.path == caller.path || imported);
            }
        }
        for (i, symbol) in graph.symbols().iter().enumerate() {
            assert_eq!(symbol.id.index(), i);
        }

        assert!(
            !report
                .diagnostics
                .iter()
                .any(|d| matches!(d.kind, DiagnosticKind::ConsistencyViolation(_)))
        );
        assert_eq!(report.completeness.files_skipped, 1);
        let calls = describe_calls(&report);
        assert!(calls.contains(&"Box.open -> pkg/util.py:Box.size".to_string()));
        assert!(calls.contains(&"main -> pkg/util.py:Box".to_string()));
        assert!(calls.contains(&"Circle.area -> src/shapes.rs:Circle.radius".to_string()));
    }

    #[test]
    fn test_deadline_abandons_remaining_files() {
        let files: Vec<InputFile> = (0..200)
            .map(|i| {
                InputFile::new(format!("mod_{:03}.py", i), format!("def f{}():\n    g()\n", i))
            })
            .collect();
        let config = AnalyzerConfig {
            workers: 1,
            deadline: Some(Duration::ZERO),
            ..Default::default()
        };
        let report = Analyzer::new(config)
            .unwrap()
            .analyze(Path::new("/work/demo"), files)
            .unwrap();

        assert!(report.completeness.partial);
        assert!(report.completeness.abandoned >= 1);
        assert_eq!(report.completeness.abandoned + report.graph.files().len(), 200);
        assert!(report.diagnostics.iter().any(|d| d.kind == DiagnosticKind::Abandoned));
    }
}
