//! Plan applicator - renders substitution plans into chapter files
//!
//! This module provides high-level plan application that:
//! - Groups substitutions by chapter and loads each chapter once
//! - Checks which substitutions are already applied or stale
//! - Renders the rest with `substitute_all` (merging nested ones on request)
//! - Writes each chapter atomically and reports per-substitution results

use crate::cache::DomCache;
use crate::config::schema::{SubstitutionDefinition, SubstitutionPlan};
use crate::dom::{Dom, DomError, Substitution};
use crate::edit::{ChapterEdit, EditResult};
use crate::path::Partition;
use crate::safety::BookGuard;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Result of applying a single substitution
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "SubstitutionResult should be checked for success/failure"]
pub enum SubstitutionResult {
    /// Substitution was rendered into the chapter (or would be, on a dry run)
    Applied { file: PathBuf },
    /// The partition already holds the substitution's content
    AlreadyApplied { file: PathBuf },
    /// Substitution was skipped; the rest of its chapter still applies
    Failed { file: PathBuf, reason: String },
}

impl fmt::Display for SubstitutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubstitutionResult::Applied { file } => {
                write!(f, "Applied substitution to {}", file.display())
            }
            SubstitutionResult::AlreadyApplied { file } => {
                write!(f, "Already applied to {}", file.display())
            }
            SubstitutionResult::Failed { file, reason } => {
                write!(f, "Failed on {}: {}", file.display(), reason)
            }
        }
    }
}

/// Errors that fail every substitution of a chapter
#[derive(Debug)]
pub enum ApplicationError {
    /// Book root could not be opened
    Book { path: PathBuf, reason: String },
    /// Chapter path was rejected, or the chapter could not be read or parsed
    Chapter { file: PathBuf, reason: String },
    /// The chapter's substitutions could not be rendered together
    Render { file: PathBuf, source: DomError },
    /// Rendered chapter could not be written
    Write { file: PathBuf, reason: String },
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationError::Book { path, reason } => {
                write!(f, "cannot open book {}: {}", path.display(), reason)
            }
            ApplicationError::Chapter { file, reason } => {
                write!(f, "chapter {}: {}", file.display(), reason)
            }
            ApplicationError::Render { file, source } => {
                write!(f, "cannot render {}: {}", file.display(), source)
            }
            ApplicationError::Write { file, reason } => {
                write!(f, "cannot write {}: {}", file.display(), reason)
            }
        }
    }
}

impl std::error::Error for ApplicationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApplicationError::Render { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    /// Write rendered chapters under this directory, mirroring their path in
    /// the book, instead of in place.
    pub output: Option<PathBuf>,
    /// Render and report without writing anything.
    pub dry_run: bool,
}

/// One chapter after rendering, for diffs and summaries.
#[derive(Debug, Clone)]
pub struct RenderedChapter {
    pub file: PathBuf,
    pub original: String,
    pub rendered: String,
    /// `None` on a dry run or when nothing was written
    pub written: Option<EditResult>,
}

pub type PlanResults = Vec<(String, Result<SubstitutionResult, ApplicationError>)>;

#[derive(Debug, Default)]
pub struct PlanReport {
    pub results: PlanResults,
    pub chapters: Vec<RenderedChapter>,
}

/// Applies plans against one book, sharing parsed chapters between plans.
#[derive(Debug)]
pub struct Applicator {
    guard: BookGuard,
    cache: DomCache,
    options: ApplyOptions,
}

impl Applicator {
    pub fn new(book_root: &Path, options: ApplyOptions) -> Result<Self, ApplicationError> {
        let guard = BookGuard::new(book_root).map_err(|err| ApplicationError::Book {
            path: book_root.to_path_buf(),
            reason: err.to_string(),
        })?;
        Ok(Self {
            guard,
            cache: DomCache::new(),
            options,
        })
    }

    pub fn book_root(&self) -> &Path {
        self.guard.book_root()
    }

    pub fn apply(&mut self, plan: &SubstitutionPlan) -> PlanReport {
        let mut by_file: BTreeMap<PathBuf, Vec<&SubstitutionDefinition>> = BTreeMap::new();
        for definition in &plan.substitutions {
            let file = if plan.meta.book_relative {
                self.guard.book_root().join(&definition.file)
            } else {
                absolute(Path::new(&definition.file))
            };
            by_file.entry(file).or_default().push(definition);
        }

        let mut report = PlanReport::default();
        for (file, definitions) in by_file {
            match self.apply_chapter(&file, &definitions, plan.meta.merge_nested) {
                Ok((results, chapter)) => {
                    report.results.extend(results);
                    report.chapters.extend(chapter);
                }
                Err(err) => {
                    log::warn!("{err}");
                    let reason = match err {
                        ApplicationError::Chapter { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    report.results.extend(definitions.iter().map(|definition| {
                        (
                            definition.id.clone(),
                            Err(ApplicationError::Chapter {
                                file: file.clone(),
                                reason: reason.clone(),
                            }),
                        )
                    }));
                }
            }
        }
        report
    }

    fn apply_chapter(
        &mut self,
        file: &Path,
        definitions: &[&SubstitutionDefinition],
        merge_nested: bool,
    ) -> Result<(PlanResults, Option<RenderedChapter>), ApplicationError> {
        let chapter_error = |reason: String| ApplicationError::Chapter {
            file: file.to_path_buf(),
            reason,
        };

        let canonical = self
            .guard
            .validate_path(file)
            .map_err(|err| chapter_error(err.to_string()))?;
        let dom = self
            .cache
            .get_or_load(&canonical)
            .map_err(|err| chapter_error(err.to_string()))?;

        let mut results: PlanResults = Vec::new();
        let mut resolved: Vec<(&SubstitutionDefinition, Substitution)> = Vec::new();
        for &definition in definitions {
            match resolve(&dom, definition) {
                Ok(substitution) => resolved.push((definition, substitution)),
                Err(reason) => {
                    log::warn!("skipping substitution '{}': {}", definition.id, reason);
                    results.push((
                        definition.id.clone(),
                        Ok(SubstitutionResult::Failed {
                            file: canonical.clone(),
                            reason,
                        }),
                    ));
                }
            }
        }

        // A nested group is settled as a whole: once merged and written, the
        // inner substitutions already hold their content while the outer one
        // holds the merged text, not its own.
        let mut pending: Vec<(String, Substitution)> = Vec::new();
        for group in nesting_groups(&resolved) {
            let members: Vec<Substitution> =
                group.iter().map(|&i| resolved[i].1.clone()).collect();
            if already_applied(&dom, &members, merge_nested) {
                results.extend(group.iter().map(|&i| {
                    (
                        resolved[i].0.id.clone(),
                        Ok(SubstitutionResult::AlreadyApplied {
                            file: canonical.clone(),
                        }),
                    )
                }));
                continue;
            }

            for &i in &group {
                let (definition, substitution) = &resolved[i];
                match verify(&dom, definition, substitution) {
                    Ok(()) => pending.push((definition.id.clone(), substitution.clone())),
                    Err(reason) => {
                        log::warn!("skipping substitution '{}': {}", definition.id, reason);
                        results.push((
                            definition.id.clone(),
                            Ok(SubstitutionResult::Failed {
                                file: canonical.clone(),
                                reason,
                            }),
                        ));
                    }
                }
            }
        }

        if pending.is_empty() && self.options.output.is_none() {
            return Ok((results, None));
        }

        let substitutions: Vec<Substitution> =
            pending.iter().map(|(_, substitution)| substitution.clone()).collect();
        let nested = Partition::find_overlap(substitutions.iter().map(|s| &s.partition)).is_some();
        let rendered = if merge_nested && nested {
            dom.substitute_all_merged(&substitutions)
        } else {
            dom.substitute_all(&substitutions)
        };
        let rendered = match rendered {
            Ok(rendered) => rendered,
            Err(source) => {
                results.extend(pending.into_iter().map(|(id, _)| {
                    (
                        id,
                        Err(ApplicationError::Render {
                            file: canonical.clone(),
                            source: source.clone(),
                        }),
                    )
                }));
                return Ok((results, None));
            }
        };

        let written = if self.options.dry_run {
            None
        } else {
            let target = match &self.options.output {
                Some(output) => output.join(self.guard.relative(&canonical)),
                None => canonical.clone(),
            };
            let edit = ChapterEdit::new(&canonical, dom.text(), rendered.clone()).with_target(target);
            match edit.apply() {
                Ok(result) => {
                    if self.options.output.is_none() {
                        self.cache.invalidate(&canonical);
                    }
                    Some(result)
                }
                Err(err) => {
                    let reason = err.to_string();
                    results.extend(pending.into_iter().map(|(id, _)| {
                        (
                            id,
                            Err(ApplicationError::Write {
                                file: canonical.clone(),
                                reason: reason.clone(),
                            }),
                        )
                    }));
                    return Ok((results, None));
                }
            }
        };

        results.extend(pending.into_iter().map(|(id, _)| {
            (
                id,
                Ok(SubstitutionResult::Applied {
                    file: canonical.clone(),
                }),
            )
        }));

        Ok((
            results,
            Some(RenderedChapter {
                file: canonical,
                original: dom.text().to_string(),
                rendered,
                written,
            }),
        ))
    }
}

/// Parse the definition and check that its partition exists in the chapter.
fn resolve(dom: &Dom, definition: &SubstitutionDefinition) -> Result<Substitution, String> {
    let substitution = definition.to_substitution().map_err(|err| err.to_string())?;
    dom.extract_content(&substitution.partition)
        .map_err(|err| err.to_string())?;
    Ok(substitution)
}

/// Check the partition still holds the text the plan expects to replace.
fn verify(
    dom: &Dom,
    definition: &SubstitutionDefinition,
    substitution: &Substitution,
) -> Result<(), String> {
    let Some(verify) = &definition.verify else {
        return Ok(());
    };
    let current = dom
        .extract_content(&substitution.partition)
        .map_err(|err| err.to_string())?;
    let matches = verify
        .to_verification()
        .is_some_and(|verification| verification.matches(current));
    if matches {
        Ok(())
    } else {
        Err(format!(
            "partition {} no longer holds the expected text",
            substitution.partition
        ))
    }
}

/// Indices grouped under each outermost substitution: the outermost one first,
/// then every substitution its partition encloses.
fn nesting_groups(resolved: &[(&SubstitutionDefinition, Substitution)]) -> Vec<Vec<usize>> {
    let partitions: Vec<&Partition> = resolved.iter().map(|(_, s)| &s.partition).collect();
    let mut assigned = vec![false; partitions.len()];
    let mut groups = Vec::new();

    for outer in 0..partitions.len() {
        if partitions.iter().any(|p| p.encloses(partitions[outer])) {
            continue;
        }
        assigned[outer] = true;
        let mut group = vec![outer];
        for inner in 0..partitions.len() {
            if !assigned[inner] && partitions[outer].encloses(partitions[inner]) {
                assigned[inner] = true;
                group.push(inner);
            }
        }
        groups.push(group);
    }
    groups
}

/// Whether the chapter already shows what rendering `group` would produce.
///
/// A nested group can only have been applied merged, so without
/// `merge_nested` it never counts as applied.
fn already_applied(dom: &Dom, group: &[Substitution], merge_nested: bool) -> bool {
    let merged;
    let expected = match group {
        [single] => single,
        _ if merge_nested => match dom.merge_substitutions(group) {
            Ok(substitution) => {
                merged = substitution;
                &merged
            }
            Err(_) => return false,
        },
        _ => return false,
    };
    dom.extract_content(&expected.partition)
        .is_ok_and(|current| current == expected.content)
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Apply a plan to a book.
///
/// # Returns
///
/// One result per substitution, plus the rendered chapters.
pub fn apply_plan(plan: &SubstitutionPlan, book_root: &Path, options: ApplyOptions) -> PlanReport {
    match Applicator::new(book_root, options) {
        Ok(mut applicator) => applicator.apply(plan),
        Err(err) => failed_report(plan, &err),
    }
}

/// Check plan status without writing anything.
///
/// Mirrors `apply_plan` result semantics (`Applied` means "would apply").
pub fn check_plan(plan: &SubstitutionPlan, book_root: &Path) -> PlanResults {
    let options = ApplyOptions {
        output: None,
        dry_run: true,
    };
    apply_plan(plan, book_root, options).results
}

fn failed_report(plan: &SubstitutionPlan, err: &ApplicationError) -> PlanReport {
    let reason = err.to_string();
    let results = plan
        .substitutions
        .iter()
        .map(|definition| {
            (
                definition.id.clone(),
                Err(ApplicationError::Chapter {
                    file: PathBuf::from(&definition.file),
                    reason: reason.clone(),
                }),
            )
        })
        .collect();
    PlanReport {
        results,
        chapters: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_from_str;
    use std::fs;

    const CHAPTER: &str = "<html><body><p>Hello</p><p>World</p></body></html>";

    fn book() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("OEBPS")).unwrap();
        fs::write(dir.path().join("OEBPS/ch1.xhtml"), CHAPTER).unwrap();
        dir
    }

    fn plan(body: &str) -> SubstitutionPlan {
        load_from_str(&format!(
            "[meta]\nname = \"test\"\nbook_relative = true\n\n{body}"
        ))
        .unwrap()
    }

    #[test]
    fn applies_and_reports_each_substitution() {
        let dir = book();
        let plan = plan(
            r#"
[[substitutions]]
id = "first"
file = "OEBPS/ch1.xhtml"
partition = "0/0/0-0"
content = "<p>Bonjour</p>"

[[substitutions]]
id = "second"
file = "OEBPS/ch1.xhtml"
partition = "0/0/1/0-0"
content = "le monde"
"#,
        );

        let report = apply_plan(&plan, dir.path(), ApplyOptions::default());
        assert_eq!(report.results.len(), 2);
        assert!(report
            .results
            .iter()
            .all(|(_, result)| matches!(result, Ok(SubstitutionResult::Applied { .. }))));
        assert_eq!(
            fs::read_to_string(dir.path().join("OEBPS/ch1.xhtml")).unwrap(),
            "<html><body><p>Bonjour</p><p>le monde</p></body></html>"
        );

        let again = check_plan(&plan, dir.path());
        assert!(again
            .iter()
            .all(|(_, result)| matches!(result, Ok(SubstitutionResult::AlreadyApplied { .. }))));
    }

    #[test]
    fn stale_verification_skips_only_that_substitution() {
        let dir = book();
        let plan = plan(
            r#"
[[substitutions]]
id = "stale"
file = "OEBPS/ch1.xhtml"
partition = "0/0/0-0"
content = "<p>Bonjour</p>"
[substitutions.verify]
method = "exact_match"
expected_text = "<p>Goodbye</p>"

[[substitutions]]
id = "fresh"
file = "OEBPS/ch1.xhtml"
partition = "0/0/1-1"
content = "<p>Monde</p>"
[substitutions.verify]
method = "exact_match"
expected_text = "<p>World</p>"
"#,
        );

        let report = apply_plan(&plan, dir.path(), ApplyOptions::default());
        let by_id: BTreeMap<_, _> = report.results.into_iter().collect();
        assert!(matches!(
            by_id["stale"],
            Ok(SubstitutionResult::Failed { .. })
        ));
        assert!(matches!(
            by_id["fresh"],
            Ok(SubstitutionResult::Applied { .. })
        ));
        assert_eq!(
            fs::read_to_string(dir.path().join("OEBPS/ch1.xhtml")).unwrap(),
            "<html><body><p>Hello</p><p>Monde</p></body></html>"
        );
    }

    #[test]
    fn dry_run_and_check_leave_book_untouched() {
        let dir = book();
        let plan = plan(
            r#"
[[substitutions]]
id = "first"
file = "OEBPS/ch1.xhtml"
partition = "0/0/0-0"
content = "<p>Bonjour</p>"
"#,
        );

        let options = ApplyOptions {
            output: None,
            dry_run: true,
        };
        let report = apply_plan(&plan, dir.path(), options);
        assert_eq!(report.chapters.len(), 1);
        assert!(report.chapters[0].written.is_none());
        assert!(report.chapters[0].rendered.contains("Bonjour"));

        let results = check_plan(&plan, dir.path());
        assert!(matches!(
            results[0].1,
            Ok(SubstitutionResult::Applied { .. })
        ));
        assert_eq!(
            fs::read_to_string(dir.path().join("OEBPS/ch1.xhtml")).unwrap(),
            CHAPTER
        );
    }

    #[test]
    fn writes_under_output_directory() {
        let dir = book();
        let out = tempfile::tempdir().unwrap();
        let plan = plan(
            r#"
[[substitutions]]
id = "first"
file = "OEBPS/ch1.xhtml"
partition = "0/0/0-0"
content = "<p>Hallo</p>"
"#,
        );

        let options = ApplyOptions {
            output: Some(out.path().to_path_buf()),
            dry_run: false,
        };
        let report = apply_plan(&plan, dir.path(), options);
        assert!(matches!(
            report.results[0].1,
            Ok(SubstitutionResult::Applied { .. })
        ));
        assert_eq!(
            fs::read_to_string(out.path().join("OEBPS/ch1.xhtml")).unwrap(),
            "<html><body><p>Hallo</p><p>World</p></body></html>"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("OEBPS/ch1.xhtml")).unwrap(),
            CHAPTER
        );
    }

    #[test]
    fn nested_substitutions_need_merge_nested() {
        let body = r#"
[[substitutions]]
id = "outer"
file = "OEBPS/ch1.xhtml"
partition = "0/0/0-0"
content = "<p>Bonjour</p>"

[[substitutions]]
id = "inner"
file = "OEBPS/ch1.xhtml"
partition = "0/0/0/0-0"
content = "Salut"
"#;
        let dir = book();
        let report = apply_plan(&plan(body), dir.path(), ApplyOptions::default());
        assert!(report.results.iter().all(|(_, result)| matches!(
            result,
            Err(ApplicationError::Render {
                source: DomError::OverlappingPartitions { .. },
                ..
            })
        )));

        let mut merged_plan = plan(body);
        merged_plan.meta.merge_nested = true;
        let report = apply_plan(&merged_plan, dir.path(), ApplyOptions::default());
        assert!(report
            .results
            .iter()
            .all(|(_, result)| matches!(result, Ok(SubstitutionResult::Applied { .. }))));
        assert_eq!(
            fs::read_to_string(dir.path().join("OEBPS/ch1.xhtml")).unwrap(),
            "<html><body><p>Salut</p><p>World</p></body></html>"
        );
    }

    #[test]
    fn merged_nested_plan_is_idempotent() {
        let dir = book();
        let mut plan = plan(
            r#"
[[substitutions]]
id = "outer"
file = "OEBPS/ch1.xhtml"
partition = "0/0/0-0"
content = "<p>Bonjour</p>"

[[substitutions]]
id = "inner"
file = "OEBPS/ch1.xhtml"
partition = "0/0/0/0-0"
content = "Salut"
"#,
        );
        plan.meta.merge_nested = true;
        let chapter = dir.path().join("OEBPS/ch1.xhtml");
        let applied = "<html><body><p>Salut</p><p>World</p></body></html>";

        let _first = apply_plan(&plan, dir.path(), ApplyOptions::default());
        assert_eq!(fs::read_to_string(&chapter).unwrap(), applied);

        let second = apply_plan(&plan, dir.path(), ApplyOptions::default());
        let by_id: BTreeMap<_, _> = second.results.into_iter().collect();
        assert!(matches!(
            by_id["outer"],
            Ok(SubstitutionResult::AlreadyApplied { .. })
        ));
        assert!(matches!(
            by_id["inner"],
            Ok(SubstitutionResult::AlreadyApplied { .. })
        ));
        assert!(second.chapters.is_empty());
        assert_eq!(fs::read_to_string(&chapter).unwrap(), applied);
    }

    #[test]
    fn inner_substitution_in_place_does_not_settle_its_group() {
        // The inner text already matches, but the outer paragraph still
        // has to be rendered around it.
        let dir = book();
        let mut plan = plan(
            r#"
[[substitutions]]
id = "outer"
file = "OEBPS/ch1.xhtml"
partition = "0/0/0-0"
content = "<p class=\"fr\">Bonjour</p>"

[[substitutions]]
id = "inner"
file = "OEBPS/ch1.xhtml"
partition = "0/0/0/0-0"
content = "Hello"
"#,
        );
        plan.meta.merge_nested = true;

        let report = apply_plan(&plan, dir.path(), ApplyOptions::default());
        assert!(report
            .results
            .iter()
            .all(|(_, result)| matches!(result, Ok(SubstitutionResult::Applied { .. }))));
        assert_eq!(
            fs::read_to_string(dir.path().join("OEBPS/ch1.xhtml")).unwrap(),
            "<html><body><p class=\"fr\">Hello</p><p>World</p></body></html>"
        );
    }

    #[test]
    fn missing_chapter_fails_its_substitutions() {
        let dir = book();
        let plan = plan(
            r#"
[[substitutions]]
id = "ghost"
file = "OEBPS/missing.xhtml"
partition = "0-0"
content = "x"
"#,
        );
        let report = apply_plan(&plan, dir.path(), ApplyOptions::default());
        assert!(matches!(
            report.results[0].1,
            Err(ApplicationError::Chapter { .. })
        ));
    }

    #[test]
    fn missing_node_fails_that_substitution() {
        let dir = book();
        let plan = plan(
            r#"
[[substitutions]]
id = "far"
file = "OEBPS/ch1.xhtml"
partition = "0/0/5-5"
content = "x"
"#,
        );
        let report = apply_plan(&plan, dir.path(), ApplyOptions::default());
        match &report.results[0].1 {
            Ok(SubstitutionResult::Failed { reason, .. }) => assert!(reason.contains("0/0/5")),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
