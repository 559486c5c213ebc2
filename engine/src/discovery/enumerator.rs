//! Candidate unit enumeration
//!
//! The loader's walk is tried first. If the loader cannot walk, or its walk
//! fails part way, enumeration switches to a breadth-first directory scan for
//! the rest of the run. The scan rebuilds qualified names from path segments
//! and lets the condition decide which paths are candidates.

use super::{Condition, Roots, ScanFailure, Strategy, UnitLayout};
use super::layout::unit_stem;
use crate::runtime::{Loader, UnitWalk};
use sdk::errors::EngineError;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

enum Step<'a> {
    Start,
    Primary(UnitWalk<'a>),
    Fallback,
    Done,
}

/// Lazy sequence of candidate unit names
///
/// Each name is yielded at most once, including across a switch from the
/// loader walk to the directory scan.
pub struct UnitNames<'a, C: ?Sized> {
    loader: &'a dyn Loader,
    condition: &'a C,
    layout: UnitLayout,
    roots: Vec<PathBuf>,
    prefix: String,
    strategy: Strategy,
    step: Step<'a>,
    /// Directories still to scan, with the prefix their entries get and the
    /// canonical directories above them
    queue: VecDeque<(String, PathBuf, Vec<PathBuf>)>,
    /// Entries of the directory being scanned
    batch: VecDeque<(String, PathBuf)>,
    /// Canonical path from the root down to the directory being scanned
    batch_ancestors: Vec<PathBuf>,
    yielded: HashSet<String>,
    failures: Vec<ScanFailure>,
    used_fallback: bool,
}

impl<'a, C: Condition + ?Sized> UnitNames<'a, C> {
    pub(crate) fn new(
        loader: &'a dyn Loader,
        roots: Roots,
        condition: &'a C,
        prefix: &str,
        layout: UnitLayout,
        strategy: Strategy,
    ) -> Self {
        Self {
            loader,
            condition,
            layout,
            roots: roots.into_paths(),
            prefix: prefix.to_string(),
            strategy,
            step: Step::Start,
            queue: VecDeque::new(),
            batch: VecDeque::new(),
            batch_ancestors: Vec::new(),
            yielded: HashSet::new(),
            failures: Vec::new(),
            used_fallback: false,
        }
    }

    /// Failures recorded so far
    pub fn failures(&self) -> &[ScanFailure] {
        &self.failures
    }

    /// Move the recorded failures out
    pub fn take_failures(&mut self) -> Vec<ScanFailure> {
        std::mem::take(&mut self.failures)
    }

    /// Whether the directory scan has taken over
    pub fn used_fallback(&self) -> bool {
        self.used_fallback
    }

    fn start(&mut self) {
        if self.strategy == Strategy::Fallback {
            tracing::info!("Enumerating units with a directory scan");
            self.begin_fallback();
            return;
        }

        let walk_roots: Vec<PathBuf> = self.roots.iter().map(|r| directory_of(r)).collect();
        match self.loader.walk_units(&walk_roots, &self.prefix) {
            Ok(walk) => self.step = Step::Primary(walk),
            Err(e) => self.primary_failed(e),
        }
    }

    fn primary_failed(&mut self, error: EngineError) {
        self.failures.push(ScanFailure::enumeration(None, &error));
        if self.strategy == Strategy::Walk {
            tracing::warn!("Unit walk failed: {}", error);
            self.step = Step::Done;
            return;
        }
        tracing::warn!("Unit walk failed, falling back to directory scan: {}", error);
        self.begin_fallback();
    }

    fn begin_fallback(&mut self) {
        self.queue = self
            .roots
            .iter()
            .map(|root| (self.prefix.clone(), root.clone(), Vec::new()))
            .collect();
        self.used_fallback = true;
        self.step = Step::Fallback;
    }

    fn next_fallback(&mut self) -> Option<String> {
        loop {
            if let Some((candidate, path)) = self.batch.pop_front() {
                if !self.condition.accept_path(&candidate, &path, &self.layout) {
                    continue;
                }
                if path.is_dir() {
                    self.enqueue(&candidate, path);
                }
                if self.yielded.insert(candidate.clone()) {
                    return Some(candidate);
                }
                continue;
            }

            let (prefix, dir, ancestors) = self.queue.pop_front()?;
            self.scan_directory(&prefix, &dir, ancestors);
        }
    }

    /// Queue an accepted directory unless it leads back up its own path
    fn enqueue(&mut self, candidate: &str, path: PathBuf) {
        let looped = path
            .canonicalize()
            .map(|dir| self.batch_ancestors.contains(&dir))
            .unwrap_or(false);
        if looped {
            tracing::debug!("Not scanning '{}': directory is already on the scan path", candidate);
            return;
        }
        self.queue
            .push_back((format!("{}.", candidate), path, self.batch_ancestors.clone()));
    }

    fn scan_directory(&mut self, prefix: &str, dir: &Path, mut ancestors: Vec<PathBuf>) {
        let listed = dir.canonicalize().map(|dir| directory_of(&dir)).and_then(|dir| {
            let entries = sorted_entries(&dir)?;
            Ok((dir, entries))
        });

        match listed {
            Ok((canonical, entries)) => {
                ancestors.push(canonical);
                self.batch_ancestors = ancestors;
                for path in entries {
                    if let Some(stem) = unit_stem(&path) {
                        let candidate = format!("{}{}", prefix, stem);
                        self.batch.push_back((candidate, path));
                    }
                }
            }
            Err(e) => {
                let error = EngineError::Enumeration {
                    path: dir.to_path_buf(),
                    reason: e.to_string(),
                };
                tracing::warn!("{}", error);
                self.failures.push(ScanFailure::enumeration(None, &error));
            }
        }
    }
}

impl<C: Condition + ?Sized> Iterator for UnitNames<'_, C> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            match &mut self.step {
                Step::Start => self.start(),
                Step::Primary(walk) => match walk.next() {
                    Some(Ok(name)) => {
                        if self.yielded.insert(name.clone()) {
                            return Some(name);
                        }
                    }
                    Some(Err(e)) => self.primary_failed(e),
                    None => self.step = Step::Done,
                },
                Step::Fallback => {
                    let next = self.next_fallback();
                    if next.is_none() {
                        self.step = Step::Done;
                    }
                    return next;
                }
                Step::Done => return None,
            }
        }
    }
}

/// A file root stands for the directory containing it
fn directory_of(path: &Path) -> PathBuf {
    if path.is_file() {
        path.parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| path.to_path_buf())
    } else {
        path.to_path_buf()
    }
}

fn sorted_entries(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}
