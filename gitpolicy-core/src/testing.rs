//! Test doubles for the process boundary.
//!
//! [`ScriptedRunner`] replays canned process results and records every call.
//! [`MemoryGit`] understands the `git config` grammar this crate produces and
//! keeps global/system values in memory; `-f <path>` targets are real files
//! so callers that rename or inspect them behave as they would with git.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::GitError;
use crate::git::Git;
use crate::process::{CommandRunner, ProcessOutput};

type Call = (PathBuf, Vec<String>);
type Hook = Box<dyn Fn(usize, &[String]) + Send + Sync>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn output(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> ProcessOutput {
    ProcessOutput {
        exit_code,
        stdout: stdout.into(),
        stderr: stderr.into(),
    }
}

// ---------------------------------------------------------------------------
// ScriptedRunner
// ---------------------------------------------------------------------------

/// Replays queued results in order, then the fallback (exit 127 by default).
pub struct ScriptedRunner {
    responses: Mutex<VecDeque<ProcessOutput>>,
    fallback: ProcessOutput,
    calls: Mutex<Vec<Call>>,
    hook: Option<Hook>,
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: output(127, "", "unscripted process call"),
            calls: Mutex::new(Vec::new()),
            hook: None,
        }
    }

    /// Queue the result of the next unanswered call.
    pub fn respond(self, exit_code: i32, stdout: &str, stderr: &str) -> Self {
        lock(&self.responses).push_back(output(exit_code, stdout, stderr));
        self
    }

    /// Result returned once the queue is empty.
    pub fn otherwise(mut self, exit_code: i32, stdout: &str, stderr: &str) -> Self {
        self.fallback = output(exit_code, stdout, stderr);
        self
    }

    /// Invoke `hook` with the 1-based call number and argv on every call.
    pub fn on_call(mut self, hook: impl Fn(usize, &[String]) + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    /// Argv of every call, joined with single spaces for easy comparison.
    pub fn command_lines(&self) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .map(|(program, args)| {
                std::iter::once(program.display().to_string())
                    .chain(args.iter().cloned())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &Path, args: &[String]) -> Result<ProcessOutput, GitError> {
        let call_number = {
            let mut calls = lock(&self.calls);
            calls.push((program.to_path_buf(), args.to_vec()));
            calls.len()
        };
        if let Some(hook) = &self.hook {
            hook(call_number, args);
        }
        let next = lock(&self.responses).pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }
}

// ---------------------------------------------------------------------------
// MemoryGit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Target {
    Global,
    System,
    File(PathBuf),
}

/// In-memory stand-in for `git config`.
#[derive(Default)]
pub struct MemoryGit {
    stores: Mutex<HashMap<Target, Vec<(String, String)>>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl MemoryGit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap this emulation in a [`Git`] handle.
    pub fn into_git(self) -> Git {
        Git::new("git", Arc::new(self))
    }

    /// Argv of every call, joined with single spaces.
    pub fn command_lines(&self) -> Vec<String> {
        lock(&self.calls).iter().map(|args| args.join(" ")).collect()
    }

    fn load(&self, target: &Target) -> Vec<(String, String)> {
        match target {
            Target::File(path) => read_file_store(path),
            other => lock(&self.stores).get(other).cloned().unwrap_or_default(),
        }
    }

    fn save(&self, target: &Target, entries: Vec<(String, String)>) -> Result<(), String> {
        match target {
            Target::File(path) => write_file_store(path, &entries),
            other => {
                lock(&self.stores).insert(other.clone(), entries);
                Ok(())
            }
        }
    }

    fn config(&self, args: &[String]) -> ProcessOutput {
        let mut target = None;
        let mut add = false;
        let mut get_all = false;
        let mut unset_all = false;
        let mut positional = Vec::new();

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--global" => target = Some(Target::Global),
                "--system" => target = Some(Target::System),
                "-f" => match iter.next() {
                    Some(path) => target = Some(Target::File(PathBuf::from(path))),
                    None => return output(129, "", "error: -f needs a path"),
                },
                "--add" => add = true,
                "--get-all" => get_all = true,
                "--unset-all" => unset_all = true,
                "-z" => {}
                other => positional.push(other.to_string()),
            }
        }

        let Some(key) = positional.first().map(|k| k.to_ascii_lowercase()) else {
            return output(129, "", "error: missing key");
        };
        let value = positional.get(1).cloned();

        if unset_all {
            let (Some(target), Some(pattern)) = (target, value) else {
                return output(129, "", "error: wrong number of arguments");
            };
            let mut entries = self.load(&target);
            let before = entries.len();
            entries.retain(|(k, v)| !(k == &key && matches_pattern(&pattern, v)));
            if entries.len() == before {
                return output(5, "", "");
            }
            return self.finish_write(&target, entries);
        }

        if let Some(value) = value {
            let Some(target) = target else {
                return output(129, "", "error: write needs an explicit scope in tests");
            };
            let mut entries = self.load(&target);
            if add {
                entries.push((key, value));
            } else {
                let existing = entries.iter().filter(|(k, _)| k == &key).count();
                if existing > 1 {
                    return output(5, "", "warning: key has multiple values");
                }
                match entries.iter_mut().find(|(k, _)| k == &key) {
                    Some(entry) => entry.1 = value,
                    None => entries.push((key, value)),
                }
            }
            return self.finish_write(&target, entries);
        }

        let entries = match &target {
            Some(target) => self.load(target),
            None => {
                let mut merged = self.load(&Target::System);
                merged.extend(self.load(&Target::Global));
                merged
            }
        };
        let values: Vec<&String> = entries
            .iter()
            .filter(|(k, _)| k == &key)
            .map(|(_, v)| v)
            .collect();

        if values.is_empty() {
            return output(1, "", "");
        }
        if get_all {
            let stdout: String = values.iter().map(|v| format!("{v}\0")).collect();
            return output(0, stdout, "");
        }
        let last = values.last().map(|v| v.as_str()).unwrap_or_default();
        output(0, format!("{last}\0"), "")
    }

    fn finish_write(&self, target: &Target, entries: Vec<(String, String)>) -> ProcessOutput {
        match self.save(target, entries) {
            Ok(()) => output(0, "", ""),
            Err(err) => output(4, "", err),
        }
    }
}

impl CommandRunner for MemoryGit {
    fn run(&self, _program: &Path, args: &[String]) -> Result<ProcessOutput, GitError> {
        lock(&self.calls).push(args.to_vec());
        Ok(match args.first().map(String::as_str) {
            Some("--version") => output(0, "git version 2.43.0\n", ""),
            Some("config") => self.config(&args[1..]),
            _ => output(1, "", "git: unsupported command in memory emulation"),
        })
    }
}

/// `.*` matches anything; any other pattern is a substring match.
fn matches_pattern(pattern: &str, value: &str) -> bool {
    pattern == ".*" || value.contains(pattern)
}

fn read_file_store(path: &Path) -> Vec<(String, String)> {
    let Ok(contents) = fs::read_to_string(path) else {
        return Vec::new();
    };
    contents
        .lines()
        .filter(|line| !line.starts_with('#') && !line.is_empty())
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.to_string(), unescape(v)))
        .collect()
}

fn write_file_store(path: &Path, entries: &[(String, String)]) -> Result<(), String> {
    let mut contents = String::new();
    for (key, value) in entries {
        contents.push_str(key);
        contents.push('=');
        contents.push_str(&escape(value));
        contents.push('\n');
    }
    fs::write(path, contents).map_err(|err| format!("error: could not write config file: {err}"))
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\n', "\\n")
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
