//! Input file existence checks
//!
//! Only runs when the caller knows where the model lives. Lookups are
//! memoized briefly so a burst of edits does not hammer the filesystem.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use log::trace;

use super::{ValidationContext, Validator};
use crate::validation::{Severity, ValidationResult};

const EXISTENCE_TTL: Duration = Duration::from_secs(5);
const MAX_REMEMBERED: usize = 1024;

pub struct InputFileValidator {
    ttl: Duration,
    seen: Mutex<HashMap<PathBuf, (bool, Instant)>>,
}

impl Default for InputFileValidator {
    fn default() -> Self {
        Self::with_ttl(EXISTENCE_TTL)
    }
}

impl InputFileValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            seen: Mutex::new(HashMap::new()),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        seen.retain(|_, &mut (_, checked_at)| now.duration_since(checked_at) < self.ttl);

        if let Some(&(exists, checked_at)) = seen.get(path)
            && now.duration_since(checked_at) < self.ttl
        {
            return exists;
        }

        let exists = path.exists();
        trace!("checked {} (exists: {})", path.display(), exists);
        if seen.len() < MAX_REMEMBERED {
            seen.insert(path.to_path_buf(), (exists, now));
        }
        exists
    }

    #[cfg(test)]
    fn remembered(&self) -> usize {
        self.seen.lock().map(|seen| seen.len()).unwrap_or_default()
    }
}

impl Validator for InputFileValidator {
    fn name(&self) -> &'static str {
        "input_files"
    }

    fn validate(&self, ctx: &ValidationContext<'_>, result: &mut ValidationResult) {
        let Some(base_dir) = ctx.base_dir else {
            return;
        };
        let Some(severity) = ctx.severity("file_paths", Severity::Error) else {
            return;
        };

        for entry in ctx.model.input_files() {
            // Joining an absolute path replaces the base
            let path = base_dir.join(&entry.text);
            if !self.exists(&path) {
                result.add_issue(
                    entry.line,
                    format!("Input file does not exist: {}", entry.text),
                    severity,
                    "file_not_found",
                );
            }
        }
    }
}
