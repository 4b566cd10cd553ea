/// Best-score persistence.
///
/// The core only sees the `ScoreStore` port: `load()` at construction,
/// `save()` at game over when the record is beaten.
///
/// ## File format (`FileScoreStore`)
///   One key-value line: `best_score=<n>`. Unknown lines are ignored,
///   a missing or unreadable file reads as 0.

use std::io;
use std::path::{Path, PathBuf};

use log::warn;

const BEST_FILE: &str = "best_score.dat";
const BEST_KEY: &str = "best_score=";

pub trait ScoreStore {
    fn load(&self) -> u32;
    fn save(&mut self, score: u32) -> io::Result<()>;
}

// ══════════════════════════════════════════════════════════════
// File store
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct FileScoreStore {
    path: PathBuf,
}

impl FileScoreStore {
    /// Store in the default data directory.
    pub fn new() -> Self {
        FileScoreStore { path: data_dir().join(BEST_FILE) }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        FileScoreStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileScoreStore {
    fn default() -> Self {
        FileScoreStore::new()
    }
}

impl ScoreStore for FileScoreStore {
    fn load(&self) -> u32 {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => parse_best(&text).unwrap_or(0),
            Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
            Err(e) => {
                warn!("could not read {}: {e}", self.path.display());
                0
            }
        }
    }

    fn save(&mut self, score: u32) -> io::Result<()> {
        std::fs::write(&self.path, format!("{BEST_KEY}{score}\n"))
    }
}

/// First writable of: exe dir, `~/.local/share/brotherstack`, CWD.
fn data_dir() -> PathBuf {
    // 1. Exe directory (portable installs)
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            let probe = parent.join(".write_test_brotherstack");
            if std::fs::write(&probe, "").is_ok() {
                let _ = std::fs::remove_file(&probe);
                return parent.to_path_buf();
            }
        }
    }

    // 2. XDG data home for system installs
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/brotherstack");
        if std::fs::create_dir_all(&xdg).is_ok() {
            return xdg;
        }
    }

    // 3. CWD
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn parse_best(content: &str) -> Option<u32> {
    content
        .lines()
        .find_map(|line| line.trim().strip_prefix(BEST_KEY))
        .and_then(|v| v.trim().parse().ok())
}

// ══════════════════════════════════════════════════════════════
// In-memory store
// ══════════════════════════════════════════════════════════════

/// Keeps the best score in memory only. Counts writes.
#[derive(Clone, Debug, Default)]
pub struct MemoryScoreStore {
    best: u32,
    saves: usize,
}

impl MemoryScoreStore {
    pub fn new(best: u32) -> Self {
        MemoryScoreStore { best, saves: 0 }
    }

    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl ScoreStore for MemoryScoreStore {
    fn load(&self) -> u32 {
        self.best
    }

    fn save(&mut self, score: u32) -> io::Result<()> {
        self.best = score;
        self.saves += 1;
        Ok(())
    }
}
