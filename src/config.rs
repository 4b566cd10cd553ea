/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD, or the XDG
/// data dir). A missing file or missing keys fall back to built-in defaults.
///
/// Unlike cosmetic settings, the tier table is load-bearing: a file that
/// parses but describes an inconsistent progression (unknown successor,
/// non-increasing merge score, empty spawn pool...) is rejected here so the
/// game never starts with it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::domain::physics::{Rect, Vec2};
use crate::domain::tier::{Tier, TierId, TierTable};

const CONFIG_FILE: &str = "config.toml";

/// Spawn pool size when `spawn.pool` is not given: the lowest N tiers.
const DEFAULT_POOL_SIZE: usize = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config.toml parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("tier table is empty")]
    NoTiers,
    #[error("duplicate tier id {0:?}")]
    DuplicateTier(String),
    #[error("tier {tier:?} has non-positive size {size}")]
    InvalidSize { tier: String, size: f32 },
    #[error("tier {tier:?} names unknown successor {next:?}")]
    UnknownSuccessor { tier: String, next: String },
    #[error("tier {tier:?} is marked terminal but also names successor {next:?}")]
    TerminalWithSuccessor { tier: String, next: String },
    #[error("merge score must increase along the progression: {tier:?} ({score}) -> {next:?} ({next_score})")]
    NonIncreasingScore {
        tier: String,
        score: u32,
        next: String,
        next_score: u32,
    },
    #[error("spawn pool is empty")]
    EmptySpawnPool,
    #[error("spawn pool names unknown tier {0:?}")]
    UnknownSpawnTier(String),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ── Public Config Structs ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub tiers: TierTable,
    pub stage: StageConfig,
    pub spawn: SpawnConfig,
    pub game_over: GameOverConfig,
    pub physics: PhysicsConfig,
    pub score: ScoreConfig,
    pub driver: DriverConfig,
}

/// Stage geometry. Screen coordinates: x right, y down.
#[derive(Clone, Debug)]
pub struct StageConfig {
    pub width: f32,
    pub height: f32,
    pub base_width: f32,
    pub base_height: f32,
    pub bottom_margin: f32,
    pub side_walls: bool,
    pub wall_thickness: f32,
}

impl StageConfig {
    pub fn center_x(&self) -> f32 {
        self.width / 2.0
    }

    /// Y of the base platform's upper surface.
    pub fn base_top(&self) -> f32 {
        self.height - self.bottom_margin - self.base_height
    }

    pub fn base_left(&self) -> f32 {
        self.center_x() - self.base_width / 2.0
    }

    pub fn base_right(&self) -> f32 {
        self.center_x() + self.base_width / 2.0
    }

    pub fn base_rect(&self) -> Rect {
        Rect::new(
            Vec2::new(self.base_left(), self.base_top()),
            Vec2::new(self.base_width, self.base_height),
        )
    }

    /// Left and right wall rectangles, full stage height.
    pub fn wall_rects(&self) -> [Rect; 2] {
        let size = Vec2::new(self.wall_thickness, self.height);
        [
            Rect::new(Vec2::new(0.0, 0.0), size),
            Rect::new(Vec2::new(self.width - self.wall_thickness, 0.0), size),
        ]
    }
}

#[derive(Clone, Debug)]
pub struct SpawnConfig {
    /// Spawn height (piece centre).
    pub y: f32,
    /// Absolute horizontal clamp range for the held piece.
    pub x_min: f32,
    pub x_max: f32,
    /// Delay before the next piece appears once the board is quiet (seconds).
    pub next_delay: f32,
    /// Tiers eligible to spawn directly.
    pub pool: Vec<TierId>,
}

impl SpawnConfig {
    pub fn clamp_x(&self, x: f32) -> f32 {
        x.clamp(self.x_min, self.x_max)
    }
}

#[derive(Clone, Debug)]
pub struct GameOverConfig {
    /// Trigger line. A piece whose top reaches `y <= line_y` is over the limit.
    pub line_y: f32,
    /// How long the height violation must persist (seconds).
    pub linger: f32,
    /// Distance below the stage bottom at which a piece counts as fallen out.
    pub fall_margin: f32,
}

#[derive(Clone, Debug)]
pub struct PhysicsConfig {
    pub gravity_y: f32,
    pub restitution: f32,
    pub friction: f32,
    pub allow_rotation: bool,
    /// Max angular impulse (deg/s) applied on drop.
    pub drop_spin: f32,
    pub drop_drag: f32,
    pub locked_drag: f32,
    pub locked_angular_drag: f32,
    pub locked_bounce: f32,
    /// Failsafe landing: speed below this counts as stopped.
    pub landing_speed: f32,
    /// Failsafe landing: centre must be this far below spawn height.
    pub landing_depth: f32,
    pub merge_pop_speed: f32,
    pub merge_pop_spread: f32,
    pub merge_pop_offset: f32,
    /// Merge lock held by a freshly merged piece (seconds).
    pub merge_cooldown: f32,
}

#[derive(Clone, Debug)]
pub struct ScoreConfig {
    pub landing_bonus: u32,
    pub height_bonus_enabled: bool,
    /// Sampling interval for the height bonus (seconds).
    pub height_sample: f32,
    pub height_bonus_per_unit: f32,
    pub height_clamp: f32,
}

/// Settings for the terminal driver only. The core never reads these.
#[derive(Clone, Debug)]
pub struct DriverConfig {
    pub tick_rate_ms: u64,
    /// Aim movement speed while a direction key is held (units/sec).
    pub aim_speed: f32,
    pub seed: Option<u64>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug)]
struct TomlConfig {
    #[serde(default = "default_tiers")]
    tiers: Vec<TomlTier>,
    #[serde(default)]
    stage: TomlStage,
    #[serde(default)]
    spawn: TomlSpawn,
    #[serde(default)]
    game_over: TomlGameOver,
    #[serde(default)]
    physics: TomlPhysics,
    #[serde(default)]
    score: TomlScore,
    #[serde(default)]
    driver: TomlDriver,
}

#[derive(Deserialize, Debug, Clone)]
struct TomlTier {
    id: String,
    size: f32,
    score: u32,
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    terminal: bool,
}

#[derive(Deserialize, Debug)]
struct TomlStage {
    #[serde(default = "default_stage_width")]
    width: f32,
    #[serde(default = "default_stage_height")]
    height: f32,
    #[serde(default = "default_base_width")]
    base_width: f32,
    #[serde(default = "default_base_height")]
    base_height: f32,
    #[serde(default = "default_bottom_margin")]
    bottom_margin: f32,
    #[serde(default)]
    side_walls: bool,
    #[serde(default = "default_wall_thickness")]
    wall_thickness: f32,
}

#[derive(Deserialize, Debug)]
struct TomlSpawn {
    #[serde(default = "default_spawn_y")]
    y: f32,
    /// Relative to stage centre.
    #[serde(default = "default_x_range")]
    x_range: [f32; 2],
    #[serde(default = "default_next_delay_ms")]
    next_delay_ms: u64,
    #[serde(default)]
    pool: Option<Vec<String>>,
}

#[derive(Deserialize, Debug)]
struct TomlGameOver {
    #[serde(default = "default_line_y")]
    line_y: f32,
    #[serde(default = "default_linger_sec")]
    linger_sec: f32,
    #[serde(default = "default_fall_margin")]
    fall_margin: f32,
}

#[derive(Deserialize, Debug)]
struct TomlPhysics {
    #[serde(default = "default_gravity_y")]
    gravity_y: f32,
    #[serde(default = "default_restitution")]
    restitution: f32,
    #[serde(default = "default_friction")]
    friction: f32,
    #[serde(default = "default_true")]
    allow_rotation: bool,
    #[serde(default = "default_drop_spin")]
    drop_spin: f32,
    #[serde(default = "default_drop_drag")]
    drop_drag: f32,
    #[serde(default = "default_locked_drag")]
    locked_drag: f32,
    #[serde(default = "default_locked_drag")]
    locked_angular_drag: f32,
    #[serde(default = "default_locked_bounce")]
    locked_bounce: f32,
    #[serde(default = "default_landing_speed")]
    landing_speed: f32,
    #[serde(default = "default_landing_depth")]
    landing_depth: f32,
    #[serde(default = "default_merge_pop_speed")]
    merge_pop_speed: f32,
    #[serde(default = "default_merge_pop_spread")]
    merge_pop_spread: f32,
    #[serde(default = "default_merge_pop_offset")]
    merge_pop_offset: f32,
    #[serde(default = "default_merge_cooldown_ms")]
    merge_cooldown_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlScore {
    #[serde(default = "default_landing_bonus")]
    landing_bonus: u32,
    #[serde(default)]
    height_bonus_enabled: bool,
    #[serde(default = "default_height_sample_sec")]
    height_sample_sec: f32,
    #[serde(default = "default_height_bonus_per_unit")]
    height_bonus_per_unit: f32,
    #[serde(default = "default_height_clamp")]
    height_clamp: f32,
}

#[derive(Deserialize, Debug)]
struct TomlDriver {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_aim_speed")]
    aim_speed: f32,
    #[serde(default)]
    seed: Option<u64>,
}

// ── Defaults ──

fn default_tiers() -> Vec<TomlTier> {
    const TABLE: [(&str, f32, u32); 7] = [
        ("A", 36.0, 10),
        ("B", 46.0, 20),
        ("C", 58.0, 40),
        ("D", 72.0, 80),
        ("E", 88.0, 160),
        ("F", 106.0, 320),
        ("G", 126.0, 640),
    ];
    TABLE
        .iter()
        .map(|&(id, size, score)| TomlTier {
            id: id.into(),
            size,
            score,
            next: None,
            terminal: false,
        })
        .collect()
}

fn default_stage_width() -> f32 { 540.0 }
fn default_stage_height() -> f32 { 960.0 }
fn default_base_width() -> f32 { 440.0 }
fn default_base_height() -> f32 { 40.0 }
fn default_bottom_margin() -> f32 { 120.0 }
fn default_wall_thickness() -> f32 { 16.0 }

fn default_spawn_y() -> f32 { 120.0 }
fn default_x_range() -> [f32; 2] { [-200.0, 200.0] }
fn default_next_delay_ms() -> u64 { 600 }

fn default_line_y() -> f32 { 220.0 }
fn default_linger_sec() -> f32 { 2.0 }
fn default_fall_margin() -> f32 { 50.0 }

fn default_gravity_y() -> f32 { 900.0 }
fn default_restitution() -> f32 { 0.2 }
fn default_friction() -> f32 { 0.3 }
fn default_true() -> bool { true }
fn default_drop_spin() -> f32 { 20.0 }
fn default_drop_drag() -> f32 { 50.0 }
fn default_locked_drag() -> f32 { 300.0 }
fn default_locked_bounce() -> f32 { 0.05 }
fn default_landing_speed() -> f32 { 10.0 }
fn default_landing_depth() -> f32 { 50.0 }
fn default_merge_pop_speed() -> f32 { 150.0 }
fn default_merge_pop_spread() -> f32 { 50.0 }
fn default_merge_pop_offset() -> f32 { 5.0 }
fn default_merge_cooldown_ms() -> u64 { 100 }

fn default_landing_bonus() -> u32 { 10 }
fn default_height_sample_sec() -> f32 { 1.0 }
fn default_height_bonus_per_unit() -> f32 { 0.1 }
fn default_height_clamp() -> f32 { 600.0 }

fn default_tick_rate() -> u64 { 16 }
fn default_aim_speed() -> f32 { 360.0 }

impl Default for TomlConfig {
    fn default() -> Self {
        TomlConfig {
            tiers: default_tiers(),
            stage: TomlStage::default(),
            spawn: TomlSpawn::default(),
            game_over: TomlGameOver::default(),
            physics: TomlPhysics::default(),
            score: TomlScore::default(),
            driver: TomlDriver::default(),
        }
    }
}

impl Default for TomlStage {
    fn default() -> Self {
        TomlStage {
            width: default_stage_width(),
            height: default_stage_height(),
            base_width: default_base_width(),
            base_height: default_base_height(),
            bottom_margin: default_bottom_margin(),
            side_walls: false,
            wall_thickness: default_wall_thickness(),
        }
    }
}

impl Default for TomlSpawn {
    fn default() -> Self {
        TomlSpawn {
            y: default_spawn_y(),
            x_range: default_x_range(),
            next_delay_ms: default_next_delay_ms(),
            pool: None,
        }
    }
}

impl Default for TomlGameOver {
    fn default() -> Self {
        TomlGameOver {
            line_y: default_line_y(),
            linger_sec: default_linger_sec(),
            fall_margin: default_fall_margin(),
        }
    }
}

impl Default for TomlPhysics {
    fn default() -> Self {
        TomlPhysics {
            gravity_y: default_gravity_y(),
            restitution: default_restitution(),
            friction: default_friction(),
            allow_rotation: true,
            drop_spin: default_drop_spin(),
            drop_drag: default_drop_drag(),
            locked_drag: default_locked_drag(),
            locked_angular_drag: default_locked_drag(),
            locked_bounce: default_locked_bounce(),
            landing_speed: default_landing_speed(),
            landing_depth: default_landing_depth(),
            merge_pop_speed: default_merge_pop_speed(),
            merge_pop_spread: default_merge_pop_spread(),
            merge_pop_offset: default_merge_pop_offset(),
            merge_cooldown_ms: default_merge_cooldown_ms(),
        }
    }
}

impl Default for TomlScore {
    fn default() -> Self {
        TomlScore {
            landing_bonus: default_landing_bonus(),
            height_bonus_enabled: false,
            height_sample_sec: default_height_sample_sec(),
            height_bonus_per_unit: default_height_bonus_per_unit(),
            height_clamp: default_height_clamp(),
        }
    }
}

impl Default for TomlDriver {
    fn default() -> Self {
        TomlDriver {
            tick_rate_ms: default_tick_rate(),
            aim_speed: default_aim_speed(),
            seed: None,
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory,
    /// (3) `~/.local/share/brotherstack`. No file at all means built-in defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match find_config(&candidate_dirs()) {
            Some(path) => Self::from_file(&path),
            None => Self::defaults(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let raw: TomlConfig = toml::from_str(text)?;
        Self::resolve(raw)
    }

    /// Built-in defaults (still run through validation).
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::resolve(TomlConfig::default())
    }

    fn resolve(raw: TomlConfig) -> Result<Self, ConfigError> {
        let tiers = resolve_tiers(&raw.tiers)?;
        let pool = resolve_pool(&tiers, raw.spawn.pool.as_deref())?;

        let stage = StageConfig {
            width: positive("stage.width", raw.stage.width)?,
            height: positive("stage.height", raw.stage.height)?,
            base_width: positive("stage.base_width", raw.stage.base_width)?,
            base_height: positive("stage.base_height", raw.stage.base_height)?,
            bottom_margin: raw.stage.bottom_margin,
            side_walls: raw.stage.side_walls,
            wall_thickness: raw.stage.wall_thickness,
        };

        let [lo, hi] = raw.spawn.x_range;
        if lo > hi {
            return Err(ConfigError::Invalid {
                field: "spawn.x_range",
                reason: format!("[{lo}, {hi}] is inverted"),
            });
        }
        let center = stage.center_x();
        let spawn = SpawnConfig {
            y: raw.spawn.y,
            x_min: center + lo,
            x_max: center + hi,
            next_delay: raw.spawn.next_delay_ms as f32 / 1000.0,
            pool,
        };

        let game_over = GameOverConfig {
            line_y: raw.game_over.line_y,
            linger: positive("game_over.linger_sec", raw.game_over.linger_sec)?,
            fall_margin: raw.game_over.fall_margin,
        };

        let p = raw.physics;
        let physics = PhysicsConfig {
            gravity_y: p.gravity_y,
            restitution: p.restitution,
            friction: p.friction,
            allow_rotation: p.allow_rotation,
            drop_spin: p.drop_spin,
            drop_drag: p.drop_drag,
            locked_drag: p.locked_drag,
            locked_angular_drag: p.locked_angular_drag,
            locked_bounce: p.locked_bounce,
            landing_speed: p.landing_speed,
            landing_depth: p.landing_depth,
            merge_pop_speed: p.merge_pop_speed,
            merge_pop_spread: p.merge_pop_spread,
            merge_pop_offset: p.merge_pop_offset,
            merge_cooldown: p.merge_cooldown_ms as f32 / 1000.0,
        };

        let score = ScoreConfig {
            landing_bonus: raw.score.landing_bonus,
            height_bonus_enabled: raw.score.height_bonus_enabled,
            height_sample: positive("score.height_sample_sec", raw.score.height_sample_sec)?,
            height_bonus_per_unit: raw.score.height_bonus_per_unit,
            height_clamp: raw.score.height_clamp,
        };

        let driver = DriverConfig {
            tick_rate_ms: raw.driver.tick_rate_ms.max(1),
            aim_speed: raw.driver.aim_speed,
            seed: raw.driver.seed,
        };

        Ok(GameConfig { tiers, stage, spawn, game_over, physics, score, driver })
    }
}

fn positive(field: &'static str, value: f32) -> Result<f32, ConfigError> {
    if value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::Invalid { field, reason: format!("must be > 0, got {value}") })
    }
}

/// Resolve tier names into ids and check the progression.
///
/// `next` absent → the following entry is the successor; the last entry
/// (or one marked `terminal`) has none.
fn resolve_tiers(raw: &[TomlTier]) -> Result<TierTable, ConfigError> {
    if raw.is_empty() {
        return Err(ConfigError::NoTiers);
    }

    let mut seen = HashSet::with_capacity(raw.len());
    for t in raw {
        if !seen.insert(t.id.as_str()) {
            return Err(ConfigError::DuplicateTier(t.id.clone()));
        }
        if !(t.size > 0.0) {
            return Err(ConfigError::InvalidSize { tier: t.id.clone(), size: t.size });
        }
    }

    let index_of = |name: &str| raw.iter().position(|t| t.id == name);

    let mut tiers = Vec::with_capacity(raw.len());
    for (i, t) in raw.iter().enumerate() {
        let next = match (&t.next, t.terminal) {
            (Some(name), true) => {
                return Err(ConfigError::TerminalWithSuccessor {
                    tier: t.id.clone(),
                    next: name.clone(),
                });
            }
            (Some(name), false) => match index_of(name) {
                Some(j) => Some(TierId(j)),
                None => {
                    return Err(ConfigError::UnknownSuccessor {
                        tier: t.id.clone(),
                        next: name.clone(),
                    });
                }
            },
            (None, true) => None,
            (None, false) => (i + 1 < raw.len()).then(|| TierId(i + 1)),
        };
        tiers.push(Tier {
            name: t.id.clone(),
            radius: t.size / 2.0,
            score: t.score,
            next,
        });
    }

    // Strictly increasing score along every edge also rules out cycles.
    for t in &tiers {
        if let Some(n) = t.next {
            let succ = &tiers[n.0];
            if succ.score <= t.score {
                return Err(ConfigError::NonIncreasingScore {
                    tier: t.name.clone(),
                    score: t.score,
                    next: succ.name.clone(),
                    next_score: succ.score,
                });
            }
        }
    }

    Ok(TierTable::from_validated(tiers))
}

fn resolve_pool(tiers: &TierTable, pool: Option<&[String]>) -> Result<Vec<TierId>, ConfigError> {
    let ids = match pool {
        None => (0..tiers.len().min(DEFAULT_POOL_SIZE)).map(TierId).collect(),
        Some(names) => names
            .iter()
            .map(|n| tiers.find(n).ok_or_else(|| ConfigError::UnknownSpawnTier(n.clone())))
            .collect::<Result<Vec<_>, _>>()?,
    };
    if ids.is_empty() {
        return Err(ConfigError::EmptySpawnPool);
    }
    Ok(ids)
}

/// Candidate directories to search: exe dir + CWD + XDG data home (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/brotherstack");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    dirs
}

fn find_config(search_dirs: &[PathBuf]) -> Option<PathBuf> {
    search_dirs
        .iter()
        .map(|d| d.join(CONFIG_FILE))
        .find(|p| p.exists())
}
