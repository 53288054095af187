use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::depth::DEFAULT_STUB_DEPTH;
use crate::door::{BrightnessDoorClassifier, DEFAULT_BRIGHTNESS_THRESHOLD, DEFAULT_MIN_BRIGHT_RATIO};
use crate::gate::GateSettings;
use crate::occupancy::{DepthLevels, OccupancyScorer, DEFAULT_MIN_CONTOUR_AREA, MAX_DEPTH_LEVELS};
use crate::phase::{CrowdPolicy, DoorPolicy};
use crate::protocol::UdpLinkConfig;
use crate::Roi;

pub const CONFIG_ENV: &str = "GATE_CONFIG";

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:5001";
const DEFAULT_HMI_ADDR: &str = "192.168.1.30:5001";
const DEFAULT_POLL_TIMEOUT_MS: u64 = 1_000;
const DEFAULT_CAMERA_SOURCE: &str = "/dev/video0";
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_CAMERA_FPS: u32 = 10;
const DEFAULT_OPEN_STREAK: u32 = 5;
const DEFAULT_ITERATION_CAP: u32 = 99_999;
const DEFAULT_SETTLE_MS: u64 = 500;
const DEFAULT_GO_STREAK: u32 = 10;
const DEFAULT_FRAME_BUDGET: u32 = 20;
const DEFAULT_DECISION_THRESHOLD: f64 = 0.5;
const DEFAULT_DEPTH_BACKEND: &str = "stub";
const DEFAULT_DEPTH_MODEL: &str = "depth.onnx";
const DEFAULT_DEPTH_INPUT: u32 = 518;

// -------------------- File schema --------------------

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct GateConfigFile {
    network: Option<NetworkConfigFile>,
    camera: Option<CameraConfigFile>,
    door: Option<DoorConfigFile>,
    crowd: Option<CrowdConfigFile>,
    occupancy: Option<OccupancyConfigFile>,
    depth: Option<DepthConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct NetworkConfigFile {
    listen_addr: Option<String>,
    hmi_addr: Option<String>,
    poll_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CameraConfigFile {
    source: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<u32>,
    loop_replay: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RoiConfigFile {
    top: Option<f32>,
    bottom: Option<f32>,
    left: Option<f32>,
    right: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DoorConfigFile {
    roi: Option<RoiConfigFile>,
    brightness_threshold: Option<u8>,
    min_bright_ratio: Option<f32>,
    open_streak: Option<u32>,
    iteration_cap: Option<u32>,
    settle_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CrowdConfigFile {
    go_streak: Option<u32>,
    frame_budget: Option<u32>,
    decision_threshold: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct OccupancyConfigFile {
    level_start: Option<f64>,
    level_end: Option<f64>,
    level_step: Option<f64>,
    min_contour_area: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DepthConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    input_size: Option<u32>,
    stub_depth: Option<f32>,
}

// -------------------- Settings --------------------

#[derive(Debug, Clone)]
pub struct GateConfig {
    pub network: NetworkSettings,
    pub camera: CameraSettings,
    pub door: DoorSettings,
    pub crowd: CrowdSettings,
    pub occupancy: OccupancySettings,
    pub depth: DepthSettings,
}

#[derive(Debug, Clone)]
pub struct NetworkSettings {
    pub listen_addr: SocketAddr,
    pub hmi_addr: SocketAddr,
    pub poll_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    /// `stub://...`, `dir://<path>` or a V4L2 device path.
    pub source: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Restart `dir://` replays at the first image.
    pub loop_replay: bool,
}

#[derive(Debug, Clone)]
pub struct DoorSettings {
    pub roi: Roi,
    pub brightness_threshold: u8,
    pub min_bright_ratio: f32,
    pub open_streak: u32,
    pub iteration_cap: u32,
    pub settle: Duration,
}

#[derive(Debug, Clone)]
pub struct CrowdSettings {
    pub go_streak: u32,
    pub frame_budget: u32,
    pub decision_threshold: f64,
}

#[derive(Debug, Clone)]
pub struct OccupancySettings {
    pub levels: DepthLevels,
    pub min_contour_area: f64,
}

#[derive(Debug, Clone)]
pub struct DepthSettings {
    /// `stub`, `offline` or `tract`.
    pub backend: String,
    pub model_path: PathBuf,
    pub input_size: u32,
    pub stub_depth: f32,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 5001)),
            hmi_addr: SocketAddr::from(([192, 168, 1, 30], 5001)),
            poll_timeout: Duration::from_millis(DEFAULT_POLL_TIMEOUT_MS),
        }
    }
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            source: DEFAULT_CAMERA_SOURCE.to_string(),
            width: DEFAULT_CAMERA_WIDTH,
            height: DEFAULT_CAMERA_HEIGHT,
            fps: DEFAULT_CAMERA_FPS,
            loop_replay: false,
        }
    }
}

impl Default for DoorSettings {
    fn default() -> Self {
        Self {
            roi: Roi::door_default(),
            brightness_threshold: DEFAULT_BRIGHTNESS_THRESHOLD,
            min_bright_ratio: DEFAULT_MIN_BRIGHT_RATIO,
            open_streak: DEFAULT_OPEN_STREAK,
            iteration_cap: DEFAULT_ITERATION_CAP,
            settle: Duration::from_millis(DEFAULT_SETTLE_MS),
        }
    }
}

impl Default for CrowdSettings {
    fn default() -> Self {
        Self {
            go_streak: DEFAULT_GO_STREAK,
            frame_budget: DEFAULT_FRAME_BUDGET,
            decision_threshold: DEFAULT_DECISION_THRESHOLD,
        }
    }
}

impl Default for OccupancySettings {
    fn default() -> Self {
        Self {
            levels: DepthLevels::default(),
            min_contour_area: DEFAULT_MIN_CONTOUR_AREA,
        }
    }
}

impl Default for DepthSettings {
    fn default() -> Self {
        Self {
            backend: DEFAULT_DEPTH_BACKEND.to_string(),
            model_path: PathBuf::from(DEFAULT_DEPTH_MODEL),
            input_size: DEFAULT_DEPTH_INPUT,
            stub_depth: DEFAULT_STUB_DEPTH,
        }
    }
}

impl GateConfig {
    /// Load from the file named by `GATE_CONFIG` (if any), then apply
    /// environment overrides and validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var(CONFIG_ENV)
            .ok()
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    /// Same as [`GateConfig::load`] with an explicit file path.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => GateConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: GateConfigFile) -> Result<Self> {
        let network = file.network.unwrap_or_default();
        let camera = file.camera.unwrap_or_default();
        let door = file.door.unwrap_or_default();
        let crowd = file.crowd.unwrap_or_default();
        let occupancy = file.occupancy.unwrap_or_default();
        let depth = file.depth.unwrap_or_default();

        let network = NetworkSettings {
            listen_addr: parse_addr(
                "network.listen_addr",
                network.listen_addr.as_deref().unwrap_or(DEFAULT_LISTEN_ADDR),
            )?,
            hmi_addr: parse_addr(
                "network.hmi_addr",
                network.hmi_addr.as_deref().unwrap_or(DEFAULT_HMI_ADDR),
            )?,
            poll_timeout: Duration::from_millis(
                network.poll_timeout_ms.unwrap_or(DEFAULT_POLL_TIMEOUT_MS),
            ),
        };

        let camera = CameraSettings {
            source: camera
                .source
                .unwrap_or_else(|| DEFAULT_CAMERA_SOURCE.to_string()),
            width: camera.width.unwrap_or(DEFAULT_CAMERA_WIDTH),
            height: camera.height.unwrap_or(DEFAULT_CAMERA_HEIGHT),
            fps: camera.fps.unwrap_or(DEFAULT_CAMERA_FPS),
            loop_replay: camera.loop_replay.unwrap_or(false),
        };

        let default_roi = Roi::door_default();
        let roi = door.roi.unwrap_or_default();
        let roi = Roi::new(
            roi.top.unwrap_or(default_roi.top()),
            roi.bottom.unwrap_or(default_roi.bottom()),
            roi.left.unwrap_or(default_roi.left()),
            roi.right.unwrap_or(default_roi.right()),
        )
        .context("invalid door.roi")?;
        let door = DoorSettings {
            roi,
            brightness_threshold: door
                .brightness_threshold
                .unwrap_or(DEFAULT_BRIGHTNESS_THRESHOLD),
            min_bright_ratio: door.min_bright_ratio.unwrap_or(DEFAULT_MIN_BRIGHT_RATIO),
            open_streak: door.open_streak.unwrap_or(DEFAULT_OPEN_STREAK),
            iteration_cap: door.iteration_cap.unwrap_or(DEFAULT_ITERATION_CAP),
            settle: Duration::from_millis(door.settle_ms.unwrap_or(DEFAULT_SETTLE_MS)),
        };

        let crowd = CrowdSettings {
            go_streak: crowd.go_streak.unwrap_or(DEFAULT_GO_STREAK),
            frame_budget: crowd.frame_budget.unwrap_or(DEFAULT_FRAME_BUDGET),
            decision_threshold: crowd
                .decision_threshold
                .unwrap_or(DEFAULT_DECISION_THRESHOLD),
        };

        let default_levels = DepthLevels::default();
        let occupancy = OccupancySettings {
            levels: DepthLevels {
                start: occupancy.level_start.unwrap_or(default_levels.start),
                end: occupancy.level_end.unwrap_or(default_levels.end),
                step: occupancy.level_step.unwrap_or(default_levels.step),
            },
            min_contour_area: occupancy
                .min_contour_area
                .unwrap_or(DEFAULT_MIN_CONTOUR_AREA),
        };

        let depth = DepthSettings {
            backend: depth
                .backend
                .unwrap_or_else(|| DEFAULT_DEPTH_BACKEND.to_string()),
            model_path: depth
                .model_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DEPTH_MODEL)),
            input_size: depth.input_size.unwrap_or(DEFAULT_DEPTH_INPUT),
            stub_depth: depth.stub_depth.unwrap_or(DEFAULT_STUB_DEPTH),
        };

        Ok(Self {
            network,
            camera,
            door,
            crowd,
            occupancy,
            depth,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(addr) = env_value("GATE_LISTEN_ADDR") {
            self.network.listen_addr = parse_addr("GATE_LISTEN_ADDR", &addr)?;
        }
        if let Some(addr) = env_value("GATE_HMI_ADDR") {
            self.network.hmi_addr = parse_addr("GATE_HMI_ADDR", &addr)?;
        }
        if let Some(source) = env_value("GATE_CAMERA_SOURCE") {
            self.camera.source = source;
        }
        if let Some(backend) = env_value("GATE_DEPTH_BACKEND") {
            self.depth.backend = backend;
        }
        if let Some(model) = env_value("GATE_DEPTH_MODEL") {
            self.depth.model_path = PathBuf::from(model);
        }
        if let Some(settle) = env_value("GATE_SETTLE_MS") {
            let millis: u64 = settle
                .trim()
                .parse()
                .map_err(|_| anyhow!("GATE_SETTLE_MS must be an integer number of milliseconds"))?;
            self.door.settle = Duration::from_millis(millis);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.network.poll_timeout.is_zero() {
            return Err(anyhow!("network.poll_timeout_ms must be greater than zero"));
        }
        if self.camera.source.trim().is_empty() {
            return Err(anyhow!("camera.source must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.door.min_bright_ratio) {
            return Err(anyhow!(
                "door.min_bright_ratio must be within [0, 1], got {}",
                self.door.min_bright_ratio
            ));
        }
        if self.door.open_streak == 0 {
            return Err(anyhow!("door.open_streak must be greater than zero"));
        }
        if self.door.iteration_cap == 0 {
            return Err(anyhow!("door.iteration_cap must be greater than zero"));
        }
        if self.crowd.go_streak == 0 {
            return Err(anyhow!("crowd.go_streak must be greater than zero"));
        }
        if self.crowd.frame_budget < self.crowd.go_streak {
            return Err(anyhow!(
                "crowd.frame_budget ({}) is smaller than crowd.go_streak ({}); GO could never be reached",
                self.crowd.frame_budget,
                self.crowd.go_streak
            ));
        }
        if !(self.crowd.decision_threshold >= 0.0) {
            return Err(anyhow!("crowd.decision_threshold must be non-negative"));
        }
        let levels = &self.occupancy.levels;
        if !(levels.start.is_finite() && levels.end.is_finite() && levels.step.is_finite()) {
            return Err(anyhow!(
                "occupancy levels must be finite, got start {} end {} step {}",
                levels.start,
                levels.end,
                levels.step
            ));
        }
        if !(levels.step > 0.0) {
            return Err(anyhow!("occupancy.level_step must be greater than zero"));
        }
        if !(levels.end > levels.start) {
            return Err(anyhow!(
                "occupancy.level_end ({}) must be greater than level_start ({})",
                levels.end,
                levels.start
            ));
        }
        if levels.count().map_or(true, |n| n > MAX_DEPTH_LEVELS as f64) {
            return Err(anyhow!(
                "occupancy levels {}..{} step {} exceed {} depth cuts",
                levels.start,
                levels.end,
                levels.step,
                MAX_DEPTH_LEVELS
            ));
        }
        if !(self.occupancy.min_contour_area >= 0.0) {
            return Err(anyhow!("occupancy.min_contour_area must be non-negative"));
        }
        if self.depth.input_size == 0 {
            return Err(anyhow!("depth.input_size must be greater than zero"));
        }
        Ok(())
    }

    // -------------------- Derived components --------------------

    pub fn link_config(&self) -> UdpLinkConfig {
        UdpLinkConfig {
            listen_addr: self.network.listen_addr,
            hmi_addr: self.network.hmi_addr,
            poll_timeout: self.network.poll_timeout,
        }
    }

    pub fn gate_settings(&self) -> GateSettings {
        GateSettings {
            roi: self.door.roi,
            door: DoorPolicy {
                open_streak: self.door.open_streak,
                iteration_cap: self.door.iteration_cap,
            },
            crowd: CrowdPolicy {
                go_streak: self.crowd.go_streak,
                frame_budget: self.crowd.frame_budget,
            },
            decision_threshold: self.crowd.decision_threshold,
            settle: self.door.settle,
            hmi_ip: self.network.hmi_addr.ip(),
        }
    }

    pub fn door_classifier(&self) -> BrightnessDoorClassifier {
        BrightnessDoorClassifier::new(self.door.brightness_threshold, self.door.min_bright_ratio)
    }

    pub fn occupancy_scorer(&self) -> OccupancyScorer {
        OccupancyScorer::new(self.occupancy.levels, self.occupancy.min_contour_area)
    }
}

fn read_config_file(path: &Path) -> Result<GateConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let cfg = if is_json {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn parse_addr(name: &str, value: &str) -> Result<SocketAddr> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow!("{} must be an ip:port socket address, got '{}'", name, value))
}
