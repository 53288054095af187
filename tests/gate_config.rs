use std::io::Write;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use boarding_gate::config::GateConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "GATE_CONFIG",
        "GATE_LISTEN_ADDR",
        "GATE_HMI_ADDR",
        "GATE_CAMERA_SOURCE",
        "GATE_DEPTH_BACKEND",
        "GATE_DEPTH_MODEL",
        "GATE_SETTLE_MS",
    ] {
        std::env::remove_var(key);
    }
}

fn config_file(suffix: &str, body: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("gate")
        .suffix(suffix)
        .tempfile()
        .expect("temp config");
    file.write_all(body.as_bytes()).expect("write config");
    file
}

#[test]
fn loads_json_config_from_env_path_with_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = config_file(
        ".json",
        r#"{
            "network": {
                "listen_addr": "0.0.0.0:6001",
                "hmi_addr": "10.1.2.3:6001",
                "poll_timeout_ms": 250
            },
            "camera": {
                "source": "dir:///var/lib/gate/replay",
                "width": 800,
                "height": 600,
                "loop_replay": true
            },
            "door": {
                "roi": { "top": 0.05, "bottom": 0.25 },
                "open_streak": 3,
                "settle_ms": 750
            },
            "crowd": {
                "go_streak": 8,
                "frame_budget": 30
            },
            "depth": {
                "backend": "tract",
                "model_path": "/opt/models/depth.onnx"
            }
        }"#,
    );

    std::env::set_var("GATE_CONFIG", file.path());
    std::env::set_var("GATE_HMI_ADDR", "10.1.2.4:6002");
    std::env::set_var("GATE_DEPTH_BACKEND", "stub");
    std::env::set_var("GATE_SETTLE_MS", "100");

    let cfg = GateConfig::load().expect("load config");

    assert_eq!(cfg.network.listen_addr, "0.0.0.0:6001".parse::<SocketAddr>().unwrap());
    assert_eq!(cfg.network.hmi_addr, "10.1.2.4:6002".parse::<SocketAddr>().unwrap());
    assert_eq!(cfg.network.poll_timeout, Duration::from_millis(250));
    assert_eq!(cfg.camera.source, "dir:///var/lib/gate/replay");
    assert_eq!(cfg.camera.width, 800);
    assert_eq!(cfg.camera.height, 600);
    assert!(cfg.camera.loop_replay);
    assert_eq!(cfg.door.roi.top(), 0.05);
    assert_eq!(cfg.door.roi.bottom(), 0.25);
    assert_eq!(cfg.door.roi.left(), 0.35);
    assert_eq!(cfg.door.open_streak, 3);
    assert_eq!(cfg.door.iteration_cap, 99_999);
    assert_eq!(cfg.door.settle, Duration::from_millis(100));
    assert_eq!(cfg.crowd.go_streak, 8);
    assert_eq!(cfg.crowd.frame_budget, 30);
    assert_eq!(cfg.depth.backend, "stub");
    assert_eq!(cfg.depth.model_path.to_str(), Some("/opt/models/depth.onnx"));

    let settings = cfg.gate_settings();
    assert_eq!(settings.hmi_ip, "10.1.2.4".parse::<std::net::IpAddr>().unwrap());
    assert_eq!(settings.door.open_streak, 3);
    assert_eq!(settings.crowd.frame_budget, 30);

    clear_env();
}

#[test]
fn loads_toml_config() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = config_file(
        ".toml",
        r#"
[network]
hmi_addr = "192.168.7.30:5001"

[camera]
source = "stub://closed"

[occupancy]
level_start = 0.4
level_end = 1.0
level_step = 0.2
min_contour_area = 500.0
"#,
    );

    let cfg = GateConfig::load_from(Some(file.path())).expect("load toml config");
    assert_eq!(cfg.camera.source, "stub://closed");
    assert_eq!(cfg.network.hmi_addr.port(), 5001);
    assert_eq!(cfg.occupancy.min_contour_area, 500.0);
    assert_eq!(cfg.occupancy_scorer().levels().len(), 3);

    clear_env();
}

#[test]
fn defaults_apply_without_a_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = GateConfig::load().expect("default config");
    assert_eq!(cfg.network.listen_addr.port(), 5001);
    assert_eq!(cfg.door.open_streak, 5);
    assert_eq!(cfg.crowd.go_streak, 10);
    assert_eq!(cfg.crowd.frame_budget, 20);
    assert_eq!(cfg.crowd.decision_threshold, 0.5);
    assert_eq!(cfg.door.settle, Duration::from_millis(500));
    assert_eq!(cfg.occupancy_scorer().levels().len(), 8);

    clear_env();
}

#[test]
fn rejects_unreachable_go_and_bad_roi() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let budget = config_file(".json", r#"{ "crowd": { "go_streak": 10, "frame_budget": 5 } }"#);
    let err = GateConfig::load_from(Some(budget.path())).unwrap_err();
    assert!(format!("{:#}", err).contains("frame_budget"));

    let roi = config_file(".json", r#"{ "door": { "roi": { "top": 0.6, "bottom": 0.2 } } }"#);
    let err = GateConfig::load_from(Some(roi.path())).unwrap_err();
    assert!(format!("{:#}", err).contains("door.roi"));

    let unknown = config_file(".toml", "[door]\nopen_streek = 4\n");
    assert!(GateConfig::load_from(Some(unknown.path())).is_err());

    clear_env();
}

#[test]
fn rejects_unbounded_occupancy_levels() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let infinite = config_file(".toml", "[occupancy]\nlevel_end = inf\n");
    let err = GateConfig::load_from(Some(infinite.path())).unwrap_err();
    assert!(format!("{:#}", err).contains("finite"));

    let nan = config_file(".toml", "[occupancy]\nlevel_step = nan\n");
    assert!(GateConfig::load_from(Some(nan.path())).is_err());

    let tiny = config_file(".toml", "[occupancy]\nlevel_step = 1e-12\n");
    let err = GateConfig::load_from(Some(tiny.path())).unwrap_err();
    assert!(format!("{:#}", err).contains("depth cuts"));

    clear_env();
}

#[test]
fn rejects_malformed_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("GATE_SETTLE_MS", "half a second");
    assert!(GateConfig::load().is_err());
    clear_env();

    std::env::set_var("GATE_HMI_ADDR", "not-an-address");
    assert!(GateConfig::load().is_err());
    clear_env();

    let missing = std::env::temp_dir().join("gate-config-does-not-exist.toml");
    assert!(GateConfig::load_from(Some(&missing)).is_err());
}
