use amtron_exporter::config::Config;
use std::fs;

#[test]
fn serialized_config_loads_back() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("config.yaml");

    let mut cfg = Config::default();
    cfg.device.ip = "192.168.1.40".to_string();
    cfg.device.password = "s3cret".to_string();
    cfg.poll_interval_seconds = 15;
    cfg.logging.file = Some(path.with_extension("log").to_string_lossy().to_string());

    fs::write(&path, serde_yaml::to_string(&cfg).unwrap()).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded.device.ip, "192.168.1.40");
    assert_eq!(loaded.device.password, "s3cret");
    assert_eq!(loaded.poll_interval_seconds, 15);
    assert_eq!(loaded.logging.file, cfg.logging.file);
    loaded.validate().unwrap();
}

#[test]
fn partial_file_keeps_defaults() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), b"device:\n  ip: 10.1.2.3\n").unwrap();

    let cfg = Config::from_file(tmp.path()).unwrap();
    assert_eq!(cfg.device.ip, "10.1.2.3");
    assert_eq!(cfg.device.port, 80);
    assert_eq!(cfg.device.username, "operator");
    assert_eq!(cfg.poll_interval_seconds, 60);
    assert_eq!(cfg.web.port, 9877);
}

#[test]
fn config_validation_errors() {
    let mut cfg = Config::default();
    cfg.device.ip.clear();
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.device.port = 0;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.device.request_timeout_seconds = 0;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.poll_interval_seconds = 0;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.logging.level = "LOUD".to_string();
    assert!(cfg.validate().is_err());
}

#[test]
fn from_file_with_invalid_yaml_fails() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), b"device: [unclosed").unwrap();
    let err = Config::from_file(tmp.path()).unwrap_err();
    assert!(format!("{}", err).contains("Serialization error"));
}

#[test]
fn missing_file_is_io_error() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let err = Config::from_file(tmp_dir.path().join("absent.yaml")).unwrap_err();
    assert!(format!("{}", err).contains("I/O error"));
}
