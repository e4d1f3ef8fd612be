use artwall::{Config, LayerId, LogLevel};

#[test]
fn json_config_roundtrips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("artwall.json");

    let mut cfg = Config::default();
    cfg.blender = vec![LayerId::from("bg"), LayerId::from(1)];
    cfg.log_level = LogLevel::Debug;
    cfg.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.blender, cfg.blender);
    assert_eq!(loaded.log_level, LogLevel::Debug);
    assert_eq!(loaded.set_command, cfg.set_command);
}

#[test]
fn toml_config_roundtrips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("artwall.toml");

    let cfg = Config::default();
    cfg.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.reset_command, cfg.reset_command);
    assert!(loaded.layers.is_empty());
}

#[test]
fn unknown_extension_fails_load_and_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("artwall.ini");

    let err = Config::default().save(&path).unwrap_err();
    assert!(err.to_string().contains("unknown config format"));

    std::fs::write(&path, "{}").unwrap();
    let err = Config::load(&path).unwrap_err();
    assert!(err.to_string().contains("unknown config format"));
}

#[test]
fn missing_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope.json");
    assert!(Config::load(&path).is_err());
}

#[test]
fn full_layer_stack_survives_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("layers.json");

    std::fs::write(
        &path,
        r#"{
            "blender": ["bg", "art"],
            "layers": [
                {"name": "bg", "processors": [
                    {"name": "blank_img",
                     "args": {"width": "{screen.width}", "height": "{screen.height}",
                              "color": "{most_frequent_color}"}}
                ]},
                {"name": "art", "processors": [
                    {"name": "fit", "args": {"width": "500", "height": "500"}},
                    {"name": "circle"}
                ]}
            ]
        }"#,
    )
    .unwrap();

    let cfg = Config::load(&path).unwrap();
    assert_eq!(cfg.layers.len(), 2);
    assert_eq!(cfg.layers[1].processors[1].name, "circle");
    let args = cfg.layers[0].processors[0].args.as_ref().unwrap();
    assert_eq!(args["color"], serde_json::json!("{most_frequent_color}"));
}
