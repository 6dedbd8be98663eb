use super::*;
use tempfile::tempdir;

#[test]
fn test_defaults() {
    let settings = Settings::default();
    assert_eq!(settings.target, None);
    assert!(settings.backup);
    assert_eq!(settings.format, "text");
    assert_eq!(settings.color, "auto");
    assert!(settings.conflicts.is_empty());
}

#[test]
fn test_empty_document_is_defaults() {
    let settings = Settings::parse("// nothing here\n", None).expect("parse");
    assert_eq!(settings, Settings::default());
}

#[test]
fn test_full_document() {
    let content = r#"
target "/srv/nixos/configuration.nix"
backup #false
format "json"
color "never"
conflicts {
    service "pipewire" "jack"
    package "vim" "pkgs.neovim" message="pick one editor"
}
"#;
    let settings = Settings::parse(content, None).expect("parse");
    assert_eq!(settings.target, Some(PathBuf::from("/srv/nixos/configuration.nix")));
    assert!(!settings.backup);
    assert_eq!(settings.format, "json");
    assert_eq!(settings.color, "never");
    assert_eq!(settings.conflicts.len(), 2);
    assert_eq!(
        settings.conflicts[0].subjects,
        vec![Subject::service("pipewire"), Subject::service("jack")]
    );
    assert_eq!(settings.conflicts[1].subjects[1], Subject::package("neovim"));
    assert_eq!(settings.conflicts[1].message, "pick one editor");
}

#[test]
fn test_rule_table_keeps_builtins() {
    let settings = Settings::parse("conflicts {\n    package \"vim\" \"neovim\"\n}\n", None).expect("parse");
    let table = settings.rule_table();
    assert_eq!(table.len(), RuleTable::builtin().len() + 1);
    assert!(table.rules().iter().any(|r| r.contains(&Subject::package("neovim"))));
}

#[test]
fn test_unknown_key_rejected() {
    let err = Settings::parse("progress \"on\"\n", None).unwrap_err();
    assert!(matches!(err, SafenixError::ConfigError(msg) if msg.contains("progress")));
}

#[test]
fn test_invalid_values_rejected() {
    for content in [
        "format \"table\"\n",
        "color \"sometimes\"\n",
        "backup \"yes\"\n",
        "target \"\"\n",
        "target \"a\" \"b\"\n",
        "conflicts {\n    service \"only-one\"\n}\n",
        "conflicts {\n    module \"a\" \"b\"\n}\n",
    ] {
        assert!(
            matches!(Settings::parse(content, None), Err(SafenixError::ConfigError(_))),
            "accepted {:?}",
            content
        );
    }
}

#[test]
fn test_parse_error_has_location() {
    let err = Settings::parse("format \"json\nbackup", Some(Path::new("/cfg/settings.kdl"))).unwrap_err();
    match err {
        SafenixError::ConfigError(msg) => assert!(msg.starts_with("/cfg/settings.kdl:"), "{}", msg),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_load_from_file() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("settings.kdl");
    fs::write(&path, "color \"always\"\n").expect("write");
    let settings = Settings::load_from(&path).expect("load");
    assert_eq!(settings.color, "always");
}
