use super::*;

#[test]
fn test_valid_package_names() {
    assert!(validate_package_name("htop").is_ok());
    assert!(validate_package_name("pkgs.vim").is_ok());
    assert!(validate_package_name("nerd-fonts.fira-code").is_ok());
    assert!(validate_package_name("python3Packages.requests").is_ok());
    assert!(validate_package_name("foo'").is_ok());
}

#[test]
fn test_injection_blocked() {
    assert!(validate_package_name("vim ]; evil = [").is_err());
    assert!(validate_package_name("vim;").is_err());
    assert!(validate_package_name("${builtins.exec}").is_err());
    assert!(validate_package_name("\"quoted\"").is_err());
    assert!(validate_service_name("openssh.enable = false; x").is_err());
}

#[test]
fn test_malformed_paths_blocked() {
    assert!(validate_package_name("").is_err());
    assert!(validate_package_name(".vim").is_err());
    assert!(validate_package_name("vim.").is_err());
    assert!(validate_package_name("a..b").is_err());
    assert!(validate_package_name("3d").is_err());
    assert!(validate_package_name(&"a".repeat(300)).is_err());
}

#[test]
fn test_reserved_words_blocked() {
    assert!(validate_service_name("let").is_err());
    assert!(validate_attribute_key("settings.inherit").is_err());
    assert!(validate_attribute_key("settings.inheritance").is_ok());
}

#[test]
fn test_display_truncation() {
    assert_eq!(sanitize_for_display("short"), "short");
    let long = "é".repeat(250);
    let shown = sanitize_for_display(&long);
    assert!(shown.ends_with("..."));
    assert_eq!(shown.chars().count(), 203);
}
