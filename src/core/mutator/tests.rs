use super::*;
use crate::document::analyzer::analyze;

fn edit(text: &str, request: EditRequest) -> Result<String> {
    let doc = ConfigDocument::from_text(text);
    let index = analyze(&doc)?;
    let outcome = apply_edit(&doc, &index, &request)?;
    Ok(outcome.document.text().to_string())
}

fn ok(text: &str, request: EditRequest) -> String {
    edit(text, request).expect("edit")
}

#[test]
fn appends_to_single_line_list() {
    let src = "{ pkgs, ... }:\n{\n  environment.systemPackages = with pkgs; [ vim git ];\n}\n";
    assert_eq!(
        ok(src, EditRequest::add_package("htop")),
        "{ pkgs, ... }:\n{\n  environment.systemPackages = with pkgs; [ vim git htop ];\n}\n"
    );
}

#[test]
fn appends_to_multi_line_list_with_item_indent() {
    let src = "{ pkgs, ... }:\n{\n  environment.systemPackages = with pkgs; [\n    vim # editor\n    git\n  ];\n}\n";
    assert_eq!(
        ok(src, EditRequest::add_package("pkgs.htop")),
        "{ pkgs, ... }:\n{\n  environment.systemPackages = with pkgs; [\n    vim # editor\n    git\n    htop\n  ];\n}\n"
    );
}

#[test]
fn empty_multi_line_list_uses_closing_indent_plus_unit() {
    let src = "{\n    environment.systemPackages = with pkgs; [\n    ];\n}\n";
    assert_eq!(
        ok(src, EditRequest::add_package("htop")),
        "{\n    environment.systemPackages = with pkgs; [\n        htop\n    ];\n}\n"
    );
}

#[test]
fn list_without_with_scope_gets_prefix() {
    let src = "{ pkgs, ... }:\n{\n  environment.systemPackages = [ pkgs.vim ];\n}\n";
    assert_eq!(
        ok(src, EditRequest::add_package("htop")),
        "{ pkgs, ... }:\n{\n  environment.systemPackages = [ pkgs.vim pkgs.htop ];\n}\n"
    );
}

#[test]
fn empty_lists() {
    assert_eq!(
        ok("{ environment.systemPackages = with pkgs; [ ]; }", EditRequest::add_package("htop")),
        "{ environment.systemPackages = with pkgs; [ htop ]; }"
    );
    assert_eq!(
        ok("{ environment.systemPackages = []; }", EditRequest::add_package("htop")),
        "{ environment.systemPackages = [ pkgs.htop ]; }"
    );
}

#[test]
fn synthesizes_list_before_state_version() {
    let src = "{ config, pkgs, ... }:\n{\n  networking.hostName = \"box\";\n\n  system.stateVersion = \"24.05\";\n}\n";
    assert_eq!(
        ok(src, EditRequest::add_package("htop")),
        "{ config, pkgs, ... }:\n{\n  networking.hostName = \"box\";\n\n  environment.systemPackages = with pkgs; [\n    htop\n  ];\n\n  system.stateVersion = \"24.05\";\n}\n"
    );
}

#[test]
fn synthesizes_list_after_last_binding() {
    assert_eq!(
        ok("{\n  a = 1; # one\n}\n", EditRequest::add_package("htop")),
        "{\n  a = 1; # one\n  environment.systemPackages = with pkgs; [\n    htop\n  ];\n}\n"
    );
}

#[test]
fn synthesizes_list_into_empty_root() {
    assert_eq!(
        ok("{ }", EditRequest::add_package("htop")),
        "{ environment.systemPackages = with pkgs; [ htop ]; }"
    );
    assert_eq!(
        ok("{\n}\n", EditRequest::add_package("htop")),
        "{\n  environment.systemPackages = with pkgs; [\n    htop\n  ];\n}\n"
    );
}

#[test]
fn no_root_set_is_block_not_found() {
    let err = edit("{ lib, ... }: lib.mkMerge [ ]\n", EditRequest::add_package("htop")).unwrap_err();
    assert!(matches!(err, SafenixError::BlockNotFound(_)));
}

#[test]
fn opaque_package_definitions_are_not_duplicated() {
    for value in [
        "(with pkgs; [ vim ])",
        "lib.mkIf true (with pkgs; [ vim ])",
        "import ./packages.nix pkgs",
    ] {
        let src = format!("{{ pkgs, lib, ... }}:\n{{\n  environment.systemPackages = {};\n}}\n", value);
        let err = edit(&src, EditRequest::add_package("htop")).unwrap_err();
        assert!(matches!(err, SafenixError::UnsupportedEditShape(_)), "{}: {:?}", value, err);
    }
}

#[test]
fn opaque_environment_set_is_not_extended() {
    let src = "{ pkgs, ... }:\n{\n  environment = import ./environment.nix;\n}\n";
    let err = edit(src, EditRequest::add_package("htop")).unwrap_err();
    assert!(matches!(err, SafenixError::UnsupportedEditShape(_)));
}

#[test]
fn invalid_names_are_rejected() {
    let err = edit("{ }", EditRequest::add_package("htop ]; x = [")).unwrap_err();
    assert!(matches!(err, SafenixError::UnsupportedEditShape(_)));
}

const SERVICES: &str = "{ config, pkgs, ... }:\n{\n  services.openssh.enable = true;\n  services.printing.enable = lib.mkForce false;\n  services.nginx = {\n    enable = true;\n  };\n}\n";

#[test]
fn new_service_goes_after_last_service_binding() {
    assert_eq!(
        ok(SERVICES, EditRequest::set_service("docker", true)),
        SERVICES.replace("  };\n}", "  };\n  services.docker.enable = true;\n}")
    );
}

#[test]
fn toggles_existing_enable_in_place() {
    assert_eq!(
        ok(SERVICES, EditRequest::set_service("openssh", false)),
        SERVICES.replace("openssh.enable = true", "openssh.enable = false")
    );
}

#[test]
fn priority_wrapper_is_preserved() {
    assert_eq!(
        ok(SERVICES, EditRequest::set_service("printing", true)),
        SERVICES.replace("lib.mkForce false", "lib.mkForce true")
    );
}

#[test]
fn unchanged_request_has_no_splices() {
    let doc = ConfigDocument::from_text(SERVICES);
    let index = analyze(&doc).expect("analyze");
    let outcome = apply_edit(&doc, &index, &EditRequest::set_service("openssh", true)).expect("edit");
    assert!(!outcome.changed());
    assert!(!outcome.document.is_modified());
}

#[test]
fn new_attribute_goes_into_block_body() {
    let request = EditRequest::set_service("nginx", true).with_attribute("recommendedGzipSettings", AttrValue::Bool(true));
    assert_eq!(
        ok(SERVICES, request),
        SERVICES.replace("    enable = true;\n", "    enable = true;\n    recommendedGzipSettings = true;\n")
    );
}

#[test]
fn new_attribute_for_dotted_service_is_dotted_binding() {
    let request = EditRequest::set_service("openssh", true)
        .with_attribute("settings.PermitRootLogin", AttrValue::Str("no".into()));
    assert_eq!(
        ok(SERVICES, request),
        SERVICES.replace(
            "  services.openssh.enable = true;\n",
            "  services.openssh.enable = true;\n  services.openssh.settings.PermitRootLogin = \"no\";\n"
        )
    );
}

#[test]
fn existing_attribute_value_is_rewritten() {
    let src = "{\n  services.openssh = {\n    enable = true;\n    ports = [ 22 ];\n  };\n}\n";
    let request = EditRequest::set_service("openssh", true).with_attribute("ports", AttrValue::Raw("[ 2222 ]".into()));
    assert_eq!(ok(src, request), src.replace("[ 22 ]", "[ 2222 ]"));
}

#[test]
fn nested_namespace_keeps_relative_paths() {
    let src = "{\n  services = {\n    openssh.enable = true;\n  };\n}\n";
    assert_eq!(
        ok(src, EditRequest::set_service("docker", true)),
        "{\n  services = {\n    openssh.enable = true;\n    docker.enable = true;\n  };\n}\n"
    );
}

#[test]
fn empty_services_namespace_is_used() {
    let src = "{\n  services = { };\n  system.stateVersion = \"24.05\";\n}\n";
    assert_eq!(
        ok(src, EditRequest::set_service("docker", true)),
        "{\n  services = { docker.enable = true; };\n  system.stateVersion = \"24.05\";\n}\n"
    );
}

#[test]
fn service_with_attributes_is_a_block() {
    let src = "{\n  system.stateVersion = \"24.05\";\n}\n";
    let request = EditRequest::set_service("docker", true)
        .with_attribute("rootless.enable", AttrValue::Bool(true))
        .with_attribute("storageDriver", AttrValue::Str("btrfs".into()));
    assert_eq!(
        ok(src, request),
        "{\n  services.docker = {\n    enable = true;\n    rootless.enable = true;\n    storageDriver = \"btrfs\";\n  };\n  system.stateVersion = \"24.05\";\n}\n"
    );
}

#[test]
fn dotted_component_lands_in_parent_body() {
    let src = "{\n  services.xserver = {\n    enable = true;\n    desktopManager.gnome.enable = true;\n  };\n}\n";
    assert_eq!(
        ok(src, EditRequest::set_service("xserver.desktopManager.gnome", false)),
        src.replace("gnome.enable = true", "gnome.enable = false")
    );
    assert_eq!(
        ok(src, EditRequest::set_service("xserver.desktopManager.plasma6", true)),
        src.replace(
            "gnome.enable = true;\n",
            "gnome.enable = true;\n    desktopManager.plasma6.enable = true;\n"
        )
    );
}

#[test]
fn missing_dotted_service_is_written_whole() {
    let src = "{\n  services.openssh.enable = true;\n}\n";
    let request = EditRequest::set_service("xserver.desktopManager.gnome", true)
        .with_attribute("extraGSettingsOverrides", AttrValue::Str("".into()));
    assert_eq!(
        ok(src, request),
        "{\n  services.openssh.enable = true;\n  services.xserver.desktopManager.gnome = {\n    enable = true;\n    extraGSettingsOverrides = \"\";\n  };\n}\n"
    );
}

#[test]
fn opaque_service_value_is_unsupported() {
    let src = "{ config, lib, ... }:\n{\n  services.foo = lib.mkIf config.bar { enable = true; };\n}\n";
    let err = edit(src, EditRequest::set_service("foo", true)).unwrap_err();
    assert!(matches!(err, SafenixError::UnsupportedEditShape(_)));
}

#[test]
fn single_line_service_body() {
    let src = "{ services.nginx = { enable = true; }; }";
    let request = EditRequest::set_service("nginx", true).with_attribute("user", AttrValue::Str("www".into()));
    assert_eq!(
        ok(src, request),
        "{ services.nginx = { enable = true; user = \"www\"; }; }"
    );
}

#[test]
fn crlf_documents_stay_crlf() {
    let src = "{\r\n  services.a.enable = true;\r\n}\r\n";
    assert_eq!(
        ok(src, EditRequest::set_service("docker", true)),
        "{\r\n  services.a.enable = true;\r\n  services.docker.enable = true;\r\n}\r\n"
    );
}

#[test]
fn tab_indented_documents_use_tabs() {
    let src = "{\n\tenvironment.systemPackages = with pkgs; [\n\t];\n}\n";
    assert_eq!(
        ok(src, EditRequest::add_package("htop")),
        "{\n\tenvironment.systemPackages = with pkgs; [\n\t\thtop\n\t];\n}\n"
    );
}

#[test]
fn splices_apply_in_order() {
    let text = "abcdef";
    let splices = vec![
        Splice::insert(3, "Y"),
        Splice::replace(Span::new(0, 1), "A"),
        Splice::insert(3, "Z"),
    ];
    assert_eq!(apply_splices(text, &splices).expect("apply"), "AbcYZdef");
}

#[test]
fn overlapping_splices_are_rejected() {
    let splices = vec![Splice::replace(Span::new(0, 3), "x"), Splice::replace(Span::new(2, 4), "y")];
    assert!(apply_splices("abcdef", &splices).is_err());
}
