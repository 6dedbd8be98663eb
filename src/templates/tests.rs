use super::*;
use crate::core::query;
use crate::document::analyzer::analyze_text;

fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_minimal_renders_exactly() {
    let out = generate(
        "minimal",
        &params(&[("hostname", "box"), ("state_version", "24.05"), ("packages", "htop"), ("services", "openssh")]),
    )
    .expect("generate");

    let expected = r#"{ config, pkgs, ... }:

{
  imports = [
    ./hardware-configuration.nix
  ];

  boot.loader.systemd-boot.enable = true;
  boot.loader.efi.canTouchEfiVariables = true;

  networking.hostName = "box";

  time.timeZone = "UTC";
  i18n.defaultLocale = "en_US.UTF-8";

  environment.systemPackages = with pkgs; [
    vim
    git
    htop
  ];

  services.openssh.enable = true;

  system.stateVersion = "24.05";
}
"#;
    assert_eq!(out, expected);
}

#[test]
fn test_every_template_round_trips() {
    for template in list_templates() {
        let out = generate(template.id, &params(&[("state_version", "24.11"), ("hostname", "host-1")]))
            .unwrap_or_else(|e| panic!("{}: {}", template.id, e));
        assert!(validate(&out).is_ok(), "{} does not validate", template.id);
        assert!(!out.contains('@'), "{} left a placeholder", template.id);

        let index = analyze_text(&out).expect("analyze");
        let summary = query::summarize(&index, &out);
        assert_eq!(summary.hostname.as_deref(), Some("host-1"));
        assert_eq!(summary.state_version.as_deref(), Some("24.11"));
        assert!(query::has_package(&index, "vim"));
    }
}

#[test]
fn state_version_is_required_and_checked() {
    assert!(matches!(
        generate("minimal", &params(&[("hostname", "box")])),
        Err(SafenixError::MissingRequiredParameter { parameter, .. }) if parameter == "state_version"
    ));
    for bad in ["24.5", "latest", "24.05.1", ""] {
        assert!(
            matches!(
                generate("minimal", &params(&[("state_version", bad)])),
                Err(SafenixError::InvalidParameter { .. })
            ),
            "accepted {:?}",
            bad
        );
    }
}

#[test]
fn unknown_template_and_parameter() {
    assert!(matches!(
        generate("laptop", &params(&[("state_version", "24.05")])),
        Err(SafenixError::UnknownTemplate(id)) if id == "laptop"
    ));
    // minimal has no user account
    assert!(matches!(
        generate("minimal", &params(&[("state_version", "24.05"), ("username", "alice")])),
        Err(SafenixError::UnknownParameter { parameter, .. }) if parameter == "username"
    ));
}

#[test]
fn hostile_values_are_rejected() {
    let cases = [
        ("hostname", "box\"; boot.loader.grub.enable = false; x = \""),
        ("hostname", "-box"),
        ("timezone", "UTC; x"),
        ("username", "Root"),
        ("packages", "htop ]; evil = ["),
        ("services", "openssh.enable=false"),
    ];
    for (name, value) in cases {
        let result = generate("server", &params(&[("state_version", "24.05"), (name, value)]));
        assert!(
            matches!(result, Err(SafenixError::InvalidParameter { .. })),
            "{}={:?} was accepted",
            name,
            value
        );
    }
}

#[test]
fn at_sign_in_values_is_not_a_placeholder() {
    let out = generate("minimal", &params(&[("state_version", "24.05"), ("locale", "sr_RS@latin")]))
        .expect("generate");
    assert!(out.contains("i18n.defaultLocale = \"sr_RS@latin\";"));
}

#[test]
fn keyword_username_is_quoted() {
    let out = generate("desktop", &params(&[("state_version", "24.05"), ("username", "in")]))
        .expect("generate");
    assert!(out.contains("users.users.\"in\" = {"));
}

#[test]
fn sets_are_normalized_and_deduplicated() {
    let out = generate(
        "minimal",
        &params(&[("state_version", "24.05"), ("packages", "pkgs.vim, ripgrep vim,,ripgrep")]),
    )
    .expect("generate");
    assert!(out.contains("[\n    vim\n    git\n    ripgrep\n  ];"));
}

#[test]
fn provided_services_are_not_repeated() {
    let out = generate(
        "desktop",
        &params(&[("state_version", "24.05"), ("services", "pipewire xserver.libinput docker")]),
    )
    .expect("generate");
    assert!(!out.contains("services.pipewire.enable = true;"));
    assert!(!out.contains("services.xserver.libinput.enable"));
    assert!(out.contains("  services.printing.enable = true;\n  services.docker.enable = true;\n"));
}

#[test]
fn empty_set_leaves_single_blank_line() {
    let out = generate("minimal", &params(&[("state_version", "24.05")])).expect("generate");
    assert!(!out.contains("\n\n\n"));
    assert!(out.contains("  ];\n\n  system.stateVersion"));
}

#[test]
fn default_hostname_is_valid() {
    let out = generate("minimal", &params(&[("state_version", "24.05")])).expect("generate");
    let index = analyze_text(&out).expect("analyze");
    let hostname = query::summarize(&index, &out).hostname.expect("hostname");
    assert!(HOSTNAME_RE.is_match(&hostname));
}

#[test]
fn unresolved_placeholder_is_reported() {
    let broken = Template {
        id: "broken",
        description: "",
        params: &[],
        provides: &[],
        body: "{\n  a = @missing@;\n}\n",
    };
    let err = expand(&broken, &BTreeMap::new(), &BTreeMap::new()).unwrap_err();
    assert!(matches!(
        err,
        SafenixError::UnresolvedPlaceholder { placeholder, .. } if placeholder == "missing"
    ));
}

#[test]
fn catalogue_lists_required_parameters() {
    for template in list_templates() {
        let required: Vec<_> = template
            .params
            .iter()
            .filter(|p| p.is_required())
            .map(|p| p.name)
            .collect();
        assert_eq!(required, ["state_version"], "{}", template.id);
    }
}
