use super::*;
use crate::document::BlockKind;

const TYPICAL: &str = r#"# Edit this configuration file to define what should be installed on
# your system. services.fake.enable = true;
{ config, pkgs, ... }:

{
  imports = [ ./hardware-configuration.nix ];

  boot.loader.systemd-boot.enable = true;
  networking.hostName = "nixos"; # environment.systemPackages = [ ];

  users.users.alice = {
    isNormalUser = true;
    extraGroups = [ "wheel" ];
  };

  environment.systemPackages = with pkgs; [
    vim
    git
  ];

  services.openssh.enable = true;
  services.openssh.settings.PermitRootLogin = "no";
  services.printing.enable = false;

  system.stateVersion = "24.05";
}
"#;

fn index(src: &str) -> StructuralIndex {
    analyze_text(src).expect("analyze")
}

#[test]
fn finds_root_behind_formals() {
    let idx = index(TYPICAL);
    let root = idx.root.as_ref().expect("root");
    assert_eq!(&TYPICAL[root.open..root.open + 1], "{");
    assert_eq!(&TYPICAL[root.close..root.close + 1], "}");
    assert!(root.close > TYPICAL.find("stateVersion").unwrap());
}

#[test]
fn indexes_package_list() {
    let idx = index(TYPICAL);
    let lists: Vec<_> = idx.package_lists().collect();
    assert_eq!(lists.len(), 1);
    let list = lists[0];
    assert_eq!(list.with_scope.as_deref(), Some("pkgs"));
    let names: Vec<_> = list.packages.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["vim", "git"]);
    assert_eq!(&TYPICAL[list.close..list.close + 1], "]");
    assert_eq!(list.last_item_end, Some(TYPICAL.find("git").unwrap() + 3));
}

#[test]
fn groups_service_bindings_per_name() {
    let idx = index(TYPICAL);
    let names: Vec<_> = idx.services().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["openssh", "printing"]);

    let ssh = idx.service("openssh").expect("openssh");
    assert_eq!(ssh.entries.len(), 2);
    assert_eq!(ssh.enabled(""), Some(true));
    assert_eq!(ssh.attribute_text("settings.PermitRootLogin", TYPICAL), Some("\"no\""));
    assert_eq!(idx.service("printing").and_then(|s| s.enabled("")), Some(false));
}

#[test]
fn anchor_words_in_comments_and_strings_are_ignored() {
    let idx = index(TYPICAL);
    assert!(idx.service("fake").is_none());
    assert_eq!(idx.package_lists().count(), 1);
}

#[test]
fn users_and_other_blocks() {
    let idx = index(TYPICAL);
    let alice = idx.user("alice").expect("alice");
    assert_eq!(alice.bodies.len(), 1);
    assert!(alice.attributes.contains_key("isNormalUser"));

    let others: Vec<_> = idx
        .blocks
        .iter()
        .filter_map(|b| match b {
            Block::Other(o) => Some(o.path.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        others,
        vec!["imports", "boot.loader.systemd-boot.enable", "networking.hostName", "system.stateVersion"]
    );
}

#[test]
fn blocks_are_in_document_order() {
    let idx = index(TYPICAL);
    let starts: Vec<_> = idx.blocks.iter().map(|b| b.range().start).collect();
    let mut sorted = starts.clone();
    sorted.sort();
    assert_eq!(starts, sorted);
    assert_eq!(idx.blocks[3].kind(), BlockKind::UserBlock);
    assert_eq!(idx.blocks[4].kind(), BlockKind::PackageList);
}

#[test]
fn nested_namespace_spelling() {
    let src = r#"{ pkgs, ... }:
{
  environment = {
    systemPackages = [ pkgs.firefox pkgs.htop ];
  };
  services = {
    nginx = {
      enable = true;
      virtualHosts."example.org".root = "/var/www";
    };
    openssh.enable = false;
  };
}
"#;
    let idx = index(src);
    let list = idx.package_lists().next().expect("list");
    assert_eq!(list.with_scope, None);
    assert!(list.contains("firefox"));
    assert!(list.contains("pkgs.htop"));

    let nginx = idx.service("nginx").expect("nginx");
    assert_eq!(nginx.enabled(""), Some(true));
    assert!(nginx.attributes.contains_key("virtualHosts.example.org.root"));
    assert_eq!(nginx.entries.len(), 1);
    assert_eq!(nginx.bodies.len(), 1);

    assert_eq!(idx.service("openssh").and_then(|s| s.enabled("")), Some(false));
    assert_eq!(idx.namespaces.len(), 2);
    assert!(idx.blocks.iter().all(|b| b.kind() != BlockKind::Other));
}

#[test]
fn let_in_prefix_and_values() {
    let src = r#"{ config, lib, pkgs, ... }:
let
  user = "bob";
  extra = with pkgs; [ jq ];
in
{
  services.xserver = {
    enable = true;
    desktopManager.gnome.enable = lib.mkDefault true;
  };
  environment.etc."motd".text = let x = "a"; in x;
  networking.firewall.enable = true;
}
"#;
    let idx = index(src);
    let xserver = idx.service("xserver").expect("xserver");
    assert_eq!(xserver.enabled("desktopManager.gnome"), Some(true));
    assert!(xserver.declares("desktopManager"));
    assert!(!xserver.declares("displayManager"));
    assert!(idx.root_bindings().any(|b| b.dotted() == "networking.firewall.enable"));
    assert!(idx.root_bindings().all(|b| b.dotted() != "user"));
}

#[test]
fn mkif_values_are_opaque() {
    let src = "{ config, lib, ... }:\n{\n  services.foo = lib.mkIf config.x { enable = true; };\n}\n";
    let idx = index(src);
    let foo = idx.service("foo").expect("foo");
    assert!(foo.attributes.is_empty());
    assert!(foo.bodies.is_empty());
    assert_eq!(foo.enabled(""), None);
}

#[test]
fn quoted_and_dynamic_attribute_names() {
    let src = "{\n  services.\"my-svc\".enable = true;\n  ${name}.x = 1;\n}\n";
    let idx = index(src);
    assert!(idx.service("my-svc").is_some());
    assert!(idx.root_bindings().any(|b| b.path[0] == "${name}"));
}

#[test]
fn inherit_and_rec_are_handled() {
    let src = "{ pkgs, ... }:\nrec {\n  inherit (pkgs) lib;\n  a = 1;\n  b = rec { c = a; };\n}\n";
    let idx = index(src);
    assert!(idx.root.is_some());
    let paths: Vec<_> = idx.bindings.iter().map(|b| b.dotted()).collect();
    assert_eq!(paths, vec!["a", "b", "b.c"]);
}

#[test]
fn args_at_pattern() {
    let src = "args@{ pkgs, ... }:\n{\n  environment.systemPackages = [ ];\n}\n";
    let idx = index(src);
    let list = idx.package_lists().next().expect("list");
    assert!(list.packages.is_empty());
    assert_eq!(list.last_item_end, None);
}

#[test]
fn parenthesised_items_and_concatenation() {
    let src = "{ pkgs, ... }:\n{\n  environment.systemPackages = with pkgs; [\n    (python3.withPackages (ps: [ ps.requests ]))\n    nerd-fonts.fira-code\n  ] ++ [ ripgrep ];\n}\n";
    let idx = index(src);
    let list = idx.package_lists().next().expect("list");
    let names: Vec<_> = list.packages.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["nerd-fonts.fira-code", "ripgrep"]);
    assert_eq!(list.last_item_end, Some(src.find("fira-code").unwrap() + "fira-code".len()));
    assert!(list.close < src.find("++").unwrap());
}

#[test]
fn non_attrset_module_has_no_root() {
    let idx = index("{ lib, ... }: lib.mkMerge [ { a = 1; } ]\n");
    assert!(idx.root.is_none());
    assert!(idx.blocks.is_empty());
}

#[test]
fn empty_document_is_empty_index() {
    let idx = index("");
    assert!(idx.root.is_none());
    assert!(idx.bindings.is_empty());
}

#[test]
fn unterminated_string_is_malformed() {
    let src = "{\n  networking.hostName = \"oops;\n}\n";
    match analyze_text(src) {
        Err(SafenixError::MalformedDocument { line, column, .. }) => {
            assert_eq!(line, 2);
            assert_eq!(column, 25);
        }
        other => panic!("expected MalformedDocument, got {:?}", other),
    }
}

#[test]
fn unclosed_brace_is_malformed() {
    let err = analyze_text("{ config, ... }:\n{\n  a = 1;\n").unwrap_err();
    assert!(matches!(err, SafenixError::MalformedDocument { line: 2, .. }));
}

#[test]
fn value_spans_exclude_semicolon() {
    let src = "{\n  a = with b; c;\n  d = { };\n}\n";
    let idx = index(src);
    let a = &idx.bindings[0];
    assert_eq!(a.value.slice(src), "with b; c");
    assert_eq!(a.span.slice(src), "a = with b; c;");
    assert!(idx.bindings[1].value_is_attrset);
}
