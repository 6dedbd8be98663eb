use super::{Cli, Command};
use crate::project_identity;
use clap::{CommandFactory, Parser};

#[test]
fn parser_requires_subcommand() {
    assert!(Cli::try_parse_from([project_identity::BINARY_NAME]).is_err());
}

#[test]
fn add_requires_a_package() {
    assert!(Cli::try_parse_from([project_identity::BINARY_NAME, "add"]).is_err());
    let parsed = Cli::try_parse_from([project_identity::BINARY_NAME, "add", "htop", "git", "--apply"])
        .expect("add should parse");
    match parsed.command {
        Command::Add { packages, apply } => {
            assert_eq!(packages, ["htop", "git"]);
            assert!(apply);
        }
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn global_flags_work_after_subcommand() {
    let parsed = Cli::try_parse_from([
        project_identity::BINARY_NAME,
        "service",
        "openssh",
        "--set",
        "ports=[ 22 ]",
        "--file",
        "/tmp/configuration.nix",
        "--format",
        "json",
        "--no-backup",
    ])
    .expect("service should parse");
    assert_eq!(parsed.global.format.as_deref(), Some("json"));
    assert!(parsed.global.no_backup);
    assert!(parsed.global.file.is_some());
}

#[test]
fn unknown_format_rejected() {
    assert!(Cli::try_parse_from([project_identity::BINARY_NAME, "check", "--format", "table"]).is_err());
}

#[test]
fn help_lists_every_command() {
    let mut cmd = Cli::command();
    let mut out = Vec::new();
    cmd.write_long_help(&mut out).expect("can render root help");
    let help = String::from_utf8(out).expect("help is valid utf8");
    for name in ["analyze", "add", "service", "generate", "templates", "check", "restore", "completions"] {
        assert!(help.contains(name), "help is missing {}", name);
    }
}

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}
