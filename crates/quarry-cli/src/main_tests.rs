//! CLI argument parsing tests

use crate::{Cli, Commands, ConfigAction, OutputFormat};
use clap::{CommandFactory, Parser};

#[test]
fn test_cli_definition_is_valid() {
    Cli::command().debug_assert();
}

#[test]
fn test_build_collects_repeated_values() {
    let cli = Cli::try_parse_from([
        "quarry",
        "build",
        "--object-type",
        "emf:Case",
        "--object-type",
        "emf:Document",
        "--free-text",
        "audit",
        "--context",
        "emf:1",
    ])
    .unwrap();

    match cli.command {
        Commands::Build {
            object_type,
            free_text,
            context,
            restrictions,
            request,
        } => {
            assert_eq!(object_type, vec!["emf:Case", "emf:Document"]);
            assert_eq!(free_text.as_deref(), Some("audit"));
            assert_eq!(context, vec!["emf:1"]);
            assert!(restrictions.is_none());
            assert!(!request);
        }
        _ => panic!("expected build command"),
    }
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli =
        Cli::try_parse_from(["quarry", "encode", "tree.json", "--format", "json", "-q"]).unwrap();
    assert!(cli.format == OutputFormat::Json);
    assert!(cli.quiet);
}

#[test]
fn test_config_set_requires_value() {
    assert!(Cli::try_parse_from(["quarry", "config", "set", "render.format"]).is_err());

    let cli = Cli::try_parse_from(["quarry", "config", "set", "render.format", "html"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Config {
            action: ConfigAction::Set { .. }
        }
    ));
}

#[test]
fn test_unknown_output_format_rejected() {
    assert!(Cli::try_parse_from(["quarry", "--format", "yaml", "config", "list"]).is_err());
}
