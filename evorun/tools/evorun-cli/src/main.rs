use clap::{Parser, Subcommand};

// On garde le module local des commandes
mod commands;

use evorun::{user_error, utils::error::AnyResult};

#[derive(Parser)]
#[command(name = "evorun")]
#[command(about = "Orchestrateur de générations : cluster batch, relances, agrégation", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone)]
enum Commands {
    /// Lance une campagne complète
    Run(commands::run::RunArgs),

    /// Résultats présents / manquants d'une génération (lecture seule)
    Status(commands::GenerationArgs),

    /// Recalcule les fitness d'une génération
    Aggregate(commands::GenerationArgs),

    /// Affiche la description de soumission d'une génération sans la soumettre
    RenderSubmit(commands::GenerationArgs),
}

fn main() {
    // 1. Parsing : usage sur stderr et code 1 si un argument manque
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            e.print().ok();
            std::process::exit(code);
        }
    };

    // 2. Runtime mono-thread : un seul fil de contrôle
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            user_error!("RUNTIME_INIT", "Runtime tokio indisponible : {}", e);
            std::process::exit(1);
        }
    };

    // 3. Dispatch
    if let Err(e) = runtime.block_on(execute_command(cli.command)) {
        user_error!("CMD_FAIL", "{:#}", e);
        std::process::exit(1);
    }

    tracing::debug!("Fin de l'exécution du CLI");
}

async fn execute_command(cmd: Commands) -> AnyResult<()> {
    match cmd {
        Commands::Run(args) => commands::run::handle(args).await,
        Commands::Status(args) => commands::status::handle(args).await,
        Commands::Aggregate(args) => commands::aggregate::handle(args).await,
        Commands::RenderSubmit(args) => commands::render_submit::handle(args).await,
    }
}

// --- TESTS UNITAIRES ---
#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::path::PathBuf;

    #[test]
    fn verify_cli_structure() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_help_generation() {
        let output = Cli::command().render_help().to_string();
        assert!(output.contains("evorun"));
        assert!(output.contains("render-submit"));
    }

    #[test]
    fn test_run_positional_arguments() {
        let cli = Cli::try_parse_from(["evorun", "run", "/exp/atari", "50", "100"])
            .expect("Parsing failed");
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.experiment, PathBuf::from("/exp/atari"));
                assert_eq!(args.iterations, 50);
                assert_eq!(args.population, 100);
                assert!(args.config.is_none());
            }
            _ => panic!("Le dispatch vers 'run' a échoué"),
        }
    }

    #[test]
    fn test_run_with_config_path() {
        let cli = Cli::try_parse_from(["evorun", "run", "exp", "3", "10", "cluster.json"]).unwrap();
        match cli.command {
            Commands::Run(args) => assert_eq!(args.config, Some(PathBuf::from("cluster.json"))),
            _ => panic!("'run' attendu"),
        }
    }

    #[test]
    fn test_missing_arguments_is_usage_error() {
        let err = Cli::try_parse_from(["evorun", "run", "exp", "3"])
            .err()
            .expect("argument manquant");
        assert!(err.use_stderr());

        let err = Cli::try_parse_from(["evorun", "run", "exp", "trois", "10"])
            .err()
            .expect("itérations non numériques");
        assert!(err.use_stderr());
    }

    #[test]
    fn test_generation_subcommands() {
        let cli = Cli::try_parse_from(["evorun", "status", "exp", "4", "20"]).unwrap();
        match cli.command {
            Commands::Status(args) => {
                assert_eq!(args.generation, 4);
                assert_eq!(args.population, 20);
            }
            _ => panic!("'status' attendu"),
        }
        let cli =
            Cli::try_parse_from(["evorun", "render-submit", "exp", "0", "5", "c.json"]).unwrap();
        assert!(matches!(cli.command, Commands::RenderSubmit(_)));
    }
}
