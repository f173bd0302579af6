//! Interface de linha de comando do Mutirão baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] e flags globais
//! (--log-file, --verbose).

use clap::{Parser, Subcommand};

/// Mutirão — executor de jobs assíncronos em processo.
#[derive(Debug, Parser)]
#[command(name = "mutirao", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de log de jobs (sobrepõe `mutirao.toml`).
    #[arg(long, global = true)]
    pub log_file: Option<String>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Executa a demonstração embutida: vários jobs concorrentes com
    /// pausa cooperativa; ctrl-c drena antes de sair.
    Demo {
        /// Quantidade de jobs concorrentes a lançar.
        #[arg(long, default_value_t = 4)]
        jobs: usize,

        /// Inclui um job que falha, para exercitar o estado de erro.
        #[arg(long, default_value_t = false)]
        with_failure: bool,
    },

    /// Mostra os jobs registrados no arquivo de log, com estado e
    /// histórico por job.
    Status,
}
