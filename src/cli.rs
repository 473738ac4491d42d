//! Interface de linha de comando do job-poller baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (run, definition,
//! describe) e flags globais (--config, --wait-seconds, --timeout-seconds,
//! --log-level, --verbose).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::history::LogLevel;

/// job-poller — executa um job e consulta seu status até sucesso, falha ou prazo esgotado.
#[derive(Debug, Parser)]
#[command(name = "job-poller", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho para o arquivo de configuração (padrão: ./job-poller.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Segundos de espera entre consultas.
    #[arg(long, global = true)]
    pub wait_seconds: Option<u64>,

    /// Prazo total da execução em segundos.
    #[arg(long, global = true)]
    pub timeout_seconds: Option<u64>,

    /// Quais eventos do histórico registrar.
    #[arg(long, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Nível de log aceito pela CLI, mapeado para [`LogLevel`] internamente.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    /// Todos os eventos.
    All,
    /// Apenas falhas.
    Error,
    /// Apenas falhas que encerram a execução.
    Fatal,
    /// Nenhum evento.
    Off,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::All => LogLevel::All,
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Fatal => LogLevel::Fatal,
            LogLevelArg::Off => LogLevel::Off,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Executa o workflow localmente até um estado terminal ou o prazo.
    Run(JobSource),

    /// Imprime a definição do workflow em Amazon States Language (JSON).
    Definition,

    /// Mostra a tabela de transições do workflow.
    Describe,
}

/// De onde vem o código de status do job. Exatamente uma opção.
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct JobSource {
    /// Sequência de códigos de status, separados por vírgula (o último se repete).
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    pub codes: Option<Vec<i64>>,

    /// Comando de shell cujo código de saída é o código de status.
    #[arg(long)]
    pub command: Option<String>,

    /// Códigos aleatórios em 0..3.
    #[arg(long)]
    pub random: bool,
}
