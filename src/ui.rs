//! Interface de terminal do job-poller — spinner e saída colorida.
//!
//! Usa as crates `indicatif` para o spinner de progresso e `console` para
//! estilização com cores. O [`ExecutionProgress`] acompanha visualmente
//! cada estado de uma execução no terminal.

use std::fmt::Write as _;
use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::PollerError;
use crate::executor::{ExecutionObserver, ExecutionOutcome, ExecutionRecord};
use crate::workflow::{ExecutionContext, StateId, TransitionRule, WorkflowDefinition};

/// Indicador visual de progresso para uma execução no terminal.
///
/// Exibe um spinner com o estado atual e mensagens coloridas para sucesso
/// (verde), falha (vermelho) e prazo esgotado (amarelo).
pub struct ExecutionProgress {
    // Barra de progresso/spinner do indicatif.
    pb: ProgressBar,
    // Estilo verde para mensagens de sucesso.
    green: Style,
    // Estilo vermelho para mensagens de falha.
    red: Style,
    // Estilo amarelo para espera e prazo esgotado.
    yellow: Style,
}

impl ExecutionProgress {
    /// Inicia o spinner e retorna a instância de progresso.
    pub fn start() -> Self {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} [{elapsed}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.set_message("starting execution");
        pb.enable_steady_tick(Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Finaliza o spinner e exibe o resultado final da execução.
    pub fn complete(&self, record: &ExecutionRecord) {
        self.pb.finish_and_clear();
        match &record.outcome {
            ExecutionOutcome::Succeeded { final_status } => {
                println!(
                    "  {} Succeeded after {} poll(s): {final_status}",
                    self.green.apply_to("✓"),
                    record.job_invocations
                );
            }
            ExecutionOutcome::Failed { cause, error } => {
                println!("  {} Failed: {error} ({cause})", self.red.apply_to("✗"));
            }
            ExecutionOutcome::TimedOut { timeout_seconds } => {
                println!(
                    "  {} Timed out after {timeout_seconds}s and {} poll(s)",
                    self.yellow.apply_to("⏱"),
                    record.job_invocations
                );
            }
        }
    }

    /// Imprime o registro da execução formatado em JSON.
    pub fn print_record(&self, record: &ExecutionRecord) -> Result<(), PollerError> {
        let json = record.to_json_pretty()?;
        let style = match record.outcome {
            ExecutionOutcome::Succeeded { .. } => &self.green,
            ExecutionOutcome::Failed { .. } => &self.red,
            ExecutionOutcome::TimedOut { .. } => &self.yellow,
        };
        println!();
        println!("{}", style.apply_to("─── Execution Record ───"));
        println!("{json}");
        Ok(())
    }
}

impl ExecutionObserver for ExecutionProgress {
    fn state_entered(&self, state: StateId, context: &ExecutionContext) {
        let message = match (state, context.status_code) {
            (StateId::CheckStatus, Some(code)) => format!("{state}: statusCode = {code}"),
            (StateId::JobCompleted, _) => match context.status {
                Some(status) => format!("{state} status = {status}"),
                None => state.to_string(),
            },
            _ => state.to_string(),
        };
        self.pb.set_message(message);
    }

    fn waiting(&self, duration: Duration) {
        self.pb.println(format!(
            "  {} job not finished, polling again in {}s",
            self.yellow.apply_to("↻"),
            duration.as_secs()
        ));
    }
}

/// Monta a tabela de transições da definição, uma linha por estado.
pub fn render_table(definition: &WorkflowDefinition) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<15} {:<26} {}", "STATE", "ACTION", "NEXT");
    for spec in definition.states() {
        let action = spec
            .action
            .as_ref()
            .map(|a| a.identifier())
            .unwrap_or("-");
        let next = match &spec.rule {
            TransitionRule::Next(next) => next.to_string(),
            TransitionRule::Choice { branches, default } => {
                let mut parts: Vec<String> = branches
                    .iter()
                    .map(|b| format!("{} → {}", b.when, b.next))
                    .collect();
                parts.push(format!("otherwise → {default}"));
                parts.join(", ")
            }
            TransitionRule::End => "(end)".to_string(),
        };
        let marker = if spec.id == definition.start_at() { "*" } else { " " };
        let _ = writeln!(out, "{marker}{:<14} {action:<26} {next}", spec.id.to_string());
    }
    let _ = writeln!(out, "timeout: {}s", definition.timeout().as_secs());
    out
}
