//! Interface de terminal do Mutirão — spinner e saída colorida.
//!
//! Usa as crates `indicatif` para o spinner de progresso e `console` para
//! estilização com cores. O [`RunnerProgress`] acompanha visualmente os
//! jobs do registro no terminal.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use mutirao::{JobReport, JobState};

/// Indicador visual de progresso para os jobs em execução.
#[derive(Clone)]
pub struct RunnerProgress {
    // Barra de progresso/spinner do indicatif.
    pb: ProgressBar,
    // Estilo verde para jobs concluídos.
    green: Style,
    // Estilo vermelho para jobs com erro.
    red: Style,
    // Estilo amarelo para jobs cancelados.
    yellow: Style,
}

impl RunnerProgress {
    /// Inicia o spinner e retorna a instância de progresso.
    pub fn start(total: usize) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("invalid template"),
        );
        pb.set_message(format!("running {total} jobs"));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Anuncia um job recém-registrado.
    pub fn job_added(&self, name: &str) {
        self.pb.println(format!("  ▸ {name} started"));
    }

    /// Anuncia o estado terminal de um job.
    pub fn job_finished(&self, name: &str, state: JobState) {
        let line = match state {
            JobState::Completed => format!("  {} {name} completed", self.green.apply_to("✓")),
            JobState::Cancelled => format!("  {} {name} cancelled", self.yellow.apply_to("∅")),
            _ => format!("  {} {name} failed", self.red.apply_to("✗")),
        };
        self.pb.println(line);
    }

    /// Sinaliza que o drain de shutdown começou.
    pub fn draining(&self) {
        self.pb
            .set_message("cancelling jobs and waiting for acknowledgement...");
    }

    /// Finaliza o spinner e imprime o relatório de cada job em JSON.
    pub fn finish(&self, reports: &[JobReport]) {
        self.pb.finish_and_clear();
        print_reports(reports);
    }
}

/// Imprime o relatório de cada job em JSON, na ordem de inserção.
pub fn print_reports(reports: &[JobReport]) {
    let header = Style::new().green().bold();
    println!();
    println!("{}", header.apply_to("─── Job Reports ───"));
    for report in reports {
        println!(
            "{}",
            serde_json::to_string_pretty(report).unwrap_or_default()
        );
    }
}
