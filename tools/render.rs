use anyhow::{Context, Result};
use diatribe::{line_editor, mastering, RenderJob};
use std::path::PathBuf;

const USAGE: &str = "usage: diatribe-render <edit|join|master [--preview]> <job.json>";

fn print_progress(stage: &str, done: usize, total: usize) {
    log::debug!("{stage}: {done}/{total}");
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let preview = args.iter().any(|a| a == "--preview");
    let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();
    let (command, job_path) = match positional.as_slice() {
        [command, job] => (command.as_str(), PathBuf::from(job)),
        _ => anyhow::bail!(USAGE),
    };

    let job = RenderJob::from_path(&job_path)
        .with_context(|| format!("failed to load render job '{}'", job_path.display()))?;
    let dialogue = job.dialogue().context("invalid dialogue in render job")?;
    let mut session = job
        .open_session()
        .with_context(|| format!("failed to open session '{}'", job.session_id))?;
    let mut progress = print_progress;

    match command {
        "edit" => {
            for (line, soundboard) in &job.line_edits {
                line_editor::apply_line(&mut session, *line, soundboard)
                    .with_context(|| format!("failed to edit line {line}"))?;
            }
            println!("Edited {} lines", job.line_edits.len());
        }
        "join" => {
            let summary = session
                .join_dialogue(&dialogue.line_numbers(), job.gap_ms, &mut progress)
                .context("failed to join dialogue")?;
            println!(
                "Joined {} lines ({} missing) into '{}', {:.1} s",
                summary.joined.len(),
                summary.skipped.len(),
                session.dialogue_path().display(),
                summary.duration_ms / 1000.0
            );
        }
        "master" => {
            let request = job
                .mastering_request()?
                .context("render job has no mastering section")?;
            let outcome = if preview {
                mastering::preview(&session, &request, &mut progress)
            } else {
                mastering::apply(&mut session, &request, &mut progress)
            }
            .context("mastering failed")?;

            println!("Mastered {} parts", outcome.parts.len());
            println!("  original : {}", outcome.original.display());
            println!("  updated  : {}", outcome.updated.display());
            if let Some(report) = outcome.loudness {
                println!("  loudness : {:.1} LUFS", report.integrated_lufs);
                println!("  true peak: {:.1} dBTP", report.true_peak_db);
            }
        }
        other => anyhow::bail!("unknown command '{other}'\n{USAGE}"),
    }
    Ok(())
}
