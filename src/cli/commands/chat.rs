//! Interactive chat command.

use super::{build_generator, load_pipeline, read_transcript};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::PipelineError;
use crate::pipeline::RetrievalPipeline;
use console::style;
use std::future::Future;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// One line of user input, interpreted.
#[derive(Debug, PartialEq, Eq)]
enum ChatInput<'a> {
    Empty,
    Exit,
    SwitchModel(&'a str),
    Reload(&'a str),
    Question(&'a str),
}

fn parse_input(line: &str) -> ChatInput<'_> {
    let line = line.trim();

    if line.is_empty() {
        return ChatInput::Empty;
    }
    if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
        return ChatInput::Exit;
    }
    if let Some(model) = line.strip_prefix("model ") {
        let model = model.trim();
        if !model.is_empty() {
            return ChatInput::SwitchModel(model);
        }
    }
    if let Some(path) = line.strip_prefix("reload ") {
        let path = path.trim();
        if !path.is_empty() {
            return ChatInput::Reload(path);
        }
    }

    ChatInput::Question(line)
}

/// Run the interactive chat command.
pub async fn run_chat(
    transcript: &str,
    model: Option<String>,
    settings: Settings,
) -> anyhow::Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Chat, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let generator = Arc::new(build_generator(&settings)?);
    let pipeline = load_pipeline(transcript, &settings, generator)?;
    let mut model = model.unwrap_or_else(|| settings.generation.default_model.clone());

    println!("\n{}", style("VideoMind Chat").bold().cyan());
    println!(
        "{}\n",
        style(
            "Ask about the transcript. 'model <id>' switches model, \
             'reload <file>' loads another transcript, 'exit' quits."
        )
        .dim()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        // Ctrl-C at the prompt leaves the chat; during a query it cancels the query.
        let Some(input) = next_input(&mut lines, interrupted()).await? else {
            println!();
            Output::info("Goodbye!");
            break;
        };

        match parse_input(&input) {
            ChatInput::Empty => continue,
            ChatInput::Exit => {
                Output::info("Goodbye!");
                break;
            }
            ChatInput::SwitchModel(id) => {
                model = id.to_string();
                Output::info(&format!("Using model {}", model));
            }
            ChatInput::Reload(path) => {
                if let Err(e) = reload(&pipeline, path) {
                    Output::error(&format!("Reload failed: {}", e));
                }
            }
            ChatInput::Question(question) => match ask(&pipeline, question, &model).await {
                Ok(answer) => {
                    println!("\n{} {}\n", style("VideoMind:").cyan().bold(), answer);
                }
                Err(PipelineError::Cancelled) => {
                    Output::warning("Cancelled.");
                }
                Err(e) => {
                    Output::error(&format!("Error: {}", e));
                }
            },
        }
    }

    Ok(())
}

/// Next line of input, or `None` on end of input or when `interrupt` fires first.
async fn next_input<R, F>(lines: &mut Lines<R>, interrupt: F) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    F: Future<Output = ()>,
{
    tokio::select! {
        line = lines.next_line() => line,
        _ = interrupt => Ok(None),
    }
}

/// Resolves on Ctrl-C; never resolves if the signal cannot be watched.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Ask one question; Ctrl-C cancels the in-flight answer.
async fn ask(
    pipeline: &RetrievalPipeline,
    question: &str,
    model: &str,
) -> Result<String, PipelineError> {
    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let spinner = Output::spinner("Thinking...");
    let result = pipeline.query_with_cancel(question, model, &cancel).await;
    spinner.finish_and_clear();
    watcher.abort();

    debug!("Chat query finished (ok: {})", result.is_ok());
    result
}

fn reload(pipeline: &RetrievalPipeline, path: &str) -> anyhow::Result<()> {
    let transcript = read_transcript(path)?;
    let summary = pipeline.initialize(&transcript)?;
    Output::success(&format!(
        "Reloaded {}: {} characters in {} chunks",
        path, summary.character_count, summary.chunk_count
    ));
    Ok(())
}
