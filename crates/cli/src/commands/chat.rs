//! `ikms chat`: index PDFs in-process, then ask questions interactively.

use std::io::Write;
use std::path::PathBuf;

use ikms_core::SessionId;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(pdfs: Vec<PathBuf>, session: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let (config, provider) = super::load_provider()?;
    let state = ikms_gateway::build_state(&config, provider);

    for pdf in &pdfs {
        eprint!("  Indexing {}...", pdf.display());
        match state.index.index_pdf(pdf).await {
            Ok(chunks) => eprintln!(" {chunks} chunks"),
            Err(e) => {
                eprintln!(" failed");
                return Err(e.into());
            }
        }
    }

    println!();
    println!("  IKMS Chat");
    println!("  Model:      {}", config.default_model);
    println!("  Documents:  {}", pdfs.len());
    println!();
    println!("  Type your question and press Enter.");
    println!("  Type 'exit' or Ctrl+D to quit.");
    println!();

    let mut session_id = session.filter(|s| !s.trim().is_empty()).map(SessionId::from);
    let mut titled = false;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question, "exit" | "quit") {
            break;
        }

        eprint!("  ...");
        match state.conversations.ask(question, session_id.clone()).await {
            Ok(reply) => {
                eprint!("\r     \r");
                if !titled {
                    println!("  [{}]", reply.session_title);
                    titled = true;
                }
                println!();
                for line in reply.answer.lines() {
                    println!("  Assistant > {line}");
                }
                if reply.used_history {
                    println!("  [history used]");
                }
                println!();
                session_id = Some(reply.session_id);
            }
            Err(e) => {
                eprint!("\r     \r");
                eprintln!("  [Error] {e}");
                println!();
            }
        }
    }

    if let Some(id) = session_id {
        println!();
        println!("  Session: {id}");
    }
    println!("  Goodbye!");

    Ok(())
}
