//! Interactive yes/no confirmation on stdin.

use anyhow::{Context, Result};

/// Asks `question` until the user answers y or n. Stdin is read on a
/// blocking thread so the runtime stays responsive. EOF counts as "no".
pub async fn yes_no(question: &str) -> Result<bool> {
    let question = question.to_string();
    tokio::task::spawn_blocking(move || prompt_loop(&question))
        .await
        .context("confirmation prompt join")?
}

fn prompt_loop(question: &str) -> Result<bool> {
    use std::io::BufRead;

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        println!("{} y/n", question);
        let line = match lines.next() {
            Some(line) => line.context("reading confirmation input")?,
            None => return Ok(false),
        };
        match line.trim() {
            "y" | "Y" => return Ok(true),
            "n" | "N" => return Ok(false),
            _ => println!("Invalid input"),
        }
    }
}
