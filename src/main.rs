//! casechat - terminal chat client for the case management messaging service
//!
//! Architecture:
//! - Main thread: applies backend events to the conversation store and prints
//! - Backend thread: runs a Tokio runtime for the push socket and history fetch
//! - Stdin thread: forwards typed lines
//! - Communication via crossbeam channels

use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{select, unbounded};

use casechat::app::ChatApp;
use casechat::config::{self, Settings};
use casechat::error::Result;
use casechat::logging;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn load_settings(path: Option<PathBuf>) -> Result<Settings> {
    let settings = match path {
        Some(path) => config::load_settings_from(&path)?,
        None => config::load_settings().unwrap_or_default(),
    };
    settings.validate()?;
    Ok(settings)
}

fn main() -> ExitCode {
    let settings_arg = std::env::args().nth(1).map(PathBuf::from);
    let settings = match load_settings(settings_arg) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("casechat: {}", e);
            match config::settings_path() {
                Some(path) => eprintln!("Set user_id in {} or pass a settings file", path.display()),
                None => eprintln!("usage: casechat [settings.json]"),
            }
            return ExitCode::from(2);
        }
    };

    match logging::log_directory() {
        Ok(dir) => {
            if let Err(e) = logging::init_logging(&dir, &settings.log_level) {
                eprintln!("casechat: logging disabled: {}", e);
            }
        }
        Err(e) => eprintln!("casechat: logging disabled: {}", e),
    }
    tracing::info!(user = %settings.user_id, "starting session");

    let mut app = ChatApp::new(settings);
    app.start();
    println!("Signed in as {}. Type /help for commands.", app.store.local_user().name);

    // Forward stdin lines; the channel closes on EOF
    let (line_tx, line_rx) = unbounded::<String>();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    loop {
        select! {
            recv(line_rx) -> line => {
                let Ok(line) = line else { break };
                let (keep_going, out) = app.handle_line(&line);
                for l in out {
                    println!("{}", l);
                }
                if !keep_going {
                    break;
                }
            }
            default(POLL_INTERVAL) => {}
        }
        for l in app.poll() {
            println!("{}", l);
        }
    }

    app.shutdown();
    tracing::info!("session ended");
    logging::flush_logging();
    ExitCode::SUCCESS
}
