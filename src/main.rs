use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use speech_practice::logging;
use speech_practice::{Settings, SpeechService, TranscriptionRequest};

#[derive(Parser, Debug)]
#[command(name = "speech-practice")]
#[command(about = "Recognize and check spoken practice words")]
struct Params {
    /// JSON settings file. Environment variables are used when omitted.
    #[arg(short = 'c', long = "config", global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Transcribe an audio file, optionally checking it against a word.
    Recognize {
        #[arg(short = 'a', long = "audio")]
        audio_path: PathBuf,

        /// Declared mimetype; guessed from the file extension when omitted.
        #[arg(short = 'm', long = "mimetype")]
        mimetype: Option<String>,

        /// Language hint; defaults to the configured language.
        #[arg(short = 'l', long = "language")]
        language: Option<String>,

        #[arg(short = 'e', long = "expect")]
        expected_word: Option<String>,
    },
    /// Compare already recognized text with the expected word.
    Check {
        #[arg(short = 'r', long = "recognized")]
        recognized: String,

        #[arg(short = 'e', long = "expect")]
        expected_word: String,
    },
    /// Print engine availability and fallback configuration.
    Status,
}

fn guess_mimetype(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("wav") => "audio/wav",
        Some("webm") => "audio/webm",
        Some("ogg") | Some("opus") => "audio/ogg",
        Some("mp3") => "audio/mpeg",
        Some("m4a") | Some("mp4") => "audio/mp4",
        _ => "application/octet-stream",
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_settings(config_path: Option<&Path>) -> Result<Settings> {
    let settings = match config_path {
        Some(path) => Settings::from_file(path)?,
        None => Settings::from_env()?,
    };
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let params = Params::parse();
    // Settings come first: loading them reads `.env`, which may set SPEECH_LOG.
    let settings = load_settings(params.config_path.as_deref())?;
    logging::init(&settings.log_filter);
    tracing::info!(
        "Recognition system: {} (auto fallback {})",
        settings.recognition_system,
        if settings.auto_fallback { "on" } else { "off" }
    );
    let service = SpeechService::new(settings).context("failed to start speech service")?;

    match params.command {
        Command::Recognize {
            audio_path,
            mimetype,
            language,
            expected_word,
        } => {
            let audio = tokio::fs::read(&audio_path)
                .await
                .with_context(|| format!("failed to read {}", audio_path.display()))?;
            let mimetype = mimetype.unwrap_or_else(|| guess_mimetype(&audio_path).to_string());
            let language = language.unwrap_or_else(|| service.settings().language.clone());
            let request = TranscriptionRequest::new(audio, mimetype, language);

            let result = match expected_word {
                Some(expected) => service
                    .recognize_and_check(request, &expected)
                    .await
                    .map(|attempt| print_json(&attempt)),
                None => service
                    .recognize(request)
                    .await
                    .map(|response| print_json(&response)),
            };

            match result {
                Ok(printed) => printed?,
                Err(e) => {
                    print_json(&e.failure_payload())?;
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Command::Check {
            recognized,
            expected_word,
        } => print_json(&service.check(&recognized, &expected_word))?,
        Command::Status => print_json(&service.status())?,
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mimetype_from_extension() {
        assert_eq!(guess_mimetype(Path::new("a/b/word.WAV")), "audio/wav");
        assert_eq!(guess_mimetype(Path::new("clip.webm")), "audio/webm");
        assert_eq!(guess_mimetype(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn parses_recognize_command() {
        let params = Params::parse_from([
            "speech-practice",
            "recognize",
            "-a",
            "word.wav",
            "--expect",
            "кот",
        ]);
        match params.command {
            Command::Recognize {
                audio_path,
                expected_word,
                ..
            } => {
                assert_eq!(audio_path, PathBuf::from("word.wav"));
                assert_eq!(expected_word.as_deref(), Some("кот"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
