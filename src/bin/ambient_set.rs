use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use ambient_light::animation::AnimationMode;
use ambient_light::command::{parse_brightness, send_message, BrightnessValue, Message};
use ambient_light::config::Config;

#[derive(Parser)]
#[command(name = "ambient-set")]
#[command(about = "Send one command to the ambient lighting daemon", long_about = None)]
struct Cli {
    /// Path to the daemon's configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// red|green|blue|yellow|cyan|magenta|white|rainbow|off
    #[command(alias = "color")]
    Mode { value: String },
    /// 0-100, or low|mid|high
    Brightness { value: String },
    /// Turn the strip off
    Off,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(1),
            };
        }
    };

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ {}", e);
            return ExitCode::from(1);
        }
    };

    let message = match to_message(cli.action, &config) {
        Ok(message) => message,
        Err(usage) => {
            eprintln!("✗ {}", usage);
            return ExitCode::from(1);
        }
    };

    if let Err(e) = send_message(&config.command, &message) {
        eprintln!("✗ Failed to write to {}: {}", config.command.path, e);
        return ExitCode::from(1);
    }

    match message {
        Message::Color(mode) => println!("✓ Mode set: {}", mode),
        Message::Brightness(BrightnessValue::Level(level)) => println!("✓ Brightness set: {}", level),
        Message::Brightness(BrightnessValue::Name(name)) => println!("✓ Brightness set: {}", name),
    }
    ExitCode::SUCCESS
}

fn to_message(action: Action, config: &Config) -> Result<Message, String> {
    match action {
        Action::Off => Ok(Message::Color("off".to_string())),
        Action::Mode { value } => {
            let name = value.trim().to_ascii_lowercase();
            if AnimationMode::NAMES.contains(&name.as_str()) {
                Ok(Message::Color(name))
            } else {
                Err(format!(
                    "unknown mode '{}', expected one of {}",
                    value,
                    AnimationMode::NAMES.join("|")
                ))
            }
        }
        Action::Brightness { value } => {
            match parse_brightness(&value, &config.animation.brightness_levels) {
                Some(level) if (0..=100).contains(&level) => {
                    if value.trim().parse::<i64>().is_ok() {
                        Ok(Message::Brightness(BrightnessValue::Level(level)))
                    } else {
                        let name = value.trim().to_ascii_lowercase();
                        Ok(Message::Brightness(BrightnessValue::Name(name)))
                    }
                }
                _ => Err(format!("invalid brightness '{}', expected 0-100 or low|mid|high", value)),
            }
        }
    }
}
