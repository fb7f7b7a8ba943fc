use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;

use tt_core::completion::{CompletionClient, LanguageModel};
use tt_core::config::{parse_config_toml, Config, DEFAULT_CONFIG_TOML};
use tt_core::field::{FieldGeometry, FieldSnapshot, NodeId, NodeInfo, Rect};
use tt_core::keys::{InputTrigger, Key, KeyEvent, Modifiers};
use tt_core::metrics::EstimatingMeasurer;
use tt_core::settings::{SettingsStore, SettingsUpdate};
use tt_session::clock::{Clock, ManualClock};
use tt_session::{AugmentSession, CorrectionResult, Effect, PredictionResult, Response};
use turbotype_engine::capability::http::{HttpModel, DEFAULT_ENDPOINT};

#[derive(Parser)]
#[command(name = "tttool", about = "Turbotype engine diagnostics")]
struct Cli {
    /// Config file to use instead of the built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check whether a model server is reachable and the model installed
    Probe {
        #[arg(long, default_value = DEFAULT_ENDPOINT)]
        endpoint: String,
        #[arg(long, default_value = "llama3.2")]
        model: String,
    },

    /// Run one correction or prediction against a model server
    Complete {
        /// Text to send
        text: String,
        /// Predict the next word instead of correcting
        #[arg(long)]
        predict: bool,
        #[arg(long, default_value = DEFAULT_ENDPOINT)]
        endpoint: String,
        #[arg(long, default_value = "llama3.2")]
        model: String,
    },

    /// Replay a typing script through a session on a virtual clock
    Simulate {
        /// Script file: one command per line (`type <text>`, `backspace [n]`,
        /// `wait <ms>`, `key <name>`, `settings <json>`)
        script: PathBuf,
        /// Milliseconds between typed characters
        #[arg(long, default_value = "60")]
        key_interval: u64,
        /// Model server; without it completions use their fallbacks
        #[arg(long)]
        endpoint: Option<String>,
        #[arg(long, default_value = "llama3.2")]
        model: String,
    },

    /// Print the default config, or validate a config file
    Config {
        /// File to validate
        #[arg(long)]
        check: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Config {
    let Some(path) = path else {
        return Config::default();
    };
    let content = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Failed to read config {}: {}", path.display(), e);
        process::exit(1);
    });
    parse_config_toml(&content).unwrap_or_else(|e| {
        eprintln!("Invalid config {}: {}", path.display(), e);
        process::exit(1);
    })
}

fn open_model(endpoint: &str, model: &str) -> HttpModel {
    HttpModel::new(endpoint, model).unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    })
}

fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    match cli.command {
        Command::Probe { endpoint, model } => {
            let http = open_model(&endpoint, &model);
            match http.installed_models() {
                Ok(models) => {
                    println!("server:       {}", http.endpoint());
                    println!("availability: {:?}", http.availability());
                    for name in models {
                        println!("  {name}");
                    }
                }
                Err(e) => {
                    eprintln!("{}: unreachable ({e})", http.endpoint());
                    process::exit(2);
                }
            }
        }

        Command::Complete {
            text,
            predict,
            endpoint,
            model,
        } => {
            let http = open_model(&endpoint, &model);
            let client =
                CompletionClient::initialize(Some(&http as &dyn LanguageModel), &config.completion);
            if predict {
                println!("{}", client.predict_next(&text));
            } else {
                println!("{}", client.correct(&text));
            }
        }

        Command::Simulate {
            script,
            key_interval,
            endpoint,
            model,
        } => {
            let content = fs::read_to_string(&script).unwrap_or_else(|e| {
                eprintln!("Failed to read script {}: {}", script.display(), e);
                process::exit(1);
            });
            let http = endpoint.map(|e| open_model(&e, &model));
            let client = CompletionClient::initialize(
                http.as_ref().map(|m| m as &dyn LanguageModel),
                &config.completion,
            );
            let mut sim = Simulation::new(&config, client, key_interval);
            for (lineno, line) in content.lines().enumerate() {
                if let Err(msg) = sim.run_line(line) {
                    eprintln!("{}:{}: {}", script.display(), lineno + 1, msg);
                    process::exit(1);
                }
            }
            println!("{}", json!({ "final_value": sim.value }));
        }

        Command::Config { check } => match check {
            Some(path) => {
                load_config(Some(&path));
                println!("{}: ok", path.display());
            }
            None => print!("{DEFAULT_CONFIG_TOML}"),
        },
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

const FIELD: NodeId = NodeId(1);

/// One text field driven synchronously: model calls run inline and their
/// results are delivered before the clock moves again.
struct Simulation {
    session: AugmentSession,
    client: CompletionClient,
    clock: Arc<ManualClock>,
    key_interval: u64,
    value: String,
}

impl Simulation {
    fn new(config: &Config, client: CompletionClient, key_interval: u64) -> Self {
        let clock = Arc::new(ManualClock::new());
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let mut session = AugmentSession::new(
            config,
            SettingsStore::default(),
            Arc::new(EstimatingMeasurer::new(&config.metrics)),
            dyn_clock,
        );
        let resp = session.attach_all(&[NodeInfo::element(FIELD.0, "input", Some("text"))]);
        let mut sim = Self {
            session,
            client,
            clock,
            key_interval,
            value: String::new(),
        };
        sim.apply(resp);
        sim
    }

    fn run_line(&mut self, line: &str) -> Result<(), String> {
        // Trailing spaces are significant for `type`.
        let line = line.trim_start().trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with('#') {
            return Ok(());
        }
        let (cmd, arg) = line.split_once(' ').unwrap_or((line, ""));
        let cmd = cmd.trim();
        match cmd {
            "type" => {
                for ch in arg.chars() {
                    self.value.push(ch);
                    let trigger = InputTrigger {
                        key: Some(KeyEvent::plain(Key::Char(ch))),
                        input_type: Some("insertText".to_string()),
                    };
                    self.input(&trigger);
                    self.wait(self.key_interval);
                }
            }
            "backspace" => {
                let n: usize = if arg.trim().is_empty() {
                    1
                } else {
                    arg.trim().parse().map_err(|_| format!("bad count: {arg}"))?
                };
                for _ in 0..n {
                    self.value.pop();
                    let trigger = InputTrigger {
                        key: Some(KeyEvent::plain(Key::Backspace)),
                        input_type: Some("deleteContentBackward".to_string()),
                    };
                    self.input(&trigger);
                    self.wait(self.key_interval);
                }
            }
            "wait" => {
                let ms: u64 = arg.trim().parse().map_err(|_| format!("bad duration: {arg}"))?;
                self.wait(ms);
            }
            "key" => {
                let event = KeyEvent::from_dom(arg.trim(), Modifiers::none());
                let resp = self.session.handle_key(FIELD, &event, self.snapshot());
                if !resp.consumed {
                    let t = self.clock.now_ms();
                    println!("{}", json!({ "t": t, "key": arg.trim(), "consumed": false }));
                }
                self.apply(resp);
            }
            "settings" => {
                let update = SettingsUpdate::from_json(arg).map_err(|e| e.to_string())?;
                let resp = self.session.apply_settings(update);
                self.apply(resp);
            }
            other => return Err(format!("unknown command: {other}")),
        }
        Ok(())
    }

    fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot {
            value: self.value.clone(),
            cursor: self.value.chars().count(),
            geometry: FieldGeometry {
                rect: Rect {
                    top: 100.0,
                    left: 40.0,
                    width: 400.0,
                    height: 24.0,
                },
                font: "16px sans-serif".to_string(),
            },
        }
    }

    fn input(&mut self, trigger: &InputTrigger) {
        let resp = self.session.handle_input(FIELD, self.snapshot(), trigger);
        self.apply(resp);
    }

    /// Advance the clock, firing corrections as their deadlines pass.
    fn wait(&mut self, ms: u64) {
        let end = self.clock.now_ms() + ms;
        loop {
            let step = self
                .session
                .next_deadline_ms()
                .filter(|&d| self.clock.now_ms() + d <= end);
            match step {
                Some(d) => self.clock.advance(d),
                None => break,
            }
            for request in self.session.poll_timers() {
                let corrected = self.client.correct(&request.snapshot);
                let result = CorrectionResult {
                    field: request.field,
                    generation: request.generation,
                    snapshot: request.snapshot,
                    corrected,
                };
                if let Some(resp) = self.session.receive_correction(result) {
                    self.apply(resp);
                }
            }
        }
        self.clock.set(end);
    }

    fn apply(&mut self, mut resp: Response) {
        let t = self.clock.now_ms();
        for effect in &resp.effects {
            let line = match effect {
                Effect::SetValue { value, .. } => {
                    self.value.clone_from(value);
                    json!({ "t": t, "effect": "set_value", "value": value })
                }
                Effect::ShowOverlay {
                    text,
                    top,
                    left,
                    created,
                    ..
                } => json!({
                    "t": t,
                    "effect": "show_overlay",
                    "text": text,
                    "top": top,
                    "left": left,
                    "created": created,
                }),
                Effect::RemoveOverlay { .. } => json!({ "t": t, "effect": "remove_overlay" }),
                Effect::AttachListeners { field, kind } => json!({
                    "t": t,
                    "effect": "attach",
                    "field": field.0,
                    "kind": format!("{kind:?}"),
                }),
                Effect::ObserveSubtree { .. } | Effect::SchedulePoll { .. } => continue,
            };
            println!("{line}");
        }
        if let Some(request) = resp.prediction.take() {
            let suggestion = self.client.predict_next(&request.text);
            let result = PredictionResult {
                field: request.field,
                generation: request.generation,
                suggestion,
            };
            if let Some(resp) = self.session.receive_prediction(result) {
                self.apply(resp);
            }
        }
    }
}
