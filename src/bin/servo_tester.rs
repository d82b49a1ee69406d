/// Servo Tester 7CH
///
/// Run with: cargo run --bin servo_tester -- [--debug] [--config servo_tester.yaml] [--port /dev/ttyACM0]

use std::path::PathBuf;

use clap::Parser;

use servo_tester::config_loader;
use servo_tester::gui::ServoTesterGUI;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Debug-level process logging
    #[arg(long)]
    debug: bool,

    /// Optional YAML settings (baud, timeouts, drain interval)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Device to preselect in the port list
    #[arg(long)]
    port: Option<String>,
}

fn main() {
    let args = Args::parse();
    let default_filter = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let settings = match config_loader::load_settings(args.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to load settings: {:#}", e);
            std::process::exit(1);
        }
    };
    log::info!("Servo Tester starting (baud {})", settings.serial.baud);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Servo Tester 7CH — Grid Layout")
            .with_inner_size([980.0, 680.0])
            .with_min_inner_size([820.0, 520.0]),
        ..Default::default()
    };

    let port = args.port;
    if let Err(e) = eframe::run_native(
        "Servo Tester 7CH",
        options,
        Box::new(move |_cc| Box::new(ServoTesterGUI::new(settings, port))),
    ) {
        eprintln!("GUI error: {}", e);
        std::process::exit(1);
    }
}
