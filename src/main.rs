use drag_anywhere::drag::{install_service, with_service, DragService};
use drag_anywhere::logging;
use drag_anywhere::settings::Settings;
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "settings.json".to_string());
    let settings = Settings::load(&path)?;
    logging::init(settings.debug_logging, settings.log_file.as_ref().map(PathBuf::from));

    let bindings = settings.bindings()?;
    let mut service = DragService::new(bindings);
    service.set_diagnostics(settings.debug_logging);
    install_service(service);

    with_service(|service| service.enable())
        .unwrap_or_else(|| Err(anyhow::anyhow!("drag service unavailable")))?;

    loop {
        std::thread::park();
    }
}
