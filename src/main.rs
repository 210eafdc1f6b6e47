use std::path::Path;
use std::sync::Arc;
use std::thread;

use log::info;
use tokio::sync::broadcast;
use trackloop::controller::PageController;
use trackloop::prefs::{FilePrefs, PreferenceStore};
use trackloop::remote::{run_console, PageDirectory, RemoteClient};
use trackloop::service::PageService;
use trackloop::snapshot::SnapshotPage;
use uuid::Uuid;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut clog = colog::default_builder();
    clog.filter(None, log::LevelFilter::Debug);
    clog.init();

    std::panic::set_hook(Box::new(|panic_info| {
        let current_thread = std::thread::current();
        let thread_name = current_thread.name().unwrap_or("unnamed");
        log::error!("panic in thread '{}': {}", thread_name, panic_info);
    }));

    let mut args = std::env::args().skip(1);
    let Some(page_path) = args.next() else {
        eprintln!("usage: trackloop <saved-page.html> [--json]");
        return Ok(());
    };
    let json_only = args.next().as_deref() == Some("--json");

    let page = Arc::new(SnapshotPage::from_file(Path::new(&page_path))?);

    let prefs_path = FilePrefs::default_path().ok_or("no config directory available")?;
    let prefs = Arc::new(FilePrefs::open(prefs_path));

    if json_only {
        let controller = PageController::new(page, prefs as Arc<dyn PreferenceStore>);
        println!("{}", serde_json::to_string_pretty(&controller.snapshot())?);
        return Ok(());
    }

    // Bus for communication between components
    let (bus_sender, bus_receiver) = broadcast::channel(1024);

    let page_id = Uuid::new_v4().to_string();
    let directory = PageDirectory::new();
    directory.register(page_id.clone(), page_path.clone());
    info!("Serving page snapshot {} as {}", page_path, page_id);

    // Setup PageService
    let controller = PageController::new(page, Arc::clone(&prefs) as Arc<dyn PreferenceStore>);
    let mut service = PageService::new(
        page_id,
        controller,
        bus_sender.subscribe(),
        bus_sender.clone(),
    );
    thread::spawn(move || service.run());

    let mut client = RemoteClient::new(bus_sender, bus_receiver, directory, prefs);
    run_console(&mut client);

    info!("Exiting");
    Ok(())
}
