pub mod app;
pub mod asset;
pub mod renderer;
pub mod scene;
pub mod settings;

use app::App;
use winit::event_loop::EventLoop;

fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}

pub fn run() -> Result<(), winit::error::EventLoopError> {
    init_logging();

    log::info!("Starting batched forward renderer demo");

    let event_loop = EventLoop::new()?;
    let mut app = App::new();

    let result = event_loop.run_app(&mut app);

    if let Err(ref err) = result {
        log::error!("Application error: {}", err);
    }

    log::info!("Application shutdown complete");

    result
}
