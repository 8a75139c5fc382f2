fn main() -> Result<(), eframe::Error> {
    // Set up logging for development
    env_logger::init();

    flow_designer::run_app()
}
