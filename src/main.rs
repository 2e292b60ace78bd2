use std::error::Error;
use subnet_splitter::config::Config;
use subnet_splitter::session::{parse_args, run_session, USAGE};
use subnet_splitter::SubnetStore;

fn main() -> Result<(), Box<dyn Error>> {
    // Do as little as possible in main.rs as it can't contain any tests
    dotenv::dotenv().ok();
    let config = Config::from_env();
    if let Err(e) = log4rs::init_file(&config.log_config, Default::default()) {
        eprintln!(
            "Logging disabled, could not read {}: {e}",
            config.log_config.display()
        );
    }
    log::info!("#Start main()");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let root = match parse_args(&args) {
        Ok(root) => root,
        Err(e) => {
            eprintln!("{e}\n{USAGE}");
            std::process::exit(1);
        }
    };

    let store = SubnetStore::new();
    store.initialize(root.bits(), root.mask)?;

    let stdin = std::io::stdin();
    run_session(&store, &config, stdin.lock(), std::io::stdout())?;
    Ok(())
}
