use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use re621::app::domain::config::Config;
use re621::app::infrastructure::readiness::DomProbe;
use re621::app::infrastructure::store::{FileStore, SharedStore};
use re621::app::infrastructure::api::HttpApi;
use re621::app::state::AppState;
use tracing_subscriber::EnvFilter;

/// Without a browser every element is considered present.
struct HeadlessDom;

impl DomProbe for HeadlessDom {
    fn exists(&self, _selector: &str) -> bool {
        true
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let urls: Vec<String> = std::env::args().skip(1).collect();
    let Some((first, rest)) = urls.split_first() else {
        eprintln!("usage: re621 <url>...");
        std::process::exit(2);
    };

    if let Err(e) = run(first, rest) {
        eprintln!("re621: {}", e);
        std::process::exit(1);
    }
}

fn run(first: &str, rest: &[String]) -> re621::Result<()> {
    let config = Config::load();
    let file_store = FileStore::new(config.settings_store_path());
    tracing::info!("Module settings stored in {}", file_store.path().display());
    let store: SharedStore = Rc::new(RefCell::new(file_store));
    let api = Box::new(HttpApi::new(&config));

    let mut state = AppState::new(config, store, api, first)?;
    state.register_default_modules()?;

    let mut watcher = state.structure_watcher();
    state.await_structure(&HeadlessDom, &mut watcher, Instant::now());
    report(&mut state);

    for url in rest {
        state.navigate(url)?;
        report(&mut state);
    }

    state.teardown();
    Ok(())
}

fn report(state: &mut AppState) {
    println!("{}", state.page().url());
    let active: Vec<String> = state
        .controller()
        .active()
        .iter()
        .map(ToString::to_string)
        .collect();
    println!("  active: {}", active.join(", "));
    for effect in state.take_effects() {
        println!("  {:?}", effect);
    }
}
