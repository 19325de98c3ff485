//! Two "tabs" sharing one storage file, kept in sync through store events.
//!
//! Run with `RUST_LOG=tether=debug` to see the dispatch flow.

use tether::store::{FileBackend, Store};
use tether::{create_effect, use_local_storage, use_storage};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Persisted State Example ===\n");

    let path = std::env::temp_dir().join("tether-demo.json");
    let store = Store::new(FileBackend::open(&path)?);
    let tab_a = store.context();
    let tab_b = store.context();

    let theme_a = use_local_storage(&tab_a, "theme", "light".to_string());
    let theme_b = use_local_storage(&tab_b, "theme", "light".to_string());

    let _render = create_effect({
        let theme = theme_b.value();
        move || println!("   [tab B] theme is now {}", theme.get())
    });

    println!("1. Tab A switches to dark");
    theme_a.set_value("dark".to_string());

    println!("2. Tab A cycles with a functional update");
    theme_a.update_value(|t| if t == "dark" { "light".into() } else { "dark".into() });

    println!("3. Tab B stops listening, tab A writes again");
    theme_b.stop();
    theme_a.set_value("solarized".to_string());
    println!("   [tab B] still shows {}", theme_b.get());

    println!("4. Write-through list in tab A");
    let recent = use_storage(&tab_a, "recent", Vec::<String>::new());
    recent.update(|items| items.push("settings".into()));
    println!("   stored: {:?}", tab_a.get_item("recent")?);

    theme_a.remove_value();
    println!("\nState file: {}", path.display());
    Ok(())
}
