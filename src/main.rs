//! lesson-studio · catalog outline printer
//!
//! Loads the unit outline of the configured program from the admin API,
//! expands the first unit and its first topic, and prints the outline with
//! content positions and visibility. Ctrl-C aborts an in-flight load.
//!
//! See the library docs for the environment variables.

use std::error::Error;

use tracing::{info, instrument, warn};

use lesson_studio::config::load_config_from_env;
use lesson_studio::ordering::Visible;
use lesson_studio::store::CatalogState;
use lesson_studio::{telemetry, ApiClient, CatalogStore, Services};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
  telemetry::init_tracing();

  let cfg = load_config_from_env();
  info!(target: "lesson_studio", base_url = %cfg.api.base_url, program = %cfg.program, "Starting lesson-studio");

  let api = ApiClient::from_config(&cfg)?;
  let store = CatalogStore::new(Services::new(api));

  tokio::select! {
    res = walk(&store, &cfg.program) => res?,
    _ = tokio::signal::ctrl_c() => {
      warn!(target: "lesson_studio", "Interrupted");
      return Ok(());
    }
  }

  print_outline(&store.snapshot().await);
  Ok(())
}

/// Outline, then the first unit, then the first topic of that unit.
#[instrument(level = "info", skip(store))]
async fn walk(store: &CatalogStore<Services>, program: &str) -> Result<(), Box<dyn Error>> {
  let outline = store.load_outline(program).await?;
  let Some(first_unit) = outline.first().map(|g| g.unit.clone()) else {
    info!(target: "lesson_studio", %program, "Program has no units");
    return Ok(());
  };
  store.expand_unit(&first_unit).await?;

  if let Some(topic) = store.topics_of(&first_unit).await.first() {
    store.expand_topic(topic.id).await?;
  }
  Ok(())
}

fn print_outline(st: &CatalogState) {
  println!("{}", st.program);
  for group in &st.unit_groups {
    let marker = if st.expanded_unit.as_deref() == Some(group.unit.as_str()) { "-" } else { "+" };
    println!("{marker} {}", group.unit);
    for topic in &group.topics {
      println!("    [{}] {}{}", position(topic.order_index), topic.name, hidden_tag(topic.is_visible()));
      if st.expanded_topic == Some(topic.id) {
        for c in st.content_of(topic.id) {
          println!(
            "        [{}] {} ({} questions){}",
            position(c.order_index),
            c.title,
            c.question_count,
            hidden_tag(c.is_visible())
          );
        }
      }
    }
  }
}

fn position(idx: Option<i64>) -> String {
  idx.map(|i| i.to_string()).unwrap_or_else(|| "-".into())
}

fn hidden_tag(visible: bool) -> &'static str {
  if visible { "" } else { " (hidden)" }
}
