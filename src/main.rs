use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::error::InquireResult;
use tracing_subscriber::EnvFilter;

mod aliases;
mod bookmarks;
mod cli;
mod config;
mod errors;
mod pool;
mod publisher;
mod store;
#[cfg(test)]
mod tests;
mod timestamp;

use aliases::AliasState;
use bookmarks::BookmarkTree;
use cli::{AliasAction, Command};
use config::{Config, FailurePolicy};
use publisher::IndexPublisher;
use store::{DocumentStore, ElasticStore};

fn base_path(args: &cli::Args) -> anyhow::Result<PathBuf> {
    if let Some(path) = &args.base_path {
        return Ok(path.clone());
    }
    if let Ok(path) = std::env::var("ELASTICBOOK_BASE_PATH") {
        return Ok(PathBuf::from(path));
    }
    let home = homedir::my_home()
        .context("Could not determine home directory")?
        .context("Home directory path is empty")?;
    Ok(home.join(".local/share/elasticbook"))
}

fn load_tree(file: Option<PathBuf>, config: &Config) -> anyhow::Result<(PathBuf, BookmarkTree)> {
    let path = file
        .or_else(|| config.bookmarks_path.as_ref().map(PathBuf::from))
        .or_else(bookmarks::default_bookmarks_path)
        .context("no bookmarks file given and no browser profile found")?;

    let tree = BookmarkTree::load(&path)
        .with_context(|| format!("Your bookmarks at {} cannot be parsed", path.display()))?;
    Ok((path, tree))
}

fn connect(config: &Config) -> anyhow::Result<Arc<dyn DocumentStore>> {
    let store = ElasticStore::new(&config.store)
        .with_context(|| format!("Unable to set up client for {}", config.store.endpoint))?
        .with_document_type(&config.index.document_type);
    log::info!("using search engine at {}", store.endpoint());
    Ok(Arc::new(store))
}

/// Warns when a typed document type meets an engine that only takes typeless
/// mappings.
fn check_document_type(store: &dyn DocumentStore, config: &Config) {
    if config.index.document_type == "_doc" {
        return;
    }
    match store.version() {
        Ok(version) if store::elastic::requires_typeless(&version) => log::warn!(
            "Elasticsearch {version} rejects document type {:?}, set index.document_type to _doc",
            config.index.document_type
        ),
        Ok(_) => {}
        Err(err) => log::debug!("could not detect engine version: {err}"),
    }
}

fn progress_bar(total: usize) -> anyhow::Result<ProgressBar> {
    let bar = ProgressBar::new(total as u64);
    bar.set_style(ProgressStyle::with_template(
        "[{elapsed_precise}] {bar:40} Node ({pos}/{len})",
    )?);
    Ok(bar)
}

fn confirm(message: &str) -> anyhow::Result<bool> {
    match inquire::prompt_confirmation(message) {
        InquireResult::Ok(answer) => Ok(answer),
        InquireResult::Err(err) => bail!("An error occurred: {}", err),
    }
}

fn print_count(path: &Path, tree: &BookmarkTree) {
    let count = tree.count();
    println!("Working on {}", path.display());
    print!("{count}");
    println!("Total: {} in {} root folders", count.total(), count.len());
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Args::parse();

    let mut config = Config::load_with(&base_path(&args)?)?;
    config.apply_env()?;

    match args.command {
        Command::Parse { file } => {
            let (path, _) = load_tree(file, &config)?;
            println!("Your bookmarks at {} seem healthy", path.display());
        }

        Command::Count { file, folder } => {
            let (path, tree) = load_tree(file, &config)?;
            match folder {
                Some(name) => match tree.count().by_name(&name) {
                    Some(count) => println!("{name}: {count}"),
                    None => bail!("no root folder named {name:?} in {}", path.display()),
                },
                None => print_count(&path, &tree),
            }
        }

        Command::Index {
            file,
            keep_going,
            no_promote,
        } => {
            let (path, tree) = load_tree(file, &config)?;

            let mut settings = config.index.clone();
            if keep_going {
                settings.failure_policy = FailurePolicy::Continue;
            }

            let store = connect(&config)?;
            check_document_type(store.as_ref(), &config);
            let publisher = IndexPublisher::new(store, &settings)
                .with_progress(progress_bar(tree.count().total())?);

            if no_promote {
                let generation = publisher.create_generation()?;
                let report = publisher.publish(&tree, &generation)?;
                print!("{report}");
                println!("{generation} was not promoted");
            } else {
                let outcome = publisher.run(&tree)?;
                print!("{}", outcome.report);
                if outcome.promoted {
                    println!(
                        "{} now serves {}",
                        outcome.generation, settings.default_alias
                    );
                } else {
                    println!("{} was not promoted", outcome.generation);
                }
            }
            print_count(&path, &tree);
        }

        Command::Generations {} => {
            let publisher = IndexPublisher::new(connect(&config)?, &config.index);
            for generation in publisher.generations()? {
                println!("{generation}");
            }
        }

        Command::Indices {} => {
            let publisher = IndexPublisher::new(connect(&config)?, &config.index);
            for summary in publisher.registry().summaries()? {
                println!(
                    "{} ({}): \t\t[{}]",
                    summary.name,
                    summary.documents,
                    summary.aliases.join(", ")
                );
            }
        }

        Command::Aliases { names } => {
            let publisher = IndexPublisher::new(connect(&config)?, &config.index);
            let registry = publisher.registry();
            if names {
                for alias in registry.alias_names()? {
                    println!("{alias}");
                }
            } else {
                for binding in registry.list_aliases()? {
                    println!("{} -> {}", binding.alias, binding.generation);
                }
            }
            if let AliasState::Inconsistent(generations) =
                registry.resolve(registry.default_alias())?
            {
                eprintln!(
                    "warning: {} is bound to several generations: {}",
                    registry.default_alias(),
                    generations.join(", ")
                );
            }
        }

        Command::Alias { action } => {
            let publisher = IndexPublisher::new(connect(&config)?, &config.index);
            let registry = publisher.registry();
            match action {
                AliasAction::Add { generation, alias } => {
                    if registry.add_alias(&generation, &alias)? {
                        println!("{alias} -> {generation}");
                    } else {
                        bail!("alias {alias} already points to another generation");
                    }
                }
                AliasAction::Remove { generation, alias } => {
                    registry.remove_alias(&generation, &alias)?;
                    println!("{alias} removed from {generation}");
                }
                AliasAction::Default { generation } => {
                    registry.switch_default(&generation)?;
                    println!("{} -> {generation}", registry.default_alias());
                }
                AliasAction::Unset { alias } => {
                    let count = registry.unalias(&alias)?;
                    println!("{alias} removed from {count} generations");
                }
            }
        }

        Command::Delete { generation, yes } => {
            if !yes && !confirm(&format!("Want to delete {generation}? This cannot be undone"))? {
                println!("Whatever");
                return Ok(());
            }
            let publisher = IndexPublisher::new(connect(&config)?, &config.index);
            publisher.delete(&generation)?;
            println!("{generation} deleted");
        }

        Command::Health {} => {
            let health = connect(&config)?
                .health()
                .with_context(|| format!("Unable to reach {}", config.store.endpoint))?;
            println!("{}", serde_json::to_string_pretty(&health)?);
        }

        Command::Version {} => {
            let version = connect(&config)?
                .version()
                .with_context(|| format!("Unable to detect version of {}", config.store.endpoint))?;
            println!("Elasticsearch version {version} ({})", config.store.endpoint);
            if store::elastic::requires_typeless(&version) && config.index.document_type != "_doc" {
                println!("note: this engine needs index.document_type: _doc");
            }
        }
    }

    Ok(())
}
